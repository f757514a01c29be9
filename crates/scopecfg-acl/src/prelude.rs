pub use scopecfg_core::prelude::*;

pub use crate::config::AclConfig;

// vim: ts=4
