pub use scopecfg_core::prelude::*;

pub use crate::config::SignConfig;

// vim: ts=4
