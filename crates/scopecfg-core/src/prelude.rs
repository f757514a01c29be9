pub use scopecfg_types::prelude::*;

pub use crate::config::{ErrorHandler, ScopedConfig};

// vim: ts=4
