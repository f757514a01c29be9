pub use crate::error::{ClResult, ClResultExt, Error};
pub use crate::scope::{Level, Scope, ScopeKey};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
