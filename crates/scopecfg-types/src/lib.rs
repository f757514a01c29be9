//! Shared types for the scopecfg configuration engine.
//!
//! Scope keys identify a tenant (Default / Website / Store). The error type is
//! shared by the core resolution engine and every consumer crate, so middleware
//! crates can classify resolution failures without depending on each other.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod error;
pub mod prelude;
pub mod scope;

pub use error::{ClResult, ClResultExt, Error};
pub use scope::{Level, Scope, ScopeKey};

// vim: ts=4
