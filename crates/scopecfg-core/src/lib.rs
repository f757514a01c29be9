//! Hierarchical per-scope configuration resolution.
//!
//! A [`Service`] maps scope keys to resolved, validated configuration objects.
//! Configs are published from startup options or loaded lazily through an
//! [`OptionFactory`]; a scope without its own entry falls back to its parent
//! (Store -> Website -> Default) by aliasing the parent's object.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod extract;
pub mod inflight;
pub mod option;
pub mod prelude;
pub mod service;

pub use backend::{ConfigBackend, OptionFactory, ScopedReader};
pub use cache::ConfigCache;
pub use config::{
	default_error_handler, unauthorized_handler, ConfigBase, ErrorHandler, ScopedConfig,
};
pub use extract::RequestScope;
pub use inflight::InflightLoader;
pub use option::{with_disabled, with_error_handler, ScopeOption};
pub use service::Service;

// vim: ts=4
