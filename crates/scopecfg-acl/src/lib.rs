//! Request path access control on top of scoped configuration.
//!
//! Each scope carries deny and allow patterns matched against the request
//! path. An allow match wins over a deny match; unmatched paths pass.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod factory;
pub mod layer;
pub mod prelude;

pub use config::{with_allow, with_deny, AclConfig};
pub use factory::AclOptionFactory;
pub use layer::{AclLayer, AclService};

// vim: ts=4
