//! Content signing middleware on top of scoped configuration.
//!
//! [`SignLayer`] attaches a keyed hash of the response body, either in a
//! header after buffering the body or as an HTTP trailer while streaming it.
//! [`ValidateLayer`] checks the same signature on incoming requests.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod body;
pub mod config;
pub mod factory;
pub mod layer;
pub mod pool;
pub mod prelude;
pub mod registry;
pub mod signature;
pub mod validate;

pub use config::{
	with_encoding, with_format, with_hash, with_header_name, with_key_id, with_max_body,
	with_trailer, SignConfig, DEFAULT_MAX_BODY,
};
pub use factory::SignOptionFactory;
pub use layer::{SignLayer, SignService};
pub use pool::{BufferPool, HashPool, Pool, Pooled};
pub use registry::{BodyHasher, HashConstructor, HashRegistry};
pub use signature::{format_signature, parse_signature, Encoding, ParsedSignature, SignatureFormat};
pub use validate::{ValidateLayer, ValidateService};

// vim: ts=4
