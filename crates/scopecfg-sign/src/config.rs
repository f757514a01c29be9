//! Signing configuration and options

use axum::http::HeaderName;
use std::fmt;
use std::sync::Arc;

use scopecfg_core::{ConfigBase, ScopeOption, ScopedConfig};

use crate::pool::{hash_pool, HashPool, Pooled};
use crate::prelude::*;
use crate::registry::{BodyHasher, HashRegistry};
use crate::signature::{format_signature, Encoding, SignatureFormat};

/// Largest body buffered for signing or validation
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct SignConfig {
	pub base: ConfigBase,
	/// Wire name of the hash algorithm
	pub algorithm: Option<String>,
	pub hash_pool: Option<Arc<HashPool>>,
	pub format: SignatureFormat,
	pub encoding: Encoding,
	/// Overrides the format's default header
	pub header_name: Option<HeaderName>,
	/// Send the signature as an HTTP trailer instead of buffering the body
	pub in_trailer: bool,
	/// Limit for buffered bodies, the trailer path streams without one
	pub max_body: usize,
}

impl SignConfig {
	pub fn header_name(&self) -> HeaderName {
		match &self.header_name {
			Some(name) => name.clone(),
			None => HeaderName::from_static(self.format.default_header()),
		}
	}

	/// Borrows a keyed hasher; it goes back to the pool when dropped
	pub fn hasher(&self) -> ClResult<Pooled<Box<dyn BodyHasher>>> {
		match &self.hash_pool {
			Some(pool) => pool.get(),
			None => Err(Error::NotValid("hash algorithm not configured".into())),
		}
	}

	pub fn signature(&self, digest: &[u8]) -> String {
		format_signature(&self.format, self.algorithm.as_deref().unwrap_or_default(), self.encoding, digest)
	}
}

impl ScopedConfig for SignConfig {
	fn new_scoped(scope: ScopeKey, parent: Option<ScopeKey>) -> Self {
		Self {
			base: ConfigBase::new(scope, parent),
			algorithm: None,
			hash_pool: None,
			format: SignatureFormat::Simple,
			encoding: Encoding::Hex,
			header_name: None,
			in_trailer: false,
			max_body: DEFAULT_MAX_BODY,
		}
	}

	fn base(&self) -> &ConfigBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut ConfigBase {
		&mut self.base
	}

	fn check_required(&self) -> ClResult<()> {
		if self.hash_pool.is_none() {
			return Err(Error::NotValid("hash algorithm not configured".into()));
		}
		if let SignatureFormat::Structured { key_id } = &self.format
			&& key_id.is_empty()
		{
			return Err(Error::NotValid("structured signature requires a key id".into()));
		}
		Ok(())
	}
}

impl fmt::Debug for SignConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SignConfig")
			.field("base", &self.base)
			.field("algorithm", &self.algorithm)
			.field("hash_pool", &self.hash_pool)
			.field("format", &self.format)
			.field("encoding", &self.encoding)
			.field("header_name", &self.header_name())
			.field("in_trailer", &self.in_trailer)
			.field("max_body", &self.max_body)
			.finish()
	}
}

/// Selects the hash algorithm and key
///
/// The algorithm must be registered; an unknown algorithm or an empty key
/// fails when the option is applied.
pub fn with_hash(
	scope: Scope,
	registry: &HashRegistry,
	algorithm: &str,
	key: impl Into<Vec<u8>>,
) -> ScopeOption<SignConfig> {
	let constructor = registry.lookup(algorithm);
	let algorithm = algorithm.to_string();
	let key: Vec<u8> = key.into();
	ScopeOption::new(scope, "hash", move |cfg: &mut SignConfig| {
		let Some(constructor) = constructor else {
			return Err(Error::Fatal(format!("unknown hash algorithm {}", algorithm)));
		};
		if key.is_empty() {
			return Err(Error::Fatal("empty signing key".into()));
		}
		let pool = hash_pool(move || constructor(&key));
		// Keys the first hasher now so a bad key fails here, not per request
		drop(pool.get()?);
		cfg.algorithm = Some(algorithm);
		cfg.hash_pool = Some(pool);
		Ok(())
	})
}

/// Switches to the structured format with the given key id
pub fn with_key_id(scope: Scope, key_id: impl Into<String>) -> ScopeOption<SignConfig> {
	let key_id = key_id.into();
	ScopeOption::new(scope, "key_id", move |cfg: &mut SignConfig| {
		cfg.format = SignatureFormat::Structured { key_id };
		Ok(())
	})
}

pub fn with_format(scope: Scope, format: SignatureFormat) -> ScopeOption<SignConfig> {
	ScopeOption::new(scope, "format", move |cfg: &mut SignConfig| {
		cfg.format = format;
		Ok(())
	})
}

pub fn with_header_name(scope: Scope, name: &str) -> ScopeOption<SignConfig> {
	let name = name.to_string();
	ScopeOption::new(scope, "header_name", move |cfg: &mut SignConfig| {
		let header = HeaderName::from_bytes(name.as_bytes())
			.map_err(|_| Error::Fatal(format!("invalid header name {:?}", name)))?;
		cfg.header_name = Some(header);
		Ok(())
	})
}

pub fn with_trailer(scope: Scope, in_trailer: bool) -> ScopeOption<SignConfig> {
	ScopeOption::new(scope, "trailer", move |cfg: &mut SignConfig| {
		cfg.in_trailer = in_trailer;
		Ok(())
	})
}

pub fn with_encoding(scope: Scope, encoding: Encoding) -> ScopeOption<SignConfig> {
	ScopeOption::new(scope, "encoding", move |cfg: &mut SignConfig| {
		cfg.encoding = encoding;
		Ok(())
	})
}

pub fn with_max_body(scope: Scope, max_body: usize) -> ScopeOption<SignConfig> {
	ScopeOption::new(scope, "max_body", move |cfg: &mut SignConfig| {
		cfg.max_body = max_body;
		Ok(())
	})
}


// vim: ts=4
