//! Signing options loaded from backend values
//!
//! Paths, all optional except `sign/algorithm` and `sign/key`:
//! `sign/disabled`, `sign/algorithm`, `sign/key`, `sign/key_id`,
//! `sign/header`, `sign/trailer`, `sign/encoding`, `sign/max_body` (bytes).

use async_trait::async_trait;
use std::sync::Arc;

use scopecfg_core::{with_disabled, OptionFactory, ScopeOption, ScopedReader};

use crate::config::{
	with_encoding, with_hash, with_header_name, with_key_id, with_max_body, with_trailer,
};
use crate::prelude::*;
use crate::registry::HashRegistry;
use crate::signature::Encoding;

pub struct SignOptionFactory {
	registry: Arc<HashRegistry>,
}

impl SignOptionFactory {
	pub fn new(registry: Arc<HashRegistry>) -> Self {
		Self { registry }
	}
}

#[async_trait]
impl OptionFactory<SignConfig> for SignOptionFactory {
	async fn options(&self, reader: &ScopedReader) -> ClResult<Vec<ScopeOption<SignConfig>>> {
		let scope = reader.scope();
		let mut opts = Vec::new();

		if reader.get_bool_opt("sign/disabled").await?.unwrap_or(false) {
			opts.push(with_disabled(scope, true));
			return Ok(opts);
		}

		let algorithm = reader.get_string("sign/algorithm").await?;
		let key = reader.get_string("sign/key").await?;
		opts.push(with_hash(scope, &self.registry, &algorithm, key));

		if let Some(key_id) = reader.get_string_opt("sign/key_id").await? {
			opts.push(with_key_id(scope, key_id));
		}
		if let Some(header) = reader.get_string_opt("sign/header").await? {
			opts.push(with_header_name(scope, &header));
		}
		if let Some(trailer) = reader.get_bool_opt("sign/trailer").await? {
			opts.push(with_trailer(scope, trailer));
		}
		if let Some(encoding) = reader.get_string_opt("sign/encoding").await? {
			opts.push(with_encoding(scope, Encoding::from_name(&encoding)?));
		}
		if let Some(max_body) = reader.get_int_opt("sign/max_body").await? {
			let max_body = usize::try_from(max_body)
				.map_err(|_| Error::Fatal(format!("sign/max_body must not be negative, got {}", max_body)))?;
			opts.push(with_max_body(scope, max_body));
		}
		Ok(opts)
	}
}

// vim: ts=4
