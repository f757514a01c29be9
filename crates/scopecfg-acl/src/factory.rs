//! Access control options loaded from backend values (`acl/disabled`,
//! `acl/deny`, `acl/allow`)

use async_trait::async_trait;

use scopecfg_core::{with_disabled, OptionFactory, ScopeOption, ScopedReader};

use crate::config::{with_allow, with_deny};
use crate::prelude::*;

#[derive(Debug, Default)]
pub struct AclOptionFactory;

#[async_trait]
impl OptionFactory<AclConfig> for AclOptionFactory {
	async fn options(&self, reader: &ScopedReader) -> ClResult<Vec<ScopeOption<AclConfig>>> {
		let scope = reader.scope();
		let mut opts = Vec::new();

		if let Some(disabled) = reader.get_bool_opt("acl/disabled").await? {
			opts.push(with_disabled(scope, disabled));
		}
		// Always published, so a scope without rules gets its own empty list
		let deny = reader.get_strings_opt("acl/deny").await?.unwrap_or_default();
		let allow = reader.get_strings_opt("acl/allow").await?.unwrap_or_default();
		opts.push(with_deny(scope, deny));
		opts.push(with_allow(scope, allow));
		Ok(opts)
	}
}

// vim: ts=4
