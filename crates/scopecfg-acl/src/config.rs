//! Access control configuration and options

use regex::Regex;

use scopecfg_core::{unauthorized_handler, ConfigBase, ScopeOption, ScopedConfig};

use crate::prelude::*;

#[derive(Clone, Debug)]
pub struct AclConfig {
	pub base: ConfigBase,
	pub deny: Vec<Regex>,
	pub allow: Vec<Regex>,
}

impl AclConfig {
	/// Allow patterns are exceptions to the deny list
	pub fn is_allowed(&self, path: &str) -> bool {
		if self.allow.iter().any(|re| re.is_match(path)) {
			return true;
		}
		!self.deny.iter().any(|re| re.is_match(path))
	}
}

impl ScopedConfig for AclConfig {
	fn new_scoped(scope: ScopeKey, parent: Option<ScopeKey>) -> Self {
		let mut base = ConfigBase::new(scope, parent);
		base.error_handler = Some(unauthorized_handler());
		Self { base, deny: Vec::new(), allow: Vec::new() }
	}

	fn base(&self) -> &ConfigBase {
		&self.base
	}

	fn base_mut(&mut self) -> &mut ConfigBase {
		&mut self.base
	}

	/// An empty rule set is a valid, permissive config
	fn check_required(&self) -> ClResult<()> {
		Ok(())
	}
}

fn compile(patterns: &[String]) -> ClResult<Vec<Regex>> {
	patterns
		.iter()
		.map(|p| Regex::new(p).map_err(|e| Error::Fatal(format!("invalid pattern {:?}: {}", p, e))))
		.collect()
}

/// Replaces the deny list. A pattern that does not compile is fatal.
pub fn with_deny<I, P>(scope: Scope, patterns: I) -> ScopeOption<AclConfig>
where
	I: IntoIterator<Item = P>,
	P: Into<String>,
{
	let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
	ScopeOption::new(scope, "deny", move |cfg: &mut AclConfig| {
		cfg.deny = compile(&patterns)?;
		Ok(())
	})
}

/// Replaces the allow list. A pattern that does not compile is fatal.
pub fn with_allow<I, P>(scope: Scope, patterns: I) -> ScopeOption<AclConfig>
where
	I: IntoIterator<Item = P>,
	P: Into<String>,
{
	let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
	ScopeOption::new(scope, "allow", move |cfg: &mut AclConfig| {
		cfg.allow = compile(&patterns)?;
		Ok(())
	})
}


// vim: ts=4
