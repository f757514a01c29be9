//! Configuration options
//!
//! An option is a labelled patch for one scope. Options are collected into a
//! list and applied in order to a draft config; the draft is published only if
//! every patch succeeded.

use std::borrow::Cow;
use std::fmt;

use crate::prelude::*;

type ApplyFn<C> = Box<dyn FnOnce(&mut C) -> ClResult<()> + Send>;

pub struct ScopeOption<C> {
	scope: Scope,
	label: Cow<'static, str>,
	apply: ApplyFn<C>,
}

impl<C: ScopedConfig> ScopeOption<C> {
	pub fn new<F>(scope: Scope, label: impl Into<Cow<'static, str>>, apply: F) -> Self
	where
		F: FnOnce(&mut C) -> ClResult<()> + Send + 'static,
	{
		Self { scope, label: label.into(), apply: Box::new(apply) }
	}

	pub fn scope(&self) -> Scope {
		self.scope
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn apply(self, config: &mut C) -> ClResult<()> {
		let label = self.label;
		(self.apply)(config).with_context(|| format!("option {}", label))
	}
}

impl<C> fmt::Debug for ScopeOption<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeOption")
			.field("scope", &self.scope)
			.field("label", &self.label)
			.finish_non_exhaustive()
	}
}

pub fn with_disabled<C: ScopedConfig>(scope: Scope, disabled: bool) -> ScopeOption<C> {
	ScopeOption::new(scope, "disabled", move |cfg: &mut C| {
		cfg.base_mut().disabled = disabled;
		Ok(())
	})
}

pub fn with_error_handler<C: ScopedConfig>(scope: Scope, handler: ErrorHandler) -> ScopeOption<C> {
	ScopeOption::new(scope, "error_handler", move |cfg: &mut C| {
		cfg.base_mut().error_handler = Some(handler);
		Ok(())
	})
}


// vim: ts=4
