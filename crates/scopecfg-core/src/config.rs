//! Scoped configuration contract
//!
//! Every consumer package (signing, access control, ...) defines one config
//! struct embedding a [`ConfigBase`] and implements [`ScopedConfig`] for it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;
use std::sync::Arc;

use crate::prelude::*;

/// Decides the client-visible response for a failed request
pub type ErrorHandler = Arc<dyn Fn(&Error) -> Response + Send + Sync>;

fn error_body(status: StatusCode, code: &str, message: &str) -> Response {
	let body = serde_json::json!({
		"error": {
			"code": code,
			"message": message,
		}
	});
	(status, Json(body)).into_response()
}

/// "Service unavailable" for internal and programmer errors,
/// authentication failures are routed to the unauthorized response
pub fn default_error_handler() -> ErrorHandler {
	Arc::new(|err: &Error| {
		if err.is_auth() {
			return unauthorized_response(err);
		}
		error_body(StatusCode::SERVICE_UNAVAILABLE, "E-UNAVAILABLE", "Service unavailable")
	})
}

pub fn unauthorized_handler() -> ErrorHandler {
	Arc::new(unauthorized_response)
}

fn unauthorized_response(err: &Error) -> Response {
	match err.root() {
		Error::PermissionDenied => {
			error_body(StatusCode::FORBIDDEN, "E-PERMISSION-DENIED", "Permission denied")
		}
		_ => error_body(StatusCode::UNAUTHORIZED, "E-UNAUTHORIZED", "Unauthorized"),
	}
}

/// Fields shared by every scoped config
#[derive(Clone, Default)]
pub struct ConfigBase {
	/// Scope this config was built for. `None` only for configs that never
	/// went through a package constructor.
	pub scope_id: Option<ScopeKey>,
	pub parent_id: Option<ScopeKey>,
	/// Disabled configs are valid without their required fields and the
	/// middleware passes requests through untouched
	pub disabled: bool,
	pub error_handler: Option<ErrorHandler>,
	/// First error recorded while applying options
	pub last_err: Option<Error>,
}

impl ConfigBase {
	pub fn new(scope: ScopeKey, parent: Option<ScopeKey>) -> Self {
		Self { scope_id: Some(scope), parent_id: parent, ..Default::default() }
	}
}

impl fmt::Debug for ConfigBase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConfigBase")
			.field("scope_id", &self.scope_id)
			.field("parent_id", &self.parent_id)
			.field("disabled", &self.disabled)
			.field("error_handler", &self.error_handler.is_some())
			.field("last_err", &self.last_err)
			.finish()
	}
}

/// A resolved settings snapshot for one scope
///
/// Configs are built by `new_scoped`, patched by options, and then published
/// behind an `Arc`. Published configs are never mutated; an update clones the
/// current config, patches the clone and replaces the cache entry.
pub trait ScopedConfig: Clone + fmt::Debug + Send + Sync + 'static {
	/// Package constructor with default values
	fn new_scoped(scope: ScopeKey, parent: Option<ScopeKey>) -> Self;

	fn base(&self) -> &ConfigBase;

	fn base_mut(&mut self) -> &mut ConfigBase;

	/// Package-specific required fields, only checked when not disabled
	fn check_required(&self) -> ClResult<()>;

	/// Valid iff no option failed, the scope is set, and the config is either
	/// disabled or has all required fields
	fn is_valid(&self) -> ClResult<()> {
		let base = self.base();
		if let Some(err) = &base.last_err {
			return Err(err.clone());
		}
		let Some(scope) = base.scope_id else {
			return Err(Error::NotValid("scope id is not set".into()));
		};
		if base.disabled {
			return Ok(());
		}
		self.check_required().with_context(|| format!("config for {}", scope))
	}

	fn is_disabled(&self) -> bool {
		self.base().disabled
	}

	fn error_handler(&self) -> Option<&ErrorHandler> {
		self.base().error_handler.as_ref()
	}
}


// vim: ts=4
