//! Error type shared by the resolution engine and its consumers
//!
//! `NotFound` and `NotValid` are transient: the same scope may resolve once it
//! gets configured. `Fatal` marks malformed backend-supplied configuration and
//! must not be retried with the same input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

pub type ClResult<T> = std::result::Result<T, Error>;

/// `Clone` so a single in-flight load result can be handed to every waiter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
	/// Scope key absent with no fallback available or requested
	NotFound(String),
	/// A config exists but fails its own validity check
	NotValid(String),
	/// Malformed configuration (e.g. an invalid pattern), not retryable
	Fatal(String),
	PermissionDenied,
	Unauthorized,
	ConfigError(String),
	ServiceUnavailable(String),
	Io(String),
	Internal(String),

	/// Call-site context wrapped around another error
	Context { context: String, source: Box<Error> },
}

impl Error {
	/// Innermost error of a context chain
	pub fn root(&self) -> &Error {
		let mut err = self;
		while let Error::Context { source, .. } = err {
			err = source;
		}
		err
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self.root(), Error::NotFound(_))
	}

	pub fn is_not_valid(&self) -> bool {
		matches!(self.root(), Error::NotValid(_))
	}

	pub fn is_fatal(&self) -> bool {
		matches!(self.root(), Error::Fatal(_))
	}

	/// Authentication / authorization failures take the unauthorized path
	pub fn is_auth(&self) -> bool {
		matches!(self.root(), Error::PermissionDenied | Error::Unauthorized)
	}

	pub fn context(self, context: impl Into<String>) -> Self {
		Error::Context { context: context.into(), source: Box::new(self) }
	}

	fn code(&self) -> &'static str {
		match self.root() {
			Error::NotFound(_) => "E-NOT-FOUND",
			Error::NotValid(_) => "E-NOT-VALID",
			Error::Fatal(_) => "E-FATAL",
			Error::PermissionDenied => "E-PERMISSION-DENIED",
			Error::Unauthorized => "E-UNAUTHORIZED",
			Error::ConfigError(_) => "E-CONFIG",
			Error::ServiceUnavailable(_) => "E-UNAVAILABLE",
			Error::Io(_) | Error::Internal(_) | Error::Context { .. } => "E-INTERNAL",
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NotFound(what) => write!(f, "not found: {}", what),
			Error::NotValid(msg) => write!(f, "not valid: {}", msg),
			Error::Fatal(msg) => write!(f, "fatal: {}", msg),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::Unauthorized => write!(f, "unauthorized"),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::ServiceUnavailable(msg) => write!(f, "service unavailable: {}", msg),
			Error::Io(msg) => write!(f, "I/O error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Context { context, source } => write!(f, "{}: {}", context, source),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Context { source, .. } => Some(source.as_ref()),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Io(err.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::ConfigError(err.to_string())
	}
}

/// Attaches call-site context to an error result
pub trait ClResultExt<T> {
	fn context(self, context: impl Into<String>) -> ClResult<T>;

	fn with_context<F, S>(self, f: F) -> ClResult<T>
	where
		F: FnOnce() -> S,
		S: Into<String>;
}

impl<T> ClResultExt<T> for ClResult<T> {
	fn context(self, context: impl Into<String>) -> ClResult<T> {
		self.map_err(|err| err.context(context))
	}

	fn with_context<F, S>(self, f: F) -> ClResult<T>
	where
		F: FnOnce() -> S,
		S: Into<String>,
	{
		self.map_err(|err| err.context(f()))
	}
}

/// Client-visible response. Messages never carry the underlying error text.
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = match self.root() {
			Error::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
			Error::PermissionDenied => (StatusCode::FORBIDDEN, "Permission denied"),
			Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
			Error::Io(_) | Error::Internal(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
			}
			_ => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"),
		};
		let body = serde_json::json!({
			"error": {
				"code": self.code(),
				"message": message,
			}
		});
		(status, Json(body)).into_response()
	}
}


// vim: ts=4
