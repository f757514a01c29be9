//! Request scope extractor
//!
//! An upstream layer (cookie, host name, token...) determines the tenant and
//! inserts a [`RequestScope`] into the request extensions. Everything below it
//! only reads the extension.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Request;

use crate::prelude::*;

// RequestScope //
//**************//
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestScope(pub Scope);

impl RequestScope {
	/// Scope bound to a request, or `NotFound` if no upstream layer set one
	pub fn from_request<B>(req: &Request<B>) -> ClResult<Scope> {
		req.extensions()
			.get::<RequestScope>()
			.map(|rs| rs.0)
			.ok_or_else(|| Error::NotFound("request scope".into()))
	}
}

impl<S> FromRequestParts<S> for RequestScope
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<RequestScope>()
			.copied()
			.ok_or_else(|| Error::NotFound("request scope".into()))
	}
}


// vim: ts=4
