//! Request signature validation
//!
//! Counterpart of [`SignLayer`](crate::SignLayer) for incoming requests: the
//! body is buffered, its keyed hash recomputed and compared against the
//! signature header. Requests that fail are answered with the unauthorized
//! response and never reach the inner service.
//!
//! The header is checked before any of the body is read. Bodies longer than
//! the config's `max_body` are refused with `PermissionDenied`.

use axum::body::{Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use scopecfg_core::{unauthorized_handler, ErrorHandler, RequestScope, Service as ConfigService};

use crate::body::buffer_body;
use crate::pool::{buffer_pool, BufferPool};
use crate::prelude::*;
use crate::signature::{parse_signature, SignatureFormat};

#[derive(Clone)]
pub struct ValidateLayer {
	configs: Arc<ConfigService<SignConfig>>,
	buffers: Arc<BufferPool>,
	unauthorized: ErrorHandler,
}

impl ValidateLayer {
	pub fn new(configs: Arc<ConfigService<SignConfig>>) -> Self {
		Self { configs, buffers: buffer_pool(), unauthorized: unauthorized_handler() }
	}

	pub fn with_buffers(mut self, buffers: Arc<BufferPool>) -> Self {
		self.buffers = buffers;
		self
	}
}

impl<S> Layer<S> for ValidateLayer {
	type Service = ValidateService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		ValidateService {
			inner,
			configs: self.configs.clone(),
			buffers: self.buffers.clone(),
			unauthorized: self.unauthorized.clone(),
		}
	}
}

#[derive(Clone)]
pub struct ValidateService<S> {
	inner: S,
	configs: Arc<ConfigService<SignConfig>>,
	buffers: Arc<BufferPool>,
	unauthorized: ErrorHandler,
}

impl<S> Service<Request<Body>> for ValidateService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let configs = self.configs.clone();
		let buffers = self.buffers.clone();
		let unauthorized = self.unauthorized.clone();
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let config = match configs.config_for_request(RequestScope::from_request(&req)).await {
				Ok(config) => config,
				Err(err) => return Ok((configs.error_handler())(&err)),
			};
			if config.is_disabled() {
				return inner.call(req).await;
			}

			match verify_request(&config, &buffers, req).await {
				Ok(req) => inner.call(req).await,
				Err(err) => {
					info!("[{}] rejected request: {}", configs.name(), err);
					let handler = config.error_handler().unwrap_or(&unauthorized);
					Ok(handler(&err))
				}
			}
		})
	}
}

/// Checks the signature and rebuilds the request around the buffered body
async fn verify_request(
	config: &SignConfig,
	buffers: &Arc<BufferPool>,
	req: Request<Body>,
) -> ClResult<Request<Body>> {
	let (parts, body) = req.into_parts();
	let header_name = config.header_name();

	let header = parts
		.headers
		.get(&header_name)
		.and_then(|value| value.to_str().ok())
		.ok_or_else(|| Error::Unauthorized.context(format!("missing {} header", header_name)))?;
	let parsed =
		parse_signature(header).map_err(|err| Error::Unauthorized.context(err.to_string()))?;

	if Some(parsed.algorithm.as_str()) != config.algorithm.as_deref() {
		return Err(Error::Unauthorized.context(format!("unexpected algorithm {}", parsed.algorithm)));
	}
	if let SignatureFormat::Structured { key_id } = &config.format
		&& parsed.key_id.as_deref() != Some(key_id.as_str())
	{
		return Err(Error::Unauthorized.context("unknown key id"));
	}
	let expected = config
		.encoding
		.decode(&parsed.signature)
		.map_err(|err| Error::Unauthorized.context(err.to_string()))?;

	let mut hasher = config.hasher()?;
	if expected.len() != hasher.output_size() {
		return Err(Error::Unauthorized.context("signature has the wrong length"));
	}

	let (buf, trailers) = buffer_body(body, buffers, config.max_body)
		.await
		.map_err(|err| Error::PermissionDenied.context(format!("request body: {}", err)))?;
	hasher.update(&buf);
	if !hasher.verify_reset(&expected) {
		return Err(Error::Unauthorized.context("signature mismatch"));
	}

	let bytes = Bytes::copy_from_slice(&buf);
	let body = match trailers {
		Some(trailers) => Body::new(
			Full::new(bytes).with_trailers(async move { Some(Ok::<_, Infallible>(trailers)) }),
		),
		None => Body::from(bytes),
	};
	Ok(Request::from_parts(parts, body))
}


// vim: ts=4
