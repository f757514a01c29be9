//! Response signing middleware
//!
//! Resolves the signing config for the request scope, runs the inner service
//! and attaches a keyed hash of the response body, either as a header on the
//! buffered response or as a trailer after the streamed body.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request};
use axum::response::Response;
use futures::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use scopecfg_core::{RequestScope, Service as ConfigService};

use crate::body::{buffer_body, TrailerBody};
use crate::pool::{buffer_pool, BufferPool};
use crate::prelude::*;

#[derive(Clone)]
pub struct SignLayer {
	configs: Arc<ConfigService<SignConfig>>,
	buffers: Arc<BufferPool>,
}

impl SignLayer {
	pub fn new(configs: Arc<ConfigService<SignConfig>>) -> Self {
		Self { configs, buffers: buffer_pool() }
	}

	/// Shares a buffer pool between layers
	pub fn with_buffers(mut self, buffers: Arc<BufferPool>) -> Self {
		self.buffers = buffers;
		self
	}
}

impl<S> Layer<S> for SignLayer {
	type Service = SignService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		SignService { inner, configs: self.configs.clone(), buffers: self.buffers.clone() }
	}
}

#[derive(Clone)]
pub struct SignService<S> {
	inner: S,
	configs: Arc<ConfigService<SignConfig>>,
	buffers: Arc<BufferPool>,
}

impl<S> Service<Request<Body>> for SignService<S>
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
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let config = match configs.config_for_request(RequestScope::from_request(&req)).await {
				Ok(config) => config,
				Err(err) => return Ok((configs.error_handler())(&err)),
			};
			if config.is_disabled() {
				return inner.call(req).await;
			}

			let res = inner.call(req).await?;
			let handler = configs.error_handler_for(Some(config.as_ref()));
			let signed = if config.in_trailer {
				sign_trailer(&config, res)
			} else {
				sign_buffered(&config, &buffers, res).await
			};
			Ok(signed.unwrap_or_else(|err| {
				warn!("[{}] signing failed: {}", configs.name(), err);
				handler(&err)
			}))
		})
	}
}

/// Buffers the whole body, signs it in a header and fixes Content-Length
///
/// Trailers sent by the inner body are kept and follow the buffered data.
async fn sign_buffered(
	config: &SignConfig,
	buffers: &Arc<BufferPool>,
	res: Response,
) -> ClResult<Response> {
	let (mut parts, body) = res.into_parts();
	let mut hasher = config.hasher()?;
	let (buf, trailers) =
		buffer_body(body, buffers, config.max_body).await.context("buffering response body")?;

	hasher.update(&buf);
	let signature = config.signature(&hasher.finalize_reset());
	let value = HeaderValue::from_str(&signature)
		.map_err(|_| Error::Internal("signature is not a valid header value".into()))?;

	parts.headers.insert(config.header_name(), value);
	parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(buf.len()));
	let bytes = Bytes::copy_from_slice(&buf);
	let body = match trailers {
		Some(trailers) => Body::new(
			Full::new(bytes).with_trailers(async move { Some(Ok::<_, Infallible>(trailers)) }),
		),
		None => Body::from(bytes),
	};
	Ok(Response::from_parts(parts, body))
}

/// Streams the body through and appends the signature as a trailer
fn sign_trailer(config: &Arc<SignConfig>, res: Response) -> ClResult<Response> {
	let (mut parts, body) = res.into_parts();
	let hasher = config.hasher()?;
	let header_name = config.header_name();

	parts.headers.remove(header::CONTENT_LENGTH);
	parts.headers.insert(header::TRAILER, HeaderValue::from(header_name.clone()));

	let signer = config.clone();
	let body = TrailerBody::new(body, hasher, header_name, move |digest| signer.signature(digest));
	Ok(Response::from_parts(parts, Body::new(body)))
}


// vim: ts=4
