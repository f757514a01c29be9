//! Path access control middleware

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use scopecfg_core::{RequestScope, Service as ConfigService};

use crate::prelude::*;

#[derive(Clone)]
pub struct AclLayer {
	configs: Arc<ConfigService<AclConfig>>,
}

impl AclLayer {
	pub fn new(configs: Arc<ConfigService<AclConfig>>) -> Self {
		Self { configs }
	}
}

impl<S> Layer<S> for AclLayer {
	type Service = AclService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		AclService { inner, configs: self.configs.clone() }
	}
}

#[derive(Clone)]
pub struct AclService<S> {
	inner: S,
	configs: Arc<ConfigService<AclConfig>>,
}

impl<S> Service<Request<Body>> for AclService<S>
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
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let config = match configs.config_for_request(RequestScope::from_request(&req)).await {
				Ok(config) => config,
				Err(err) => return Ok((configs.error_handler())(&err)),
			};
			if config.is_disabled() {
				return inner.call(req).await;
			}

			let path = req.uri().path();
			if !config.is_allowed(path) {
				info!("[{}] denied {} for {:?}", configs.name(), path, config.base.scope_id);
				let handler = configs.error_handler_for(Some(config.as_ref()));
				return Ok(handler(&Error::PermissionDenied.context(format!("path {}", path))));
			}
			inner.call(req).await
		})
	}
}


// vim: ts=4
