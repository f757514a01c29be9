//! Router assembly

use axum::body::Bytes;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::add_extension::AddExtensionLayer;
use tower_http::trace::TraceLayer;

use scopecfg_acl::{AclConfig, AclLayer, AclOptionFactory};
use scopecfg_backend_memory::MemoryBackend;
use scopecfg_core::{RequestScope, Service};
use scopecfg_sign::{HashRegistry, SignConfig, SignLayer, SignOptionFactory};
use scopecfg_types::prelude::*;

use crate::config::Config;

pub struct App {
	pub backend: Arc<MemoryBackend>,
	pub sign: Arc<Service<SignConfig>>,
	pub acl: Arc<Service<AclConfig>>,
}

impl App {
	/// Seeds the backend with the Default scope values and wires both services to it
	pub fn new(config: &Config) -> Self {
		let backend = Arc::new(MemoryBackend::new());
		for (path, value) in config.backend_values() {
			backend.set(ScopeKey::DEFAULT, path, value);
		}

		let registry = Arc::new(HashRegistry::with_defaults());
		info!("Hash algorithms: {}", registry.names().join(", "));

		let sign = Arc::new(
			Service::new("sign")
				.with_option_factory(backend.clone(), Arc::new(SignOptionFactory::new(registry))),
		);
		let acl = Arc::new(
			Service::new("acl").with_option_factory(backend.clone(), Arc::new(AclOptionFactory)),
		);
		Self { backend, sign, acl }
	}

	/// Every request is bound to the Default scope
	pub fn router(&self) -> Router {
		self.router_for(Scope::default())
	}

	pub fn router_for(&self, scope: Scope) -> Router {
		Router::new()
			.route("/", get(|| async { "scopecfg\n" }))
			.route("/echo", post(|body: Bytes| async move { body }))
			.route("/admin", get(|| async { "admin\n" }))
			.layer(SignLayer::new(self.sign.clone()))
			.layer(AclLayer::new(self.acl.clone()))
			.layer(AddExtensionLayer::new(RequestScope(scope)))
			.layer(TraceLayer::new_for_http())
	}
}


// vim: ts=4
