//! Signing through the buffered and trailer paths

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use hmac::{Hmac, Mac};
use http_body_util::{BodyExt, Full};
use sha2::Sha256;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use scopecfg_backend_memory::MemoryBackend;
use scopecfg_core::{with_disabled, RequestScope, ScopedConfig, Service};
use scopecfg_sign::{
	with_hash, with_key_id, with_max_body, with_trailer, BodyHasher, BufferPool, HashRegistry,
	SignConfig, SignLayer, SignOptionFactory,
};
use scopecfg_types::{ClResult, Scope, ScopeKey};

const KEY: &str = "My gu1n34 p1g run5 acro55 my k3yb0ard";
const BODY: &str =
	"The most important property of a program is whether it accomplishes the intention of its user.";

fn expected_hex(key: &str, body: &str) -> String {
	let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes()).unwrap();
	Mac::update(&mut mac, body.as_bytes());
	hex::encode(mac.finalize().into_bytes())
}

fn app(configs: Arc<Service<SignConfig>>, scope: Scope) -> Router {
	Router::new()
		.route("/", get(|| async { BODY }))
		.layer(SignLayer::new(configs))
		.layer(axum::Extension(RequestScope(scope)))
}

/// Response body that sends one chunk and then fails
fn broken_response() -> Response {
	let chunks = futures::stream::iter([
		Ok(Bytes::from_static(b"partial")),
		Err(std::io::Error::other("upstream closed")),
	]);
	Response::new(Body::from_stream(chunks))
}

fn broken_app(configs: Arc<Service<SignConfig>>, buffers: Arc<BufferPool>) -> Router {
	Router::new()
		.route("/", get(|| async { broken_response() }))
		.layer(SignLayer::new(configs).with_buffers(buffers))
		.layer(axum::Extension(RequestScope(Scope::default())))
}

fn get_root() -> Request<Body> {
	Request::builder().uri("/").body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_buffered_signature_matches_independent_hmac() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs.options([with_hash(Scope::default(), &registry, "sha256", KEY)]).unwrap();

	let res = app(configs, Scope::default()).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::OK);

	let signature = res.headers().get("content-hmac").unwrap().to_str().unwrap().to_string();
	let digest = signature.strip_prefix("sha256 ").unwrap();
	assert_eq!(digest.len(), 64);
	assert_eq!(digest, expected_hex(KEY, BODY));
	assert_eq!(res.headers().get(header::CONTENT_LENGTH).unwrap(), &BODY.len().to_string());

	let body = res.into_body().collect().await.unwrap().to_bytes();
	assert_eq!(body, BODY);
}

#[tokio::test]
async fn test_trailer_signature_matches_independent_hmac() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs
		.options([
			with_hash(Scope::default(), &registry, "sha256", KEY),
			with_trailer(Scope::default(), true),
		])
		.unwrap();

	let res = app(configs, Scope::store(2, 1)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::OK);
	assert!(res.headers().get("content-hmac").is_none());
	assert_eq!(res.headers().get(header::TRAILER).unwrap(), "content-hmac");

	let collected = res.into_body().collect().await.unwrap();
	let trailer = collected.trailers().unwrap().get("content-hmac").unwrap().clone();
	assert_eq!(trailer.to_str().unwrap(), format!("sha256 {}", expected_hex(KEY, BODY)));
	assert_eq!(collected.to_bytes(), BODY);
}

#[tokio::test]
async fn test_structured_header_format() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs
		.options([
			with_hash(Scope::website(1), &registry, "sha256", KEY),
			with_key_id(Scope::website(1), "k-2024"),
		])
		.unwrap();

	let res = app(configs, Scope::store(7, 1)).oneshot(get_root()).await.unwrap();
	let value = res.headers().get("content-signature").unwrap().to_str().unwrap();
	assert_eq!(
		value,
		format!(
			"keyId=\"k-2024\",algorithm=\"sha256\",signature=\"{}\"",
			expected_hex(KEY, BODY)
		)
	);
}

/// HMAC-SHA256 counting every hashed chunk
struct CountingHasher {
	inner: Hmac<Sha256>,
	updates: Arc<AtomicUsize>,
}

impl BodyHasher for CountingHasher {
	fn update(&mut self, data: &[u8]) {
		self.updates.fetch_add(1, Ordering::SeqCst);
		Mac::update(&mut self.inner, data);
	}

	fn finalize_reset(&mut self) -> Vec<u8> {
		BodyHasher::finalize_reset(&mut self.inner)
	}

	fn verify_reset(&mut self, expected: &[u8]) -> bool {
		BodyHasher::verify_reset(&mut self.inner, expected)
	}

	fn reset(&mut self) {
		BodyHasher::reset(&mut self.inner);
	}

	fn output_size(&self) -> usize {
		BodyHasher::output_size(&self.inner)
	}
}

fn counting_registry(updates: Arc<AtomicUsize>) -> HashRegistry {
	let registry = HashRegistry::new();
	registry
		.register(
			"sha256",
			Arc::new(move |key: &[u8]| -> ClResult<Box<dyn BodyHasher>> {
				let inner = <Hmac<Sha256> as Mac>::new_from_slice(key).unwrap();
				Ok(Box::new(CountingHasher { inner, updates: updates.clone() }))
			}),
		)
		.unwrap();
	registry
}

#[tokio::test]
async fn test_disabled_scope_does_no_hashing() {
	let updates = Arc::new(AtomicUsize::new(0));
	let registry = counting_registry(updates.clone());
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs
		.options([
			with_hash(Scope::website(1), &registry, "sha256", KEY),
			with_disabled(Scope::website(1), true),
		])
		.unwrap();

	let res = app(configs.clone(), Scope::store(2, 1)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::OK);
	assert!(res.headers().get("content-hmac").is_none());
	assert_eq!(res.into_body().collect().await.unwrap().to_bytes(), BODY);
	assert_eq!(updates.load(Ordering::SeqCst), 0);

	// Only the probe hasher from option time was ever built
	let config = configs.resolve(ScopeKey::website(1), None).unwrap();
	assert!(config.is_disabled());
	assert_eq!(config.hash_pool.as_ref().unwrap().created(), 1);
}

#[tokio::test]
async fn test_hashers_return_to_pool() {
	let updates = Arc::new(AtomicUsize::new(0));
	let registry = counting_registry(updates.clone());
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs.options([with_hash(Scope::default(), &registry, "sha256", KEY)]).unwrap();

	for _ in 0..5 {
		let res = app(configs.clone(), Scope::default()).oneshot(get_root()).await.unwrap();
		assert!(res.headers().get("content-hmac").is_some());
	}
	let config = configs.resolve(ScopeKey::DEFAULT, None).unwrap();
	let pool = config.hash_pool.as_ref().unwrap();
	assert_eq!(pool.created(), 1);
	assert_eq!(pool.idle(), 1);
	assert_eq!(updates.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_factory_loads_per_scope_settings() {
	let backend = Arc::new(MemoryBackend::new());
	backend.set(ScopeKey::DEFAULT, "sign/algorithm", "sha256".into());
	backend.set(ScopeKey::DEFAULT, "sign/key", KEY.into());
	backend.set(ScopeKey::website(3), "sign/trailer", true.into());
	backend.set(ScopeKey::website(4), "sign/disabled", true.into());

	let registry = Arc::new(HashRegistry::with_defaults());
	let configs = Arc::new(
		Service::<SignConfig>::new("sign")
			.with_option_factory(backend.clone(), Arc::new(SignOptionFactory::new(registry))),
	);

	let res = app(configs.clone(), Scope::store(9, 3)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.headers().get(header::TRAILER).unwrap(), "content-hmac");
	let collected = res.into_body().collect().await.unwrap();
	assert!(collected.trailers().unwrap().get("content-hmac").is_some());

	let res = app(configs.clone(), Scope::website(4)).oneshot(get_root()).await.unwrap();
	assert!(res.headers().get("content-hmac").is_none());

	backend.set(ScopeKey::website(5), "sign/encoding", "rot13".into());
	let res = app(configs.clone(), Scope::website(5)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

	backend.set(ScopeKey::website(6), "sign/max_body", 8.into());
	let res = app(configs.clone(), Scope::website(6)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(configs.resolve(ScopeKey::website(6), None).unwrap().max_body, 8);

	backend.set(ScopeKey::website(7), "sign/max_body", (-1).into());
	let res = app(configs, Scope::website(7)).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_buffered_body_error_uses_scope_handler() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs.options([with_hash(Scope::default(), &registry, "sha256", KEY)]).unwrap();
	let buffers = scopecfg_sign::pool::buffer_pool();

	let res = broken_app(configs.clone(), buffers.clone()).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
	assert!(res.headers().get("content-hmac").is_none());

	let config = configs.resolve(ScopeKey::DEFAULT, None).unwrap();
	let pool = config.hash_pool.as_ref().unwrap();
	assert_eq!(pool.idle(), pool.created());
	assert_eq!((buffers.created(), buffers.idle()), (1, 1));
}

#[tokio::test]
async fn test_trailer_body_error_reaches_client() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs
		.options([
			with_hash(Scope::default(), &registry, "sha256", KEY),
			with_trailer(Scope::default(), true),
		])
		.unwrap();
	let buffers = scopecfg_sign::pool::buffer_pool();

	let res = broken_app(configs.clone(), buffers.clone()).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::OK);
	assert!(res.into_body().collect().await.is_err());

	let config = configs.resolve(ScopeKey::DEFAULT, None).unwrap();
	let pool = config.hash_pool.as_ref().unwrap();
	assert_eq!(pool.idle(), pool.created());
	assert_eq!(buffers.created(), 0);
}

#[tokio::test]
async fn test_oversized_response_is_not_buffered() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs
		.options([
			with_hash(Scope::default(), &registry, "sha256", KEY),
			with_max_body(Scope::default(), 16),
		])
		.unwrap();

	let res = app(configs, Scope::default()).oneshot(get_root()).await.unwrap();
	assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_buffered_path_keeps_inner_trailers() {
	let registry = HashRegistry::with_defaults();
	let configs = Arc::new(Service::<SignConfig>::new("sign"));
	configs.options([with_hash(Scope::default(), &registry, "sha256", KEY)]).unwrap();

	let handler = || async {
		let mut trailers = HeaderMap::new();
		trailers.insert("x-inner", HeaderValue::from_static("1"));
		let body = Full::new(Bytes::from_static(BODY.as_bytes()))
			.with_trailers(async move { Some(Ok::<_, Infallible>(trailers)) });
		Response::new(Body::new(body))
	};
	let router = Router::new()
		.route("/", get(handler))
		.layer(SignLayer::new(configs))
		.layer(axum::Extension(RequestScope(Scope::default())));

	let res = router.oneshot(get_root()).await.unwrap();
	let signature = res.headers().get("content-hmac").unwrap().clone();
	assert_eq!(signature.to_str().unwrap(), format!("sha256 {}", expected_hex(KEY, BODY)));

	let collected = res.into_body().collect().await.unwrap();
	assert_eq!(collected.trailers().unwrap().get("x-inner").unwrap(), "1");
	assert_eq!(collected.to_bytes(), BODY);
}

// vim: ts=4
