//! Resolution service: cache lookup, hierarchy fallback, deduplicated backend
//! load and validation behind a single entry point for middleware.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::backend::{ConfigBackend, OptionFactory, ScopedReader};
use crate::cache::ConfigCache;
use crate::config::default_error_handler;
use crate::inflight::InflightLoader;
use crate::option::ScopeOption;
use crate::prelude::*;

struct FactorySource<C> {
	backend: Arc<dyn ConfigBackend>,
	factory: Arc<dyn OptionFactory<C>>,
}

pub struct Service<C: ScopedConfig> {
	/// Package name, used in logs
	name: &'static str,
	cache: ConfigCache<C>,
	inflight: InflightLoader<ScopeKey, ClResult<Arc<C>>>,
	source: Option<FactorySource<C>>,
	error_handler: ErrorHandler,
	/// Held from reading a scope's explicit config until its draft is published
	publish_lock: Mutex<()>,
}

impl<C: ScopedConfig> Service<C> {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			cache: ConfigCache::new(),
			inflight: InflightLoader::new(),
			source: None,
			error_handler: default_error_handler(),
			publish_lock: Mutex::new(()),
		}
	}

	/// Handler used when no scoped config could be resolved
	pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
		self.error_handler = handler;
		self
	}

	/// Enables lazy loading of scopes missing from the cache
	pub fn with_option_factory(
		mut self,
		backend: Arc<dyn ConfigBackend>,
		factory: Arc<dyn OptionFactory<C>>,
	) -> Self {
		self.source = Some(FactorySource { backend, factory });
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn cache(&self) -> &ConfigCache<C> {
		&self.cache
	}

	pub fn error_handler(&self) -> &ErrorHandler {
		&self.error_handler
	}

	/// The config's own handler, or the service default
	pub fn error_handler_for(&self, config: Option<&C>) -> ErrorHandler {
		config.and_then(|c| c.error_handler()).unwrap_or(&self.error_handler).clone()
	}

	/// Applies options grouped by scope and publishes one config per scope.
	///
	/// Each scope starts from its current explicit config (or the package
	/// defaults) and is published only when all of its options applied. The
	/// first failing scope stops the call; scopes before it stay published.
	/// Concurrent calls for the same scope are applied one after the other, so
	/// no call's patches are lost.
	pub fn options(&self, opts: impl IntoIterator<Item = ScopeOption<C>>) -> ClResult<()> {
		let mut groups: Vec<(Scope, Vec<ScopeOption<C>>)> = Vec::new();
		for opt in opts {
			let scope = opt.scope();
			match groups.iter_mut().find(|(s, _)| s.current == scope.current) {
				Some((_, list)) => list.push(opt),
				None => groups.push((scope, vec![opt])),
			}
		}

		for (scope, list) in groups {
			let _publishing = self.publish_lock.lock();
			let mut draft = match self.cache.get_explicit(&scope.current) {
				Some(current) => C::clone(&current),
				None => C::new_scoped(scope.current, scope.parent),
			};
			let labels: Vec<String> = list.iter().map(|opt| opt.label().to_string()).collect();
			for opt in list {
				if let Err(err) = opt.apply(&mut draft) {
					draft.base_mut().last_err = Some(err.clone());
					debug!("[{}] rejected draft for {}: {:?}", self.name, scope.current, draft);
					return Err(err.context(format!("{} options for {}", self.name, scope.current)));
				}
			}
			info!("[{}] publishing config for {} ({})", self.name, scope.current, labels.join(", "));
			self.cache.publish(scope.current, Arc::new(draft));
		}
		Ok(())
	}

	/// One-hop resolution against the cache, see [`ConfigCache::resolve`]
	pub fn resolve(&self, current: ScopeKey, parent: Option<ScopeKey>) -> ClResult<Arc<C>> {
		self.cache.resolve(current, parent)
	}

	/// Resolved config for a request scope
	///
	/// Warm scopes are served from the cache without touching the loader. A
	/// cold scope triggers at most one backend fetch however many requests
	/// arrive for it concurrently.
	pub async fn config_for_scope(&self, scope: &Scope) -> ClResult<Arc<C>> {
		let current = scope.current;
		if let Some(config) = self.cache.get(&current) {
			config.is_valid()?;
			return Ok(config);
		}

		let Some(source) = &self.source else {
			return self.cache.resolve(current, scope.parent);
		};

		self.inflight.load_once(current, || self.load_scope(scope, source)).await
	}

	/// Resolution for middleware: takes the scope bound to a request (or the
	/// error from looking it up) and logs a failure once, the root cause at
	/// warn level and the full chain at debug level.
	pub async fn config_for_request(&self, scope: ClResult<Scope>) -> ClResult<Arc<C>> {
		let result = match scope {
			Ok(scope) => self
				.config_for_scope(&scope)
				.await
				.with_context(|| format!("{} for {}", self.name, scope)),
			Err(err) => Err(err.context(self.name)),
		};
		if let Err(err) = &result {
			warn!("[{}] no usable config: {}", self.name, err.root());
			debug!("[{}] resolution failed: {:?}", self.name, err);
		}
		result
	}

	async fn load_scope(&self, scope: &Scope, source: &FactorySource<C>) -> ClResult<Arc<C>> {
		let current = scope.current;
		// A load for this scope may have finished since the cache check
		if let Some(config) = self.cache.get(&current) {
			config.is_valid()?;
			return Ok(config);
		}
		debug!("[{}] loading {} from backend", self.name, scope);
		let reader = ScopedReader::new(source.backend.clone(), *scope);
		let opts = source
			.factory
			.options(&reader)
			.await
			.with_context(|| format!("{} option factory for {}", self.name, current))?;
		self.options(opts)?;
		self.cache.resolve(current, scope.parent)
	}

	/// Drops every cached config, explicit and aliased
	pub fn clear_cache(&self) {
		info!("[{}] clearing config cache ({} entries)", self.name, self.cache.len());
		self.cache.clear();
	}

	/// Drops one scope and all aliases derived from it
	pub fn flush_scope(&self, key: ScopeKey) -> bool {
		self.cache.remove(&key)
	}

	pub fn debug_dump(&self) -> String {
		self.cache.dump()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::tests::TestConfig;
	use crate::option::with_disabled;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn with_secret(scope: Scope, secret: &str) -> ScopeOption<TestConfig> {
		let secret = secret.to_string();
		ScopeOption::new(scope, "secret", move |cfg: &mut TestConfig| {
			cfg.secret = Some(secret);
			Ok(())
		})
	}

	struct NoBackend;

	#[async_trait]
	impl ConfigBackend for NoBackend {
		async fn read(&self, _key: ScopeKey, _path: &str) -> ClResult<Option<serde_json::Value>> {
			Ok(None)
		}
	}

	#[derive(Default)]
	struct CountingFactory {
		calls: AtomicUsize,
	}

	#[async_trait]
	impl OptionFactory<TestConfig> for CountingFactory {
		async fn options(&self, reader: &ScopedReader) -> ClResult<Vec<ScopeOption<TestConfig>>> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(vec![with_secret(reader.scope(), &format!("loaded-{}", n))])
		}
	}

	#[test]
	fn test_options_publish_per_scope() {
		let service = Service::<TestConfig>::new("test");
		service
			.options([
				with_secret(Scope::default(), "d"),
				with_secret(Scope::website(1), "w1"),
				with_disabled(Scope::default(), true),
			])
			.unwrap();

		let default = service.resolve(ScopeKey::DEFAULT, None).unwrap();
		assert_eq!(default.secret.as_deref(), Some("d"));
		assert!(default.base.disabled);
		assert_eq!(service.cache().len(), 2);
	}

	#[test]
	fn test_options_update_replaces_entry() {
		let service = Service::<TestConfig>::new("test");
		service.options([with_secret(Scope::website(1), "w1")]).unwrap();
		let before = service.resolve(ScopeKey::website(1), None).unwrap();

		service.options([with_disabled(Scope::website(1), true)]).unwrap();
		let after = service.resolve(ScopeKey::website(1), None).unwrap();

		assert!(!Arc::ptr_eq(&before, &after));
		assert!(!before.base.disabled);
		assert!(after.base.disabled);
		assert_eq!(after.secret.as_deref(), Some("w1"));
	}

	#[test]
	fn test_failed_option_does_not_publish() {
		let service = Service::<TestConfig>::new("test");
		let bad = ScopeOption::new(Scope::website(1), "pattern", |_cfg: &mut TestConfig| {
			Err(Error::Fatal("invalid pattern".into()))
		});
		let err = service.options([with_secret(Scope::website(1), "w1"), bad]).unwrap_err();
		assert!(err.is_fatal());
		assert!(service.cache().is_empty());
	}

	#[test]
	fn test_concurrent_options_keep_every_patch() {
		let service = Arc::new(Service::<TestConfig>::new("test"));
		let threads: Vec<_> = (0..8)
			.map(|_| {
				let service = service.clone();
				std::thread::spawn(move || {
					for _ in 0..50 {
						let append =
							ScopeOption::new(Scope::website(1), "append", |cfg: &mut TestConfig| {
								let secret = cfg.secret.take().unwrap_or_default();
								cfg.secret = Some(secret + "x");
								Ok(())
							});
						service.options([append]).unwrap();
					}
				})
			})
			.collect();
		for thread in threads {
			thread.join().unwrap();
		}

		let config = service.resolve(ScopeKey::website(1), None).unwrap();
		assert_eq!(config.secret.as_deref().map(str::len), Some(400));
	}

	#[tokio::test]
	async fn test_without_factory_uses_startup_config() {
		let service = Service::<TestConfig>::new("test");
		assert!(service.config_for_scope(&Scope::store(2, 1)).await.unwrap_err().is_not_found());

		service.options([with_secret(Scope::website(1), "w1")]).unwrap();
		let store = service.config_for_scope(&Scope::store(2, 1)).await.unwrap();
		assert_eq!(store.secret.as_deref(), Some("w1"));
		assert!(service.cache().is_alias(&ScopeKey::store(2)));
	}

	#[tokio::test]
	async fn test_factory_called_once_per_cold_scope() {
		let factory = Arc::new(CountingFactory::default());
		let service = Service::<TestConfig>::new("test")
			.with_option_factory(Arc::new(NoBackend), factory.clone());

		let first = service.config_for_scope(&Scope::website(1)).await.unwrap();
		let second = service.config_for_scope(&Scope::website(1)).await.unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(first.secret.as_deref(), Some("loaded-0"));
		assert_eq!(factory.calls.load(Ordering::SeqCst), 1);

		service.flush_scope(ScopeKey::website(1));
		service.config_for_scope(&Scope::website(1)).await.unwrap();
		assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_config_for_request_adds_context() {
		let service = Service::<TestConfig>::new("test");
		let err = service.config_for_request(Ok(Scope::website(8))).await.unwrap_err();
		assert!(err.is_not_found());
		assert!(err.to_string().starts_with("test for Website(8) -> Default(0)"));

		let err = service
			.config_for_request(Err(Error::NotFound("request scope".into())))
			.await
			.unwrap_err();
		assert!(err.to_string().starts_with("test: "));
	}

	#[test]
	fn test_error_handler_for() {
		let service = Service::<TestConfig>::new("test");
		let own = crate::config::unauthorized_handler();
		let mut cfg = TestConfig::new_scoped(ScopeKey::DEFAULT, None);
		assert!(Arc::ptr_eq(&service.error_handler_for(Some(&cfg)), service.error_handler()));

		cfg.base.error_handler = Some(own.clone());
		assert!(Arc::ptr_eq(&service.error_handler_for(Some(&cfg)), &own));
		assert!(Arc::ptr_eq(&service.error_handler_for(None), service.error_handler()));
	}
}

// vim: ts=4
