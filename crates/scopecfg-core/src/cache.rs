//! Scope -> config cache with one-hop hierarchical fallback
//!
//! Entries are either explicit (published from options) or aliases: a second
//! reference to an already-resolved parent's object. Publishing or removing a
//! scope evicts every alias that was derived from it, so an alias is never left
//! pinned to a stale parent.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use crate::prelude::*;

enum CacheEntry<C> {
	Explicit(Arc<C>),
	Alias {
		/// Natural parent requested when the alias was created
		parent: ScopeKey,
		/// Key whose entry supplied the object (the parent or Default)
		target: ScopeKey,
		config: Arc<C>,
	},
}

impl<C> CacheEntry<C> {
	fn config(&self) -> &Arc<C> {
		match self {
			CacheEntry::Explicit(config) | CacheEntry::Alias { config, .. } => config,
		}
	}

	fn derives_from(&self, key: &ScopeKey) -> bool {
		match self {
			CacheEntry::Explicit(_) => false,
			CacheEntry::Alias { parent, target, .. } => parent == key || target == key,
		}
	}
}

pub struct ConfigCache<C> {
	entries: RwLock<HashMap<ScopeKey, CacheEntry<C>>>,
}

impl<C: ScopedConfig> ConfigCache<C> {
	pub fn new() -> Self {
		Self { entries: RwLock::new(HashMap::new()) }
	}

	/// Shared-read lookup, no fallback
	pub fn get(&self, key: &ScopeKey) -> Option<Arc<C>> {
		self.entries.read().get(key).map(|entry| entry.config().clone())
	}

	/// Looks up `current`; on a miss falls back one hop to `parent`, then to
	/// Default, aliasing `current` to whatever was found.
	///
	/// With `parent == None` the caller declined fallback and a miss is
	/// `NotFound`. A found config is returned together with its validity check.
	pub fn resolve(&self, current: ScopeKey, parent: Option<ScopeKey>) -> ClResult<Arc<C>> {
		if let Some(config) = self.get(&current) {
			config.is_valid()?;
			return Ok(config);
		}
		let Some(parent) = parent else {
			return Err(Error::NotFound(current.to_string()));
		};

		let mut entries = self.entries.write();
		// Published by another writer between the read and write lock
		if let Some(entry) = entries.get(&current) {
			let config = entry.config().clone();
			drop(entries);
			config.is_valid()?;
			return Ok(config);
		}

		let mut targets = vec![parent];
		if !parent.is_default() && !current.is_default() {
			targets.push(ScopeKey::DEFAULT);
		}
		for target in targets {
			let Some(config) = entries.get(&target).map(|entry| entry.config().clone()) else {
				continue;
			};
			debug!("Aliasing {} to {}", current, target);
			entries.insert(current, CacheEntry::Alias { parent, target, config: config.clone() });
			drop(entries);
			config.is_valid()?;
			return Ok(config);
		}

		Err(Error::NotFound(current.to_string()))
	}

	/// Atomically replaces the entry for `key` with an explicit config
	pub fn publish(&self, key: ScopeKey, config: Arc<C>) {
		let mut entries = self.entries.write();
		let evicted = evict_derived(&mut entries, key);
		if evicted > 0 {
			debug!("Evicted {} alias(es) derived from {}", evicted, key);
		}
		entries.insert(key, CacheEntry::Explicit(config));
	}

	/// Removes `key` and every alias derived from it
	pub fn remove(&self, key: &ScopeKey) -> bool {
		let mut entries = self.entries.write();
		evict_derived(&mut entries, *key);
		entries.remove(key).is_some()
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}

	pub fn is_alias(&self, key: &ScopeKey) -> bool {
		matches!(self.entries.read().get(key), Some(CacheEntry::Alias { .. }))
	}

	/// Explicit (non-alias) config for `key`
	pub fn get_explicit(&self, key: &ScopeKey) -> Option<Arc<C>> {
		match self.entries.read().get(key) {
			Some(CacheEntry::Explicit(config)) => Some(config.clone()),
			_ => None,
		}
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Diagnostic dump in sorted key order. Not a stable format.
	pub fn dump(&self) -> String {
		let entries = self.entries.read();
		let mut keys: Vec<&ScopeKey> = entries.keys().collect();
		keys.sort();

		let mut out = String::new();
		for key in keys {
			let Some(entry) = entries.get(key) else { continue };
			let _ = match entry {
				CacheEntry::Explicit(config) => {
					writeln!(out, "{} [{:p}]\n{:#?}", key, Arc::as_ptr(config), config)
				}
				CacheEntry::Alias { parent, target, config } => writeln!(
					out,
					"{} -> {} (parent {}) [{:p}]\n{:#?}",
					key,
					target,
					parent,
					Arc::as_ptr(config),
					config
				),
			};
		}
		out
	}
}

impl<C: ScopedConfig> Default for ConfigCache<C> {
	fn default() -> Self {
		Self::new()
	}
}

/// Removes aliases derived from `key`, transitively
fn evict_derived<C>(entries: &mut HashMap<ScopeKey, CacheEntry<C>>, key: ScopeKey) -> usize {
	let mut pending = vec![key];
	let mut evicted = 0;
	while let Some(source) = pending.pop() {
		let derived: Vec<ScopeKey> = entries
			.iter()
			.filter(|(_, entry)| entry.derives_from(&source))
			.map(|(k, _)| *k)
			.collect();
		for k in derived {
			entries.remove(&k);
			evicted += 1;
			pending.push(k);
		}
	}
	evicted
}


// vim: ts=4
