//! In-memory configuration backend
//!
//! Holds one JSON value per (scope, path). Used for startup seeding from the
//! environment and in tests; reads are counted so callers can observe how
//! often resolution reached the backend.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use scopecfg_core::ConfigBackend;
use scopecfg_types::prelude::*;

#[derive(Debug, Default)]
pub struct MemoryBackend {
	values: RwLock<HashMap<(ScopeKey, String), serde_json::Value>>,
	reads: AtomicUsize,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, key: ScopeKey, path: &str, value: serde_json::Value) {
		debug!("Backend set {} at {}", path, key);
		self.values.write().insert((key, path.to_string()), value);
	}

	pub fn unset(&self, key: ScopeKey, path: &str) -> bool {
		self.values.write().remove(&(key, path.to_string())).is_some()
	}

	/// Number of `read` calls served so far
	pub fn reads(&self) -> usize {
		self.reads.load(Ordering::SeqCst)
	}

	pub fn len(&self) -> usize {
		self.values.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.read().is_empty()
	}
}

#[async_trait]
impl ConfigBackend for MemoryBackend {
	async fn read(&self, key: ScopeKey, path: &str) -> ClResult<Option<serde_json::Value>> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.values.read().get(&(key, path.to_string())).cloned())
	}
}


// vim: ts=4
