//! Per-key in-flight load deduplication
//!
//! Concurrent callers sharing a key await a single execution of the load and
//! all observe the identical result. The key is forgotten as soon as the load
//! completes, so a failed load is never cached and the next caller retries.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct InflightLoader<K, V> {
	calls: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> InflightLoader<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	pub fn new() -> Self {
		Self { calls: Mutex::new(HashMap::new()) }
	}

	/// Runs `load` unless a load for `key` is already in flight, in which case
	/// the caller waits for that one.
	///
	/// If the caller running the load is cancelled, one of the waiters takes
	/// over and runs its own `load`.
	pub async fn load_once<F, Fut>(&self, key: K, load: F) -> V
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = V>,
	{
		let cell = {
			let mut calls = self.calls.lock();
			calls.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
		};

		let value = cell.get_or_init(load).await.clone();

		let mut calls = self.calls.lock();
		if calls.get(&key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
			calls.remove(&key);
		}
		value
	}

	/// Number of keys with a load in flight
	pub fn pending(&self) -> usize {
		self.calls.lock().len()
	}
}

impl<K, V> Default for InflightLoader<K, V>
where
	K: Eq + Hash + Clone,
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
