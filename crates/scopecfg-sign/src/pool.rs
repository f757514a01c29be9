//! Reusable object pools for hashers and body buffers
//!
//! A borrowed item is wrapped in a [`Pooled`] guard; dropping the guard resets
//! the item and hands it back, whichever path the request took.

use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::prelude::*;
use crate::registry::BodyHasher;

type MakeFn<T> = Box<dyn Fn() -> ClResult<T> + Send + Sync>;
type ResetFn<T> = Box<dyn Fn(&mut T) -> bool + Send + Sync>;

pub struct Pool<T> {
	idle: Mutex<Vec<T>>,
	make: MakeFn<T>,
	/// Prepares an item for reuse, `false` discards it
	reset: ResetFn<T>,
	max_idle: usize,
	created: AtomicUsize,
}

impl<T: Send + 'static> Pool<T> {
	pub fn new<M, R>(max_idle: usize, make: M, reset: R) -> Arc<Self>
	where
		M: Fn() -> ClResult<T> + Send + Sync + 'static,
		R: Fn(&mut T) -> bool + Send + Sync + 'static,
	{
		Arc::new(Self {
			idle: Mutex::new(Vec::new()),
			make: Box::new(make),
			reset: Box::new(reset),
			max_idle,
			created: AtomicUsize::new(0),
		})
	}

	/// Borrows an idle item or builds a new one
	pub fn get(self: &Arc<Self>) -> ClResult<Pooled<T>> {
		let item = self.idle.lock().pop();
		let item = match item {
			Some(item) => item,
			None => {
				let item = (self.make)()?;
				self.created.fetch_add(1, Ordering::Relaxed);
				item
			}
		};
		Ok(Pooled { item: Some(item), pool: self.clone() })
	}

	fn put(&self, mut item: T) {
		if !(self.reset)(&mut item) {
			return;
		}
		let mut idle = self.idle.lock();
		if idle.len() < self.max_idle {
			idle.push(item);
		}
	}

	/// Number of items waiting for reuse
	pub fn idle(&self) -> usize {
		self.idle.lock().len()
	}

	/// Number of items built over the pool's lifetime
	pub fn created(&self) -> usize {
		self.created.load(Ordering::Relaxed)
	}
}

impl<T> fmt::Debug for Pool<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pool")
			.field("idle", &self.idle.lock().len())
			.field("max_idle", &self.max_idle)
			.field("created", &self.created.load(Ordering::Relaxed))
			.finish()
	}
}

pub struct Pooled<T: Send + 'static> {
	item: Option<T>,
	pool: Arc<Pool<T>>,
}

impl<T: Send + 'static> Deref for Pooled<T> {
	type Target = T;

	fn deref(&self) -> &T {
		// Only None after drop
		match &self.item {
			Some(item) => item,
			None => unreachable!(),
		}
	}
}

impl<T: Send + 'static> DerefMut for Pooled<T> {
	fn deref_mut(&mut self) -> &mut T {
		match &mut self.item {
			Some(item) => item,
			None => unreachable!(),
		}
	}
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for Pooled<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Pooled").field(&self.item).finish()
	}
}

impl<T: Send + 'static> Drop for Pooled<T> {
	fn drop(&mut self) {
		if let Some(item) = self.item.take() {
			self.pool.put(item);
		}
	}
}

pub type HashPool = Pool<Box<dyn BodyHasher>>;
pub type BufferPool = Pool<Vec<u8>>;

/// Idle hashers kept per resolved config
const HASH_POOL_IDLE: usize = 64;
/// Idle buffers kept per layer
const BUFFER_POOL_IDLE: usize = 64;
/// Buffers grown past this are dropped instead of returned
const BUFFER_MAX_RETAINED: usize = 1024 * 1024;

/// Pool of hashers sharing one constructor and key
pub fn hash_pool<M>(make: M) -> Arc<HashPool>
where
	M: Fn() -> ClResult<Box<dyn BodyHasher>> + Send + Sync + 'static,
{
	Pool::new(HASH_POOL_IDLE, make, |hasher: &mut Box<dyn BodyHasher>| {
		hasher.reset();
		true
	})
}

pub fn buffer_pool() -> Arc<BufferPool> {
	Pool::new(
		BUFFER_POOL_IDLE,
		|| Ok(Vec::with_capacity(8 * 1024)),
		|buf: &mut Vec<u8>| {
			buf.clear();
			buf.capacity() <= BUFFER_MAX_RETAINED
		},
	)
}


// vim: ts=4
