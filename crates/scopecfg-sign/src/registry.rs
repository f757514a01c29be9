//! Hash algorithm registry
//!
//! Maps algorithm names (as they appear on the wire) to keyed hasher
//! constructors. The registry is an explicit object owned by the application
//! and handed to the options that need it.

use hmac::digest::OutputSizeUser;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::{Sha256, Sha384, Sha512};
use std::collections::HashMap;
use std::sync::Arc;

use crate::prelude::*;

/// Incremental keyed hash over a message body
pub trait BodyHasher: Send + Sync {
	fn update(&mut self, data: &[u8]);

	/// Returns the digest and leaves the hasher ready for the next message
	fn finalize_reset(&mut self) -> Vec<u8>;

	/// Constant-time comparison of the digest against `expected`, resets the hasher
	fn verify_reset(&mut self, expected: &[u8]) -> bool;

	fn reset(&mut self);

	fn output_size(&self) -> usize;
}

macro_rules! hmac_body_hasher {
	($($digest:ty),+) => {
		$(
			impl BodyHasher for Hmac<$digest> {
				fn update(&mut self, data: &[u8]) {
					Mac::update(self, data);
				}

				fn finalize_reset(&mut self) -> Vec<u8> {
					Mac::finalize_reset(self).into_bytes().to_vec()
				}

				fn verify_reset(&mut self, expected: &[u8]) -> bool {
					Mac::verify_slice_reset(self, expected).is_ok()
				}

				fn reset(&mut self) {
					Mac::reset(self);
				}

				fn output_size(&self) -> usize {
					<Self as OutputSizeUser>::output_size()
				}
			}
		)+
	};
}

hmac_body_hasher!(Sha256, Sha384, Sha512);

/// Builds a hasher keyed with the given secret
pub type HashConstructor = Arc<dyn Fn(&[u8]) -> ClResult<Box<dyn BodyHasher>> + Send + Sync>;

fn hmac_constructor<M>() -> HashConstructor
where
	M: Mac + hmac::digest::KeyInit + BodyHasher + 'static,
{
	Arc::new(|key: &[u8]| {
		let mac = <M as Mac>::new_from_slice(key)
			.map_err(|_| Error::Fatal("invalid HMAC key length".into()))?;
		Ok(Box::new(mac) as Box<dyn BodyHasher>)
	})
}

#[derive(Default)]
pub struct HashRegistry {
	constructors: RwLock<HashMap<String, HashConstructor>>,
}

impl HashRegistry {
	/// Empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry with HMAC `sha256`, `sha384` and `sha512`
	pub fn with_defaults() -> Self {
		let registry = Self::new();
		let mut constructors = registry.constructors.write();
		constructors.insert("sha256".into(), hmac_constructor::<Hmac<Sha256>>());
		constructors.insert("sha384".into(), hmac_constructor::<Hmac<Sha384>>());
		constructors.insert("sha512".into(), hmac_constructor::<Hmac<Sha512>>());
		drop(constructors);
		registry
	}

	/// Registers a constructor under `name`. Names are unique.
	pub fn register(&self, name: impl Into<String>, constructor: HashConstructor) -> ClResult<()> {
		let name = name.into();
		let mut constructors = self.constructors.write();
		if constructors.contains_key(&name) {
			return Err(Error::ConfigError(format!("hash algorithm {} already registered", name)));
		}
		debug!("Registered hash algorithm {}", name);
		constructors.insert(name, constructor);
		Ok(())
	}

	pub fn deregister(&self, name: &str) -> bool {
		self.constructors.write().remove(name).is_some()
	}

	pub fn lookup(&self, name: &str) -> Option<HashConstructor> {
		self.constructors.read().get(name).cloned()
	}

	/// Registered names, sorted
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
		names.sort();
		names
	}
}

impl std::fmt::Debug for HashRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HashRegistry").field("names", &self.names()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let registry = HashRegistry::with_defaults();
		assert_eq!(registry.names(), vec!["sha256", "sha384", "sha512"]);

		let ctor = registry.lookup("sha384").unwrap();
		let hasher = ctor(b"key").unwrap();
		assert_eq!(hasher.output_size(), 48);
		assert!(registry.lookup("md5").is_none());
	}

	#[test]
	fn test_register_and_deregister() {
		let registry = HashRegistry::new();
		registry.register("hmac-sha256", hmac_constructor::<Hmac<Sha256>>()).unwrap();
		let err = registry.register("hmac-sha256", hmac_constructor::<Hmac<Sha256>>()).unwrap_err();
		assert!(matches!(err, Error::ConfigError(_)));

		assert!(registry.deregister("hmac-sha256"));
		assert!(!registry.deregister("hmac-sha256"));
		assert!(registry.names().is_empty());
	}

	#[test]
	fn test_finalize_resets_state() {
		let registry = HashRegistry::with_defaults();
		let mut hasher = registry.lookup("sha256").unwrap()(b"secret").unwrap();

		hasher.update(b"hello");
		let first = hasher.finalize_reset();
		hasher.update(b"hello");
		let second = hasher.finalize_reset();
		assert_eq!(first, second);
		assert_eq!(first.len(), 32);

		hasher.update(b"partial");
		hasher.reset();
		hasher.update(b"hello");
		assert!(hasher.verify_reset(&first));
		hasher.update(b"hellx");
		assert!(!hasher.verify_reset(&first));
	}
}

// vim: ts=4
