//! Backend boundary
//!
//! The backend store that persists configuration values is an external
//! collaborator. It is only ever read through a [`ScopedReader`], which is the
//! scope-aware accessor handed to an [`OptionFactory`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::option::ScopeOption;
use crate::prelude::*;

/// Raw value store, one value per (scope, path)
#[async_trait]
pub trait ConfigBackend: Send + Sync {
	async fn read(&self, key: ScopeKey, path: &str) -> ClResult<Option<serde_json::Value>>;
}

/// Produces the options for one scope from backend values
///
/// Must be idempotent and free of side effects; it is invoked again after a
/// failed load.
#[async_trait]
pub trait OptionFactory<C: ScopedConfig>: Send + Sync {
	async fn options(&self, reader: &ScopedReader) -> ClResult<Vec<ScopeOption<C>>>;
}

/// Reads backend values for a request scope, falling back Store -> Website -> Default
#[derive(Clone)]
pub struct ScopedReader {
	backend: Arc<dyn ConfigBackend>,
	scope: Scope,
}

impl ScopedReader {
	pub fn new(backend: Arc<dyn ConfigBackend>, scope: Scope) -> Self {
		Self { backend, scope }
	}

	pub fn scope(&self) -> Scope {
		self.scope
	}

	/// Value for `path` plus the scope that supplied it
	pub async fn get(&self, path: &str) -> ClResult<Option<(ScopeKey, serde_json::Value)>> {
		for key in self.scope.chain() {
			if let Some(value) = self.backend.read(key, path).await? {
				debug!("Backend value {} found at {}", path, key);
				return Ok(Some((key, value)));
			}
		}
		Ok(None)
	}

	async fn get_value(&self, path: &str) -> ClResult<serde_json::Value> {
		self.get(path)
			.await?
			.map(|(_, value)| value)
			.ok_or_else(|| Error::NotFound(format!("{} for {}", path, self.scope.current)))
	}

	pub async fn get_string(&self, path: &str) -> ClResult<String> {
		match self.get_value(path).await? {
			serde_json::Value::String(s) => Ok(s),
			v => Err(type_mismatch(path, "string", &v)),
		}
	}

	pub async fn get_bool(&self, path: &str) -> ClResult<bool> {
		match self.get_value(path).await? {
			serde_json::Value::Bool(b) => Ok(b),
			v => Err(type_mismatch(path, "bool", &v)),
		}
	}

	pub async fn get_int(&self, path: &str) -> ClResult<i64> {
		let v = self.get_value(path).await?;
		v.as_i64().ok_or_else(|| type_mismatch(path, "int", &v))
	}

	pub async fn get_strings(&self, path: &str) -> ClResult<Vec<String>> {
		let v = self.get_value(path).await?;
		let serde_json::Value::Array(items) = &v else {
			return Err(type_mismatch(path, "array of strings", &v));
		};
		items
			.iter()
			.map(|item| {
				item.as_str()
					.map(str::to_string)
					.ok_or_else(|| type_mismatch(&format!("{} item", path), "string", item))
			})
			.collect()
	}

	/// Optional getters return `None` when no scope in the chain has a value,
	/// but still fail on a value of the wrong type
	pub async fn get_string_opt(&self, path: &str) -> ClResult<Option<String>> {
		none_if_missing(self.get_string(path).await)
	}

	pub async fn get_bool_opt(&self, path: &str) -> ClResult<Option<bool>> {
		none_if_missing(self.get_bool(path).await)
	}

	pub async fn get_int_opt(&self, path: &str) -> ClResult<Option<i64>> {
		none_if_missing(self.get_int(path).await)
	}

	pub async fn get_strings_opt(&self, path: &str) -> ClResult<Option<Vec<String>>> {
		none_if_missing(self.get_strings(path).await)
	}
}

fn none_if_missing<T>(res: ClResult<T>) -> ClResult<Option<T>> {
	match res {
		Ok(v) => Ok(Some(v)),
		Err(Error::NotFound(_)) => Ok(None),
		Err(e) => Err(e),
	}
}

/// A backend value of the wrong shape is malformed configuration
fn type_mismatch(path: &str, expected: &str, got: &serde_json::Value) -> Error {
	let got = match got {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "bool",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	};
	Error::Fatal(format!("{} must be {}, got {}", path, expected, got))
}


// vim: ts=4
