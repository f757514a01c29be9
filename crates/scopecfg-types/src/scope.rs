//! Scope keys
//!
//! A scope partitions configuration into three levels. Every non-Default key
//! has exactly one parent: Store falls back to its Website, Website falls back
//! to Default, and Default has no parent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope level, ordered from the most general to the most specific
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
	#[serde(rename = "default")]
	Default,
	#[serde(rename = "website")]
	Website,
	#[serde(rename = "store")]
	Store,
}

impl Level {
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Default => "Default",
			Level::Website => "Website",
			Level::Store => "Store",
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// ScopeKey //
//**********//
/// Identifies one tenant: a level plus a numeric ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
	pub level: Level,
	pub id: u32,
}

impl ScopeKey {
	/// The root scope. Its ID is always 0.
	pub const DEFAULT: ScopeKey = ScopeKey { level: Level::Default, id: 0 };

	pub const fn new(level: Level, id: u32) -> Self {
		match level {
			Level::Default => Self::DEFAULT,
			_ => Self { level, id },
		}
	}

	pub const fn website(id: u32) -> Self {
		Self { level: Level::Website, id }
	}

	pub const fn store(id: u32) -> Self {
		Self { level: Level::Store, id }
	}

	pub fn is_default(&self) -> bool {
		self.level == Level::Default
	}
}

impl Default for ScopeKey {
	fn default() -> Self {
		Self::DEFAULT
	}
}

impl fmt::Display for ScopeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({})", self.level, self.id)
	}
}

// Scope //
//*******//
/// Request-bound scope: the current key and its natural parent
///
/// The parent is fixed at construction. `Scope::store` takes the owning
/// website so the Store -> Website link never has to be looked up later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
	pub current: ScopeKey,
	pub parent: Option<ScopeKey>,
}

impl Scope {
	pub const fn store(store_id: u32, website_id: u32) -> Self {
		Self { current: ScopeKey::store(store_id), parent: Some(ScopeKey::website(website_id)) }
	}

	pub const fn website(website_id: u32) -> Self {
		Self { current: ScopeKey::website(website_id), parent: Some(ScopeKey::DEFAULT) }
	}

	pub const fn default_scope() -> Self {
		Self { current: ScopeKey::DEFAULT, parent: None }
	}

	/// The lookup chain from `current` up to Default, most specific first
	pub fn chain(&self) -> Vec<ScopeKey> {
		let mut keys = Vec::with_capacity(3);
		keys.push(self.current);
		if let Some(parent) = self.parent {
			keys.push(parent);
			if !parent.is_default() {
				keys.push(ScopeKey::DEFAULT);
			}
		}
		keys
	}
}

impl Default for Scope {
	fn default() -> Self {
		Self::default_scope()
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.parent {
			Some(parent) => write!(f, "{} -> {}", self.current, parent),
			None => write!(f, "{}", self.current),
		}
	}
}


// vim: ts=4
