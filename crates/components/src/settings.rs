//! Settings store consumed by the registry and lifecycle.
//!
//! Only boolean flags are read: `<id>-enabled` when a component is constructed
//! and `display-<kind>-hotkeys` when its affordance is rendered.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

/// Key/value settings lookup.
#[async_trait]
pub trait SettingsStore: Send + Sync {
	/// Returns the flag stored under `key`, or `None` if it was never set.
	async fn get(&self, key: &str) -> Option<bool>;

	/// Like [`Self::get`], reading a missing key as `false`.
	async fn flag(&self, key: &str) -> bool {
		self.get(key).await.unwrap_or(false)
	}
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
	values: RwLock<HashMap<String, bool>>,
}

impl MemorySettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, key: impl Into<String>, value: bool) {
		self.values.write().insert(key.into(), value);
	}

	/// Sets `key` and returns `self`, for building fixtures.
	#[must_use]
	pub fn with(self, key: impl Into<String>, value: bool) -> Self {
		self.set(key, value);
		self
	}
}

impl From<HashMap<String, bool>> for MemorySettings {
	fn from(values: HashMap<String, bool>) -> Self {
		Self { values: RwLock::new(values) }
	}
}

#[async_trait]
impl SettingsStore for MemorySettings {
	async fn get(&self, key: &str) -> Option<bool> {
		self.values.read().get(key).copied()
	}
}
