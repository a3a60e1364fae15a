//! TOML runtime configuration.
//!
//! ```toml
//! [lifecycle]
//! dependency_timeout_ms = 5000
//! reject_cycles = false
//!
//! [settings]
//! "Widget.clock-enabled" = true
//! "display-Widget-hotkeys" = true
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::MemorySettings;

/// Startup policy for the lifecycle manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
	/// Upper bound on waiting for each dependency. Unset means wait forever.
	pub dependency_timeout_ms: Option<u64>,
	/// Fail startup when the required set contains a dependency cycle.
	pub reject_cycles: bool,
}

impl LifecycleConfig {
	pub fn dependency_timeout(&self) -> Option<Duration> {
		self.dependency_timeout_ms.map(Duration::from_millis)
	}

	#[must_use]
	pub fn with_dependency_timeout(mut self, timeout: Duration) -> Self {
		self.dependency_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
		self
	}

	#[must_use]
	pub fn reject_cycles(mut self, reject: bool) -> Self {
		self.reject_cycles = reject;
		self
	}
}

/// Whole runtime configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
	pub lifecycle: LifecycleConfig,
	/// Flat boolean settings, keyed like `<id>-enabled`.
	pub settings: HashMap<String, bool>,
}

impl RuntimeConfig {
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&source)?;
		tracing::debug!(path = %path.display(), settings = config.settings.len(), "config.load");
		Ok(config)
	}

	/// Settings store seeded from the `[settings]` table.
	pub fn settings_store(&self) -> MemorySettings {
		MemorySettings::from(self.settings.clone())
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use crate::SettingsStore;

	const CONFIG: &str = r#"
		[lifecycle]
		dependency_timeout_ms = 250
		reject_cycles = true

		[settings]
		"Widget.clock-enabled" = true
		"display-Widget-hotkeys" = false
	"#;

	#[tokio::test]
	async fn parses_lifecycle_and_settings() {
		let config = RuntimeConfig::from_toml_str(CONFIG).unwrap();
		assert_eq!(config.lifecycle.dependency_timeout(), Some(Duration::from_millis(250)));
		assert!(config.lifecycle.reject_cycles);

		let settings = config.settings_store();
		assert_eq!(settings.get("Widget.clock-enabled").await, Some(true));
		assert_eq!(settings.get("display-Widget-hotkeys").await, Some(false));
	}

	#[test]
	fn empty_file_uses_defaults() {
		let config = RuntimeConfig::from_toml_str("").unwrap();
		assert_eq!(config, RuntimeConfig::default());
		assert_eq!(config.lifecycle.dependency_timeout(), None);
	}

	#[test]
	fn unknown_fields_are_rejected() {
		let err = RuntimeConfig::from_toml_str("[lifecycle]\ntimeout = 3\n").unwrap_err();
		assert!(matches!(err, ConfigError::Toml(_)));
	}

	#[test]
	fn load_reads_file_and_reports_missing_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(CONFIG.as_bytes()).unwrap();
		let config = RuntimeConfig::load(file.path()).unwrap();
		assert_eq!(config.settings.len(), 2);

		let missing = file.path().with_extension("missing");
		assert!(matches!(RuntimeConfig::load(&missing), Err(ConfigError::Io { path, .. }) if path == missing));
	}
}
