//! Dispatcher configuration.
//!
//! Loaded from TOML; every key is optional and falls back to the built-in
//! default:
//!
//! ```toml
//! tag_capacity = 65535      # highest allocatable type tag id
//! auto_freeze = false       # freeze the kernel registry on the first call
//! check_returns = true      # verify kernel outputs against declared returns
//! suggest_operators = true  # add "did you mean" hints to unknown-operator errors
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::tag::TypeTagRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
	/// Highest type tag id the registry may allocate. Must be non-zero.
	pub tag_capacity: u16,
	/// Freeze the kernel registry when the first call is dispatched.
	pub auto_freeze: bool,
	/// Check kernel outputs against the schema's declared return kinds.
	pub check_returns: bool,
	/// Suggest the closest operator name on unknown-operator errors.
	pub suggest_operators: bool,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			tag_capacity: u16::MAX,
			auto_freeze: false,
			check_returns: true,
			suggest_operators: true,
		}
	}
}

impl DispatchConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.tag_capacity == 0 {
			return Err(ConfigError::Invalid("tag_capacity must be at least 1".into()));
		}
		Ok(())
	}

	/// Builds a tag registry sized by this config.
	pub fn tag_registry(&self) -> TypeTagRegistry {
		TypeTagRegistry::new(self.tag_capacity)
	}
}
