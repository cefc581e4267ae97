//! Dispatch Configuration
//!
//! Tunables that change how membership is checked and what gets cached.
//! A configuration is fixed when a [`TypeContext`](crate::TypeContext) is
//! created.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for type checking and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// How `Seq[T]` membership inspects list elements.
    pub container_check: ContainerCheck,

    /// Emit a warning when a structurally identical signature replaces
    /// an existing method.
    pub warn_on_redefinition: bool,

    /// Store `NotApplicable` and `Ambiguous` outcomes in the resolution
    /// cache as well as successful ones.
    pub cache_failures: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            container_check: ContainerCheck::First,
            warn_on_redefinition: true,
            cache_failures: true,
        }
    }
}

/// Element inspection policy for homogeneous containers.
///
/// `First` looks at a single element, so a mixed list whose first element
/// matches is accepted. This keeps membership constant-cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerCheck {
    /// Check only the first element.
    #[default]
    First,
    /// Check every element.
    All,
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl DispatchConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.container_check, ContainerCheck::First);
        assert!(config.warn_on_redefinition);
        assert!(config.cache_failures);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DispatchConfig::from_toml_str("container_check = \"all\"\n").unwrap();
        assert_eq!(config.container_check, ContainerCheck::All);
        assert!(config.warn_on_redefinition);
    }

    #[test]
    fn test_empty_toml() {
        let config = DispatchConfig::from_toml_str("").unwrap();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = DispatchConfig::from_toml_str("container_check = \"some\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DispatchConfig::from_path("/nonexistent/dispatch.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
