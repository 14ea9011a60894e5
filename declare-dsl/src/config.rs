//! Front-end resource limits.
//!
//! The limits bound how much work a single file can cause. They are usually
//! embedded in a larger tool configuration and decoded from TOML:
//!
//! ```toml
//! max_source_bytes = 1048576
//! max_line_length = 4096
//! max_tokens = 200000
//! max_items_per_section = 1000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Limits applied by the tokenizer and the grammar parsers.
///
/// Missing TOML keys fall back to [`FrontendConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendConfig {
    /// Maximum source size in bytes (default: 4MB).
    pub max_source_bytes: usize,
    /// Maximum line length in bytes (default: 64KB).
    pub max_line_length: usize,
    /// Maximum number of tokens, `Eof` included (default: 1M).
    pub max_tokens: usize,
    /// Maximum number of items in one section (default: 10k).
    pub max_items_per_section: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: 4 * 1024 * 1024,
            max_line_length: 64 * 1024,
            max_tokens: 1_000_000,
            max_items_per_section: 10_000,
        }
    }
}

impl FrontendConfig {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self {
            max_source_bytes: usize::MAX,
            max_line_length: usize::MAX,
            max_tokens: usize::MAX,
            max_items_per_section: usize::MAX,
        }
    }

    /// Decode and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: FrontendConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject limits that would refuse every input.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("max_source_bytes", self.max_source_bytes),
            ("max_line_length", self.max_line_length),
            ("max_tokens", self.max_tokens),
            ("max_items_per_section", self.max_items_per_section),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = FrontendConfig::default();
        assert_eq!(config.max_source_bytes, 4 * 1024 * 1024);
        assert_eq!(config.max_line_length, 64 * 1024);
        assert_eq!(config.max_tokens, 1_000_000);
        assert_eq!(config.max_items_per_section, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unlimited() {
        let config = FrontendConfig::unlimited();
        assert_eq!(config.max_tokens, usize::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = FrontendConfig::from_toml_str("max_tokens = 500\n").unwrap();
        assert_eq!(config.max_tokens, 500);
        assert_eq!(
            config.max_items_per_section,
            FrontendConfig::default().max_items_per_section
        );
    }

    #[test]
    fn test_from_toml_rejects_zero() {
        let err = FrontendConfig::from_toml_str("max_line_length = 0").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: "max_line_length".to_string(),
                reason: "must be greater than zero".to_string(),
            }
        );
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            FrontendConfig::from_toml_str("max_tokens = \"lots\""),
            Err(ConfigError::Decode(_))
        ));
        assert!(matches!(
            FrontendConfig::from_toml_str("max_widgets = 3"),
            Err(ConfigError::Decode(_))
        ));
    }
}
