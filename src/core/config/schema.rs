//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! `<got root>/config.toml`, where the Got root is `$GOT_ROOT` or `~/.got`.
//!
//! # Validation
//!
//! Config values are validated after parsing so a bad file fails loudly at
//! startup instead of midway through a clone.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// User configuration.
///
/// # Example
///
/// ```toml
/// clone_root = "/work/src"
/// deps_file = "deps.got"
/// interactive = true
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GotConfig {
    /// Directory new clones go under (per host subdirectory)
    pub clone_root: Option<String>,

    /// Name of the dependency-declaration file at a clone's root
    pub deps_file: Option<String>,

    /// Default interactive mode
    pub interactive: Option<bool>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl GotConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(root) = &self.clone_root {
            if root.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "clone_root cannot be empty".to_string(),
                ));
            }
        }

        if let Some(deps) = &self.deps_file {
            if deps.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "deps_file cannot be empty".to_string(),
                ));
            }
            if deps.contains('/') || deps.contains('\\') {
                return Err(ConfigError::InvalidValue(format!(
                    "deps_file must be a file name, not a path: '{}'",
                    deps
                )));
            }
        }

        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }

        Ok(())
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider to use ("file" or "keychain")
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Valid secret providers.
    pub const VALID_PROVIDERS: &'static [&'static str] = &["file", "keychain"];

    /// Validate the secrets configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if !Self::VALID_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    Self::VALID_PROVIDERS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GotConfig::default();
        assert!(config.clone_root.is_none());
        assert!(config.deps_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deps_file_must_be_a_name() {
        let config = GotConfig {
            deps_file: Some("sub/deps.got".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_clone_root_rejected() {
        let config = GotConfig {
            clone_root: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_provider() {
        let config = GotConfig {
            secrets: Some(SecretsConfig {
                provider: Some("vault".to_string()),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vault"));
    }

    #[test]
    fn roundtrip() {
        let config = GotConfig {
            clone_root: Some("/work/src".to_string()),
            deps_file: Some("deps.got".to_string()),
            interactive: Some(false),
            secrets: Some(SecretsConfig {
                provider: Some("keychain".to_string()),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: GotConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<GotConfig, _> = toml::from_str("clone_root = \"/x\"\ntrunk = \"main\"\n");
        assert!(result.is_err());
    }
}
