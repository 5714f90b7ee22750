//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! primary_key = "id"
//!
//! [script]
//! enabled = true
//! max_depth = 1024
//! ```
//!
//! Every field is optional; unknown fields are rejected.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {file}: {error}")]
    Io {
        file: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid TOML syntax: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Primary key field of tables created by [`crate::MemoryStore`]
    pub primary_key: String,

    pub script: ScriptConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptConfig {
    /// When false, `js` terms fail instead of running
    pub enabled: bool,

    /// Deepest nesting accepted in a script result
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            primary_key: "id".to_string(),
            script: ScriptConfig::default(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            enabled: true,
            max_depth: 1024,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            file: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.primary_key.is_empty() {
            return Err(ConfigError::Validation(
                "primary_key must not be empty".to_string(),
            ));
        }
        if self.script.max_depth == 0 {
            return Err(ConfigError::Validation(
                "script.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_toml_str(
            r#"
            primary_key = "key"

            [script]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.primary_key, "key");
        assert!(!config.script.enabled);
        assert_eq!(config.script.max_depth, 1024);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = EngineConfig::from_toml_str("timeout = 3").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_validation() {
        let err = EngineConfig::from_toml_str("[script]\nmax_depth = 0").unwrap_err();
        assert!(err.to_string().contains("max_depth"));
        let err = EngineConfig::from_toml_str("primary_key = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load_from_file(Path::new("/nonexistent/reql.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
