//! Configuration loading for lineup services
//!
//! TOML file location follows `LINEUP_CONFIG` (env) → `./lineup.toml` priority.
//! Individual values may additionally be overridden per-key by environment
//! variables (see `lineup-ir::config` for the describer API key resolution).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lineup_ir=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the external Describer service
    pub describer_url: Option<String>,

    /// Base URL of the external Grouping Classifier service
    pub classifier_url: Option<String>,

    /// Base URL of the external Visual Comparator service
    pub comparator_url: Option<String>,

    /// API key for the Describer service (lowest-priority source; the
    /// database settings table and environment variable take precedence)
    pub describer_api_key: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            describer_url: None,
            classifier_url: None,
            comparator_url: None,
            describer_api_key: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Resolve the configuration file path
///
/// Priority: `LINEUP_CONFIG` environment variable → `./lineup.toml`.
pub fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("LINEUP_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("lineup.toml")
}

/// Load TOML configuration from the given path
///
/// A missing file is not an error: defaults are returned so a service can
/// start with environment/database configuration only.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No TOML config file, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write TOML configuration atomically (write to temp file, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lineup.toml");

        let config = load_toml_config(&path).unwrap();
        assert!(config.describer_url.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lineup.toml");

        let config = TomlConfig {
            describer_url: Some("http://localhost:9301".to_string()),
            classifier_url: Some("http://localhost:9302".to_string()),
            comparator_url: Some("http://localhost:9303".to_string()),
            describer_api_key: Some("test-key".to_string()),
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        };

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();

        assert_eq!(loaded.describer_url, config.describer_url);
        assert_eq!(loaded.describer_api_key, Some("test-key".to_string()));
        assert_eq!(loaded.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lineup.toml");
        std::fs::write(&path, "describer_url = \"http://localhost:9301\"\n").unwrap();

        let config = load_toml_config(&path).unwrap();
        assert_eq!(
            config.describer_url,
            Some("http://localhost:9301".to_string())
        );
        assert_eq!(config.logging.level, "info");
    }
}
