//! Configuration management

use crate::error::{ErrorContext, RealtoError, RealtoResult};
use crate::logging::LoggingConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtoConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the back-office API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.realto.local/v1".to_string(),
            timeout_seconds: 30,
            user_agent: "realto/0.1".to_string(),
        }
    }
}

/// Token store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the durable token store (survives restarts)
    pub data_dir: PathBuf,
    /// Directory of the session-scoped token store
    pub session_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("realto");

        Self {
            data_dir,
            session_dir: std::env::temp_dir().join("realto-session"),
        }
    }
}

impl Default for RealtoConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RealtoConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> RealtoResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RealtoError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: RealtoConfig = toml::from_str(&content).map_err(|e| RealtoError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> RealtoResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| RealtoError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| RealtoError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> RealtoResult<()> {
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(RealtoError::Config {
                message: format!("Invalid API base URL: {}", self.api.base_url),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.base_url to a full http(s) URL"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(RealtoError::Config {
                message: "API timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.timeout_seconds to a positive value"),
            });
        }

        if self.storage.data_dir == self.storage.session_dir {
            return Err(RealtoError::Config {
                message: "Durable and session token stores must not share a directory"
                    .to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Point storage.session_dir at a separate directory"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RealtoConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = RealtoConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shared_store_directory() {
        let mut config = RealtoConfig::default();
        config.storage.session_dir = config.storage.data_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = RealtoConfig::default();
        config.save_to_file(&path).unwrap();

        let loaded = RealtoConfig::from_file(&path).unwrap();
        assert_eq!(loaded.api.base_url, config.api.base_url);
        assert_eq!(loaded.api.timeout_seconds, config.api.timeout_seconds);
    }
}
