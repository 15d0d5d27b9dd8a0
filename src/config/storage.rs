//! Configuration Storage
//!
//! This module reads the optional configuration file. Every key mirrors an
//! environment variable in lower case; environment variables win.

use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Persistent configuration data
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// SQL Server host
    pub server_ip: Option<String>,
    /// SQL Server port
    pub server_port: Option<u16>,
    /// SQL Server named instance
    pub server_instance: Option<String>,
    /// Database name
    pub database_name: Option<String>,
    /// SQL login
    pub database_username: Option<String>,
    /// SQL password
    pub database_password: Option<String>,
    /// Accept self-signed TLS certificates
    pub trust_server_certificate: Option<bool>,
    /// sqlx connection URL (SQLite, MySQL)
    pub database_url: Option<String>,
    /// Directory holding the CSV files
    pub csv_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")))
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| LoaderError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration from disk, or defaults if there is no file
    pub fn load() -> Result<Self> {
        let config_file = match Self::config_file() {
            Some(path) if path.exists() => path,
            _ => return Ok(Self::default()),
        };

        let content = fs::read_to_string(&config_file)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            server_ip = "10.0.0.5"
            server_port = 1500
            csv_dir = "/data/tables"
            "#,
        )
        .unwrap();

        assert_eq!(config.server_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.server_port, Some(1500));
        assert_eq!(config.csv_dir, Some(PathBuf::from("/data/tables")));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = FileConfig::from_toml("server_port = \"not a number\"").unwrap_err();
        assert!(matches!(err, LoaderError::Config(_)));
    }
}
