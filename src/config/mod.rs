//! Configuration module
//!
//! This module resolves connection settings from the environment (a `.env`
//! file is honoured) and the optional configuration file, and holds the
//! application state the menu operates on.

pub mod storage;

use crate::database::connection::DatabaseBackend;
use crate::database::schema::Schema;
use crate::database::session::DatabaseSession;
use crate::error::{LoaderError, Result};
use crate::loader::{self, CsvTables};
use std::path::PathBuf;
use storage::FileConfig;

/// Default directory holding the CSV files
pub const DEFAULT_CSV_DIR: &str = "tables";

/// SQL Server connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct MssqlSettings {
    pub host: String,
    pub port: u16,
    pub instance: Option<String>,
    pub database: String,
    pub username: String,
    pub password: String,
    pub trust_server_certificate: bool,
}

/// Where to connect
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSettings {
    /// A sqlx URL (`sqlite:...`, `mysql://...`)
    Url(String),
    /// SQL Server via tiberius
    SqlServer(MssqlSettings),
}

impl ConnectionSettings {
    /// Short description for the startup banner; never includes credentials
    pub fn describe(&self) -> String {
        match self {
            ConnectionSettings::Url(url) => match url.rsplit_once('@') {
                Some((_, host)) => format!("sqlx ({})", host),
                None => format!("sqlx ({})", url),
            },
            ConnectionSettings::SqlServer(mssql) => format!(
                "SQL Server {}:{}/{}",
                mssql.host, mssql.port, mssql.database
            ),
        }
    }
}

/// Resolved application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding the CSV files
    pub csv_dir: PathBuf,
    /// Database to connect to
    pub connection: ConnectionSettings,
}

impl Settings {
    /// Load settings from `.env`, the process environment and the config file
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let file = FileConfig::load()?;
        Self::resolve(|key| std::env::var(key).ok(), &file)
    }

    /// Resolve settings from an environment lookup and a parsed config file
    pub fn resolve<F>(env: F, file: &FileConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let csv_dir = var("CSV_DIR")
            .map(PathBuf::from)
            .or_else(|| file.csv_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_DIR));

        if let Some(url) = var("DATABASE_URL").or_else(|| file.database_url.clone()) {
            return Ok(Self {
                csv_dir,
                connection: ConnectionSettings::Url(url),
            });
        }

        let required = |key: &str, fallback: &Option<String>| {
            var(key)
                .or_else(|| fallback.clone())
                .ok_or_else(|| LoaderError::missing_setting(key))
        };

        let port = match var("SERVER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                LoaderError::Config(format!("SERVER_PORT must be a port number, got {:?}", raw))
            })?,
            None => file
                .server_port
                .unwrap_or_else(|| DatabaseBackend::MSSQL.default_port()),
        };

        let trust_server_certificate = match var("TRUST_SERVER_CERTIFICATE") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                LoaderError::Config(format!(
                    "TRUST_SERVER_CERTIFICATE must be true or false, got {:?}",
                    raw
                ))
            })?,
            None => file.trust_server_certificate.unwrap_or(true),
        };

        let mssql = MssqlSettings {
            host: required("SERVER_IP", &file.server_ip)?,
            port,
            instance: var("SERVER_INSTANCE").or_else(|| file.server_instance.clone()),
            database: required("DATABASE_NAME", &file.database_name)?,
            username: required("DATABASE_USERNAME", &file.database_username)?,
            password: required("DATABASE_PASSWORD", &file.database_password)?,
            trust_server_certificate,
        };

        Ok(Self {
            csv_dir,
            connection: ConnectionSettings::SqlServer(mssql),
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Application state
pub struct AppState {
    /// Live database session
    pub session: Box<dyn DatabaseSession>,
    /// Bookstore schema
    pub schema: Schema,
    /// Directory the CSV files are (re)loaded from
    pub csv_dir: PathBuf,
}

impl AppState {
    /// Create a new application state
    pub fn new(session: Box<dyn DatabaseSession>, csv_dir: PathBuf) -> Self {
        Self {
            session,
            schema: Schema::bookstore(),
            csv_dir,
        }
    }

    /// Load/refresh data from the CSV directory
    pub fn reload_tables(&self) -> Result<CsvTables> {
        loader::load_directory(&self.csv_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)], file: &FileConfig) -> Result<Settings> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(|key| env.get(key).cloned(), file)
    }

    const SQL_SERVER_VARS: [(&str, &str); 4] = [
        ("SERVER_IP", "10.0.0.5"),
        ("DATABASE_NAME", "bookstore"),
        ("DATABASE_USERNAME", "sa"),
        ("DATABASE_PASSWORD", "secret"),
    ];

    #[test]
    fn test_sql_server_from_env() {
        let settings = resolve(&SQL_SERVER_VARS, &FileConfig::default()).unwrap();
        assert_eq!(settings.csv_dir, PathBuf::from("tables"));

        let ConnectionSettings::SqlServer(mssql) = settings.connection else {
            panic!("expected SQL Server settings");
        };
        assert_eq!(mssql.host, "10.0.0.5");
        assert_eq!(mssql.port, 1433);
        assert_eq!(mssql.database, "bookstore");
        assert!(mssql.trust_server_certificate);
        assert!(mssql.instance.is_none());
    }

    #[test]
    fn test_database_url_overrides_sql_server() {
        let mut vars = SQL_SERVER_VARS.to_vec();
        vars.push(("DATABASE_URL", "sqlite://bookstore.db"));
        vars.push(("CSV_DIR", "fixtures"));

        let settings = resolve(&vars, &FileConfig::default()).unwrap();
        assert_eq!(
            settings.connection,
            ConnectionSettings::Url("sqlite://bookstore.db".to_string())
        );
        assert_eq!(settings.csv_dir, PathBuf::from("fixtures"));
    }

    #[test]
    fn test_env_wins_over_file() {
        let file = FileConfig {
            server_ip: Some("file-host".to_string()),
            server_port: Some(1500),
            database_name: Some("filedb".to_string()),
            database_username: Some("file-user".to_string()),
            database_password: Some("file-pass".to_string()),
            trust_server_certificate: Some(false),
            ..FileConfig::default()
        };

        let settings = resolve(&[("SERVER_IP", "env-host")], &file).unwrap();
        let ConnectionSettings::SqlServer(mssql) = settings.connection else {
            panic!("expected SQL Server settings");
        };
        assert_eq!(mssql.host, "env-host");
        assert_eq!(mssql.port, 1500);
        assert_eq!(mssql.database, "filedb");
        assert!(!mssql.trust_server_certificate);
    }

    #[test]
    fn test_missing_setting_is_named() {
        let err = resolve(&SQL_SERVER_VARS[..3], &FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("DATABASE_PASSWORD"));
    }

    #[test]
    fn test_bad_port_and_flag() {
        let mut vars = SQL_SERVER_VARS.to_vec();
        vars.push(("SERVER_PORT", "abc"));
        assert!(matches!(
            resolve(&vars, &FileConfig::default()),
            Err(LoaderError::Config(_))
        ));

        let mut vars = SQL_SERVER_VARS.to_vec();
        vars.push(("TRUST_SERVER_CERTIFICATE", "maybe"));
        assert!(matches!(
            resolve(&vars, &FileConfig::default()),
            Err(LoaderError::Config(_))
        ));
    }

    #[test]
    fn test_describe_hides_credentials() {
        let conn = ConnectionSettings::Url("mysql://user:pw@db:3306/shop".to_string());
        assert_eq!(conn.describe(), "sqlx (db:3306/shop)");

        let conn = ConnectionSettings::Url("mysql://user:p@ss@db:3306/shop".to_string());
        assert_eq!(conn.describe(), "sqlx (db:3306/shop)");

        let conn = ConnectionSettings::Url("sqlite::memory:".to_string());
        assert_eq!(conn.describe(), "sqlx (sqlite::memory:)");
    }
}
