//! Database connection abstraction
//!
//! This module provides the database backend enum and the entry point that
//! opens a [`DatabaseSession`] for the configured backend.

use crate::config::ConnectionSettings;
use crate::database::mssql::MssqlSession;
use crate::database::session::DatabaseSession;
use crate::database::sqlx_session::SqlxSession;
use crate::error::{LoaderError, Result};

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// MySQL/MariaDB
    MySQL,
    /// SQLite
    SQLite,
    /// Microsoft SQL Server
    MSSQL,
}

impl DatabaseBackend {
    /// Parse database URL to determine backend
    pub fn from_url(url: &str) -> Result<Self> {
        let url_lower = url.to_lowercase();

        if url_lower.starts_with("postgres://") || url_lower.starts_with("postgresql://") {
            Err(LoaderError::UnsupportedDatabaseType("PostgreSQL".to_string()))
        } else if url_lower.starts_with("mysql://") || url_lower.starts_with("mariadb://") {
            Ok(DatabaseBackend::MySQL)
        } else if url_lower.starts_with("sqlite:")
            || url_lower.ends_with(".db")
            || url_lower.ends_with(".sqlite")
            || url_lower.ends_with(".sqlite3")
        {
            Ok(DatabaseBackend::SQLite)
        } else if url_lower.starts_with("mssql://") || url_lower.starts_with("sqlserver://") {
            Ok(DatabaseBackend::MSSQL)
        } else {
            Err(LoaderError::InvalidDatabaseUrl(format!(
                "Unable to determine database type from URL: {}",
                url
            )))
        }
    }

    /// Port used when none is configured
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseBackend::MySQL => 3306,
            DatabaseBackend::SQLite => 0,
            DatabaseBackend::MSSQL => 1433,
        }
    }

    /// Human-readable backend name
    pub fn name(&self) -> &'static str {
        match self {
            DatabaseBackend::MySQL => "MySQL",
            DatabaseBackend::SQLite => "SQLite",
            DatabaseBackend::MSSQL => "Microsoft SQL Server",
        }
    }

    /// Schema that unqualified tables are created in, where names can be
    /// qualified with one
    pub fn default_schema(&self) -> Option<&'static str> {
        match self {
            DatabaseBackend::MSSQL => Some("dbo"),
            DatabaseBackend::MySQL | DatabaseBackend::SQLite => None,
        }
    }

    /// Bind placeholder for the 1-based parameter `position`
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            DatabaseBackend::MSSQL => format!("@P{}", position),
            DatabaseBackend::MySQL | DatabaseBackend::SQLite => "?".to_string(),
        }
    }
}

/// Open a session for the configured backend
///
/// A `DATABASE_URL` goes through sqlx; otherwise the SQL Server settings
/// are used with tiberius.
pub async fn connect(settings: &ConnectionSettings) -> Result<Box<dyn DatabaseSession>> {
    match settings {
        ConnectionSettings::Url(url) => {
            let session = SqlxSession::connect(url).await?;
            Ok(Box::new(session))
        }
        ConnectionSettings::SqlServer(mssql) => {
            let session = MssqlSession::connect(mssql).await?;
            Ok(Box::new(session))
        }
    }
}
