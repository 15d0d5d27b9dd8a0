//! Error types for bookstore-loader
//!
//! This module defines the error types used throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bookstore-loader
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Main error type for bookstore-loader
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Errors raised by the sqlx driver (SQLite, MySQL)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors raised by the tiberius driver (SQL Server)
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// CSV parsing errors, tagged with the offending file
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid database URL
    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    /// Unsupported database type
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// A table or column name that cannot be used as a bare SQL identifier
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Constraint violation reported by the database (duplicate key, foreign key, ...)
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Menu input that matches no option
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Any other statement the database server rejected
    #[error("Statement rejected: {0}")]
    Statement(String),
}

impl LoaderError {
    /// Whether the database rejected the statement itself, as opposed to
    /// the connection or driver failing.
    pub fn is_rejected_statement(&self) -> bool {
        matches!(self, LoaderError::Integrity(_) | LoaderError::Statement(_))
    }

    /// Helper to build a missing-setting configuration error
    pub fn missing_setting(variable: &str) -> Self {
        LoaderError::Config(format!("{} is not set", variable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_statement_classification() {
        assert!(LoaderError::Integrity("dup".into()).is_rejected_statement());
        assert!(LoaderError::Statement("no such table".into()).is_rejected_statement());
        assert!(!LoaderError::Config("x".into()).is_rejected_statement());
    }

    #[test]
    fn test_missing_setting_message() {
        let err = LoaderError::missing_setting("SERVER_IP");
        assert_eq!(err.to_string(), "Configuration error: SERVER_IP is not set");
    }
}
