//! Database module
//!
//! This module provides the bookstore schema model, database sessions for
//! the supported backends, and the values passed between them.

pub mod connection;
pub mod mssql;
pub mod schema;
pub mod session;
pub mod sqlx_session;
pub mod value;

// Re-exports
pub use connection::{connect, DatabaseBackend};
pub use schema::{Column, ColumnType, ForeignKeyReference, Schema, Table};
pub use session::{DatabaseSession, ResultSet};
pub use sqlx_session::{DatabasePool, SqlxSession};
pub use value::CellValue;
