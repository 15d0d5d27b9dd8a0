//! Database session trait
//!
//! This module defines the trait-based abstraction over a live database
//! connection. The loader routines only talk to `DatabaseSession`, so the
//! same code drives SQL Server, SQLite and MySQL.

use crate::database::connection::DatabaseBackend;
use crate::database::value::CellValue;
use crate::error::Result;
use async_trait::async_trait;

/// Rows returned by a query, with every cell rendered as text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names; empty when the driver reports none for an empty result
    pub columns: Vec<String>,
    /// Row cells, `None` for SQL NULL
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the query returned no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row, handy for `SELECT COUNT(*)`
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

/// A live connection to one database
///
/// Implementations classify driver failures into
/// [`LoaderError::Integrity`](crate::error::LoaderError::Integrity) for
/// constraint violations and
/// [`LoaderError::Statement`](crate::error::LoaderError::Statement) for any
/// other statement the server rejected.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Backend this session is connected to
    fn backend(&self) -> DatabaseBackend;

    /// Name to use when addressing `table` in DDL
    fn qualified_name(&self, table: &str) -> String {
        table.to_string()
    }

    /// Execute one statement in its own transaction.
    ///
    /// Commits on success and rolls back on failure. Returns the number of
    /// affected rows as reported by the driver.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Execute a parameterized statement once per row, all in one transaction.
    ///
    /// Values are bound positionally in row order. The first failing row
    /// rolls back the whole batch.
    async fn execute_many(&mut self, sql: &str, rows: &[Vec<CellValue>]) -> Result<u64>;

    /// Run a query and collect its rows as text
    async fn query(&mut self, sql: &str) -> Result<ResultSet>;
}
