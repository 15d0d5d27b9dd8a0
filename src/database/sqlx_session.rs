//! sqlx-backed sessions (SQLite, MySQL)

use crate::database::connection::DatabaseBackend;
use crate::database::session::{DatabaseSession, ResultSet};
use crate::database::value::CellValue;
use crate::error::{LoaderError, Result};
use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Column, ColumnIndex, Database, Decode, Encode, Executor, Row, Transaction, Type};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Database connection pool wrapper
///
/// This enum holds the actual database pool for the connected backend.
/// Pools are capped at a single connection: the loader is sequential, and a
/// `sqlite::memory:` database only lives as long as its one connection.
#[derive(Clone)]
pub enum DatabasePool {
    /// SQLite pool
    Sqlite(SqlitePool),
    /// MySQL pool
    MySql(MySqlPool),
}

impl DatabasePool {
    /// Get the database backend for this pool
    pub fn backend(&self) -> DatabaseBackend {
        match self {
            DatabasePool::Sqlite(_) => DatabaseBackend::SQLite,
            DatabasePool::MySql(_) => DatabaseBackend::MySQL,
        }
    }

    /// Create a new database pool from connection URL
    pub async fn from_url(url: &str) -> Result<Self> {
        match DatabaseBackend::from_url(url)? {
            DatabaseBackend::SQLite => {
                let options = if url.to_lowercase().starts_with("sqlite:") {
                    SqliteConnectOptions::from_str(url)?
                } else {
                    SqliteConnectOptions::new().filename(url)
                };

                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>)
                    .connect_with(options.create_if_missing(true))
                    .await?;
                Ok(DatabasePool::Sqlite(pool))
            }
            DatabaseBackend::MySQL => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(1)
                    .connect(url)
                    .await?;
                Ok(DatabasePool::MySql(pool))
            }
            DatabaseBackend::MSSQL => Err(LoaderError::UnsupportedDatabaseType(
                "SQL Server is configured through SERVER_IP and friends, not DATABASE_URL"
                    .to_string(),
            )),
        }
    }

    /// Test the connection
    pub async fn test_connection(&self) -> Result<()> {
        match self {
            DatabasePool::Sqlite(pool) => {
                sqlx::query("SELECT 1").fetch_one(pool).await?;
            }
            DatabasePool::MySql(pool) => {
                sqlx::query("SELECT 1").fetch_one(pool).await?;
            }
        }
        Ok(())
    }
}

/// Session over a sqlx pool
pub struct SqlxSession {
    pool: DatabasePool,
}

impl SqlxSession {
    /// Connect to `url` and verify the connection
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = DatabasePool::from_url(url).await?;
        pool.test_connection().await?;
        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

/// Map a sqlx error onto the loader's integrity/statement split
pub(crate) fn classify(err: sqlx::Error) -> LoaderError {
    if let sqlx::Error::Database(db_err) = &err {
        let message = db_err.message().to_string();
        return match db_err.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => LoaderError::Integrity(message),
            _ => LoaderError::Statement(message),
        };
    }
    LoaderError::Database(err)
}

/// Bind one row of cells positionally
fn bind_row<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    row: &'q [CellValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    &'q str: Encode<'q, DB> + Type<DB>,
    Option<&'q str>: Encode<'q, DB> + Type<DB>,
{
    for cell in row {
        query = match cell {
            CellValue::Null => query.bind(None::<&'q str>),
            CellValue::Integer(v) => query.bind(*v),
            CellValue::Float(v) => query.bind(*v),
            CellValue::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

/// Collect rows as text.
///
/// Decoding is unchecked: SQLite coerces any stored value to text, and MySQL
/// rows fetched without arguments arrive over the text protocol.
fn to_result_set<R>(rows: &[R]) -> Result<ResultSet>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Option<String>: Decode<'r, R::Database>,
{
    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            cells.push(row.try_get_unchecked::<Option<String>, _>(idx)?);
        }
        out.push(cells);
    }

    Ok(ResultSet { columns, rows: out })
}

async fn rollback<DB: Database>(tx: Transaction<'_, DB>) {
    if let Err(e) = tx.rollback().await {
        warn!("Rollback failed: {}", e);
    }
}

#[async_trait]
impl DatabaseSession for SqlxSession {
    fn backend(&self) -> DatabaseBackend {
        self.pool.backend()
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(classify)?;
                match sqlx::query(sql).execute(&mut *tx).await {
                    Ok(done) => {
                        tx.commit().await.map_err(classify)?;
                        Ok(done.rows_affected())
                    }
                    Err(e) => {
                        rollback(tx).await;
                        Err(classify(e))
                    }
                }
            }
            DatabasePool::MySql(pool) => {
                let mut tx = pool.begin().await.map_err(classify)?;
                match sqlx::query(sql).execute(&mut *tx).await {
                    Ok(done) => {
                        tx.commit().await.map_err(classify)?;
                        Ok(done.rows_affected())
                    }
                    Err(e) => {
                        rollback(tx).await;
                        Err(classify(e))
                    }
                }
            }
        }
    }

    async fn execute_many(&mut self, sql: &str, rows: &[Vec<CellValue>]) -> Result<u64> {
        let mut affected = 0;

        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(classify)?;
                for row in rows {
                    match bind_row(sqlx::query(sql), row).execute(&mut *tx).await {
                        Ok(done) => affected += done.rows_affected(),
                        Err(e) => {
                            rollback(tx).await;
                            return Err(classify(e));
                        }
                    }
                }
                tx.commit().await.map_err(classify)?;
            }
            DatabasePool::MySql(pool) => {
                let mut tx = pool.begin().await.map_err(classify)?;
                for row in rows {
                    match bind_row(sqlx::query(sql), row).execute(&mut *tx).await {
                        Ok(done) => affected += done.rows_affected(),
                        Err(e) => {
                            rollback(tx).await;
                            return Err(classify(e));
                        }
                    }
                }
                tx.commit().await.map_err(classify)?;
            }
        }

        Ok(affected)
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let rows = pool.fetch_all(sql).await.map_err(classify)?;
                to_result_set(&rows)
            }
            DatabasePool::MySql(pool) => {
                let rows = pool.fetch_all(sql).await.map_err(classify)?;
                to_result_set(&rows)
            }
        }
    }
}
