//! CSV-to-table insertion

use crate::database::connection::DatabaseBackend;
use crate::database::session::DatabaseSession;
use crate::error::{LoaderError, Result};
use crate::loader::csv_table::CsvTable;
use std::fmt;
use tracing::{debug, info, warn};

/// What happened to one table's batch
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// Batch committed; number of rows inserted
    Inserted(u64),
    /// The CSV had a header but no rows
    Empty,
    /// Batch rolled back after an integrity violation
    Skipped(String),
}

impl fmt::Display for InsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertOutcome::Inserted(n) => write!(f, "inserted {} rows", n),
            InsertOutcome::Empty => write!(f, "no rows"),
            InsertOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

/// Build the parameterized INSERT for `table`, columns in header order
pub fn insert_statement(table: &CsvTable, backend: DatabaseBackend) -> String {
    let placeholders: Vec<String> = (1..=table.columns.len())
        .map(|position| backend.placeholder(position))
        .collect();

    format!(
        "insert into {} ({}) VALUES ({})",
        table.name,
        table.columns.join(","),
        placeholders.join(",")
    )
}

/// Insert a table's rows into the database table with the same name
///
/// An integrity violation rolls back this batch only and is reported as
/// [`InsertOutcome::Skipped`]; any other failure is returned as an error.
pub async fn insert_table(
    session: &mut dyn DatabaseSession,
    table: &CsvTable,
) -> Result<InsertOutcome> {
    info!("Inserting data into {} table", table.name);

    if table.is_empty() {
        info!("{} has no rows, nothing to insert", table.name);
        return Ok(InsertOutcome::Empty);
    }

    let query = insert_statement(table, session.backend());
    info!("{}", query);
    debug!(table = %table.name, rows = ?table.rows, "row data");

    match session.execute_many(&query, &table.rows).await {
        Ok(count) => {
            info!(table = %table.name, rows = count, "committed");
            Ok(InsertOutcome::Inserted(count))
        }
        Err(LoaderError::Integrity(message)) => {
            warn!("Record already exists");
            warn!("{}", message);
            Ok(InsertOutcome::Skipped(message))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::session::ResultSet;
    use crate::database::value::CellValue;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingSession {
        statements: Vec<String>,
        conflict: bool,
    }

    #[async_trait]
    impl DatabaseSession for RecordingSession {
        fn backend(&self) -> DatabaseBackend {
            DatabaseBackend::SQLite
        }

        async fn execute(&mut self, sql: &str) -> Result<u64> {
            self.statements.push(sql.to_string());
            Ok(0)
        }

        async fn execute_many(&mut self, sql: &str, rows: &[Vec<CellValue>]) -> Result<u64> {
            self.statements.push(sql.to_string());
            if self.conflict {
                return Err(LoaderError::Integrity("UNIQUE constraint failed".to_string()));
            }
            Ok(rows.len() as u64)
        }

        async fn query(&mut self, sql: &str) -> Result<ResultSet> {
            self.statements.push(sql.to_string());
            Ok(ResultSet::default())
        }
    }

    fn orders() -> CsvTable {
        let mut table = CsvTable::new(
            "orders",
            vec!["CID".to_string(), "OrderID".to_string(), "date_time".to_string()],
        );
        table.rows.push(vec![
            CellValue::from("C1"),
            CellValue::from("O1"),
            CellValue::from("2023-01-05 10:00:00"),
        ]);
        table
    }

    #[test]
    fn test_insert_statement_follows_header_order() {
        assert_eq!(
            insert_statement(&orders(), DatabaseBackend::SQLite),
            "insert into orders (CID,OrderID,date_time) VALUES (?,?,?)"
        );
        assert_eq!(
            insert_statement(&orders(), DatabaseBackend::MSSQL),
            "insert into orders (CID,OrderID,date_time) VALUES (@P1,@P2,@P3)"
        );
    }

    #[tokio::test]
    async fn test_header_only_table_executes_nothing() {
        let mut session = RecordingSession::default();
        let table = CsvTable::new("orders", vec!["CID".to_string(), "OrderID".to_string()]);

        let outcome = insert_table(&mut session, &table).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Empty);
        assert!(session.statements.is_empty());
    }

    #[tokio::test]
    async fn test_insert_table_outcomes() {
        let mut session = RecordingSession::default();
        let outcome = insert_table(&mut session, &orders()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(1));
        assert_eq!(
            session.statements,
            vec!["insert into orders (CID,OrderID,date_time) VALUES (?,?,?)"]
        );

        let mut session = RecordingSession {
            conflict: true,
            ..RecordingSession::default()
        };
        let outcome = insert_table(&mut session, &orders()).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Skipped(ref m) if m.contains("UNIQUE")));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(InsertOutcome::Inserted(3).to_string(), "inserted 3 rows");
        assert_eq!(InsertOutcome::Empty.to_string(), "no rows");
    }
}
