//! Whole-schema operations
//!
//! Create, insert, drop, delete and print, each driven by the static schema
//! and the set of tables loaded from the CSV directory.

use crate::database::schema::Schema;
use crate::database::session::{DatabaseSession, ResultSet};
use crate::error::{LoaderError, Result};
use crate::loader::csv_table::CsvTables;
use crate::loader::insert::{insert_table, InsertOutcome};
use comfy_table::Table as TextTable;
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

/// Per-table results of an insert-all run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Outcome for every loaded table, in insertion order
    pub outcomes: Vec<(String, InsertOutcome)>,
    /// Schema tables that had no CSV file
    pub missing: Vec<String>,
    /// Loaded CSVs that name no schema table; not inserted
    pub ignored: Vec<String>,
}

impl LoadReport {
    /// Total rows committed
    pub fn inserted_rows(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                InsertOutcome::Inserted(n) => *n,
                _ => 0,
            })
            .sum()
    }

    /// Names of tables whose batch was rolled back
    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, InsertOutcome::Skipped(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Outcome for one table
    pub fn outcome(&self, table: &str) -> Option<&InsertOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, outcome)| outcome)
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, outcome) in &self.outcomes {
            writeln!(f, "  {}: {}", name, outcome)?;
        }
        if !self.missing.is_empty() {
            writeln!(f, "  no CSV for: {}", self.missing.join(", "))?;
        }
        if !self.ignored.is_empty() {
            writeln!(f, "  not in schema: {}", self.ignored.join(", "))?;
        }
        write!(
            f,
            "{} rows inserted across {} tables",
            self.inserted_rows(),
            self.outcomes.len()
        )
    }
}

/// Results of a drop-all run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropReport {
    /// Tables dropped, in drop order
    pub dropped: Vec<String>,
    /// Tables the database refused to drop, with its message
    pub failed: Vec<(String, String)>,
}

/// Loaded tables that belong to the schema, parents first
fn schema_tables(schema: &Schema, tables: &CsvTables) -> Vec<String> {
    schema
        .insertion_order(tables.keys().map(String::as_str))
        .into_iter()
        .filter(|name| schema.get_table(name).is_some())
        .collect()
}

/// Create every schema table in creation order
pub async fn create_all_tables(
    session: &mut dyn DatabaseSession,
    schema: &Schema,
) -> Result<usize> {
    for table in &schema.tables {
        info!("Creating table: {}", table.name);
        session.execute(&table.create_statement()).await?;
    }
    Ok(schema.tables.len())
}

/// Insert every loaded schema table, parents before children
///
/// CSVs that name no schema table are logged and listed in
/// [`LoadReport::ignored`].
pub async fn insert_all_data(
    session: &mut dyn DatabaseSession,
    schema: &Schema,
    tables: &CsvTables,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    for name in schema.table_names() {
        if !tables.contains_key(name) {
            warn!("No CSV file for table {}", name);
            report.missing.push(name.to_string());
        }
    }

    for name in tables.keys() {
        if schema.get_table(name).is_none() {
            warn!("{} is not part of the bookstore schema, skipping it", name);
            report.ignored.push(name.clone());
        }
    }

    for name in schema_tables(schema, tables) {
        // schema_tables only yields loaded names
        let Some(table) = tables.get(&name) else {
            continue;
        };
        let outcome = insert_table(session, table).await?;
        report.outcomes.push((name, outcome));
    }

    Ok(report)
}

/// Drop every loaded table, children before parents
///
/// Statements the database rejects (missing table, table still referenced)
/// are logged and skipped; connection failures abort the run.
pub async fn drop_all_tables(
    session: &mut dyn DatabaseSession,
    schema: &Schema,
    tables: &CsvTables,
) -> Result<DropReport> {
    let mut report = DropReport::default();

    for name in schema.drop_order(tables.keys().map(String::as_str)) {
        info!("Dropping table: {}", name);
        let sql = format!("DROP TABLE {}", session.qualified_name(&name));

        match session.execute(&sql).await {
            Ok(_) => report.dropped.push(name),
            Err(LoaderError::Statement(message)) | Err(LoaderError::Integrity(message)) => {
                warn!("Table: {} does not exist", name);
                warn!("{}", message);
                report.failed.push((name, message));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

/// Delete all rows from every loaded schema table, children before parents
pub async fn delete_all_records(
    session: &mut dyn DatabaseSession,
    schema: &Schema,
    tables: &CsvTables,
) -> Result<u64> {
    let mut deleted = 0;
    for name in schema_tables(schema, tables).into_iter().rev() {
        info!("Deleting all records from {}", name);
        deleted += session.execute(&format!("DELETE FROM {}", name)).await?;
    }
    Ok(deleted)
}

/// Render a query result as a text table under its name
pub fn render_result_set(name: &str, result: &ResultSet) -> String {
    let mut table = TextTable::new();
    if !result.columns.is_empty() {
        table.set_header(&result.columns);
    }
    for row in &result.rows {
        table.add_row(row.iter().map(|cell| cell.as_deref().unwrap_or("NULL")));
    }

    if result.is_empty() {
        format!("{} (0 rows)", name)
    } else {
        format!("{} ({} rows)\n{}", name, result.len(), table)
    }
}

/// Print the contents of every loaded schema table to `out`
pub async fn print_all_tables(
    session: &mut dyn DatabaseSession,
    schema: &Schema,
    tables: &CsvTables,
    out: &mut (dyn Write + Send),
) -> Result<usize> {
    let names = schema_tables(schema, tables);
    for name in &names {
        let result = session.query(&format!("SELECT * FROM {}", name)).await?;
        writeln!(out, "{}", render_result_set(name, &result))?;
    }
    Ok(names.len())
}
