//! Command handlers for CLI
//!
//! This module implements the numbered menu options.

use crate::config::AppState;
use crate::error::{LoaderError, Result};
use crate::loader;

/// Menu options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Drop every loaded table
    DropAll,
    /// Create the bookstore schema
    CreateAll,
    /// Insert every loaded CSV
    InsertAll,
    /// Delete all rows from every loaded table
    DeleteAll,
    /// Print every loaded table
    PrintAll,
    /// Exit the application
    Quit,
}

impl MenuChoice {
    /// Parse a menu choice from user input
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" => Ok(MenuChoice::DropAll),
            "2" => Ok(MenuChoice::CreateAll),
            "3" => Ok(MenuChoice::InsertAll),
            "4" => Ok(MenuChoice::DeleteAll),
            "5" => Ok(MenuChoice::PrintAll),
            "q" | "quit" | "exit" => Ok(MenuChoice::Quit),
            other => Err(LoaderError::UnknownCommand(other.to_string())),
        }
    }

    /// Whether the CSV directory is reloaded before this option runs
    pub fn needs_tables(&self) -> bool {
        !matches!(self, MenuChoice::CreateAll | MenuChoice::Quit)
    }
}

/// Menu text shown before every prompt
pub const MENU: &str = "\
1. Drop all tables
2. Create all tables
3. Insert all data
4. Delete all records
5. Print all tables
q. Quit";

/// Handle a menu choice and return the result message
pub async fn handle_command(choice: MenuChoice, state: &mut AppState) -> Result<String> {
    let tables = if choice.needs_tables() {
        state.reload_tables()?
    } else {
        Default::default()
    };
    let session = state.session.as_mut();

    match choice {
        MenuChoice::DropAll => {
            let report = loader::drop_all_tables(session, &state.schema, &tables).await?;
            if report.failed.is_empty() {
                Ok(format!("✓ Dropped {} tables", report.dropped.len()))
            } else {
                let failed: Vec<&str> = report.failed.iter().map(|(n, _)| n.as_str()).collect();
                Ok(format!(
                    "✓ Dropped {} tables ({} not dropped: {})",
                    report.dropped.len(),
                    failed.len(),
                    failed.join(", ")
                ))
            }
        }
        MenuChoice::CreateAll => {
            let created = loader::create_all_tables(session, &state.schema).await?;
            Ok(format!("✓ Created {} tables", created))
        }
        MenuChoice::InsertAll => {
            let report = loader::insert_all_data(session, &state.schema, &tables).await?;
            Ok(format!("✓ Insert finished\n{}", report))
        }
        MenuChoice::DeleteAll => {
            let deleted = loader::delete_all_records(session, &state.schema, &tables).await?;
            Ok(format!("✓ Deleted {} records", deleted))
        }
        MenuChoice::PrintAll => {
            let mut out = std::io::stdout();
            let printed =
                loader::print_all_tables(session, &state.schema, &tables, &mut out).await?;
            Ok(format!("✓ Printed {} tables", printed))
        }
        MenuChoice::Quit => Ok("Goodbye!".to_string()),
    }
}

/// Format an error for display
pub fn format_error(error: &LoaderError) -> String {
    match error {
        LoaderError::UnknownCommand(input) => format!(
            "Error: {:?} is not a menu option. Choose 1-5, or q to quit.",
            input
        ),
        other => format!("Error: {}", other),
    }
}
