//! Loader module
//!
//! This module reads the CSV directory and moves its tables in and out of
//! the database.

pub mod csv_table;
pub mod insert;
pub mod maintenance;

pub use csv_table::{load_csv, load_directory, CsvTable, CsvTables};
pub use insert::{insert_statement, insert_table, InsertOutcome};
pub use maintenance::{
    create_all_tables, delete_all_records, drop_all_tables, insert_all_data, print_all_tables,
    DropReport, LoadReport,
};
