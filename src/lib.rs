//! bookstore-loader library
//!
//! Loads a directory of CSV files into the bookstore schema.
//! The main binary is in src/main.rs.

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod loader;
