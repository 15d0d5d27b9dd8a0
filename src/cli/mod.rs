//! CLI module
//!
//! This module provides the command-line interface for bookstore-loader,
//! including the menu loop and its command handlers.

pub mod commands;
pub mod repl;

// Re-exports
pub use repl::Repl;
