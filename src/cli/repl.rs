//! REPL implementation
//!
//! This module implements the interactive menu loop.

use crate::cli::commands::{self, format_error, MenuChoice, MENU};
use crate::config::AppState;
use crate::error::{LoaderError, Result};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const PROMPT: &str = "Enter Choice: ";

/// Menu REPL
pub struct Repl {
    /// The rustyline editor
    editor: DefaultEditor,
    /// Whether the REPL should continue running
    running: bool,
    /// Application state
    state: AppState,
    /// Where history is persisted
    history_path: PathBuf,
}

fn history_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(concat!(".", env!("CARGO_PKG_NAME"))).join("history"))
        .unwrap_or_else(|| concat!(".", env!("CARGO_PKG_NAME"), "-history").into())
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(state: AppState) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();

        let mut editor = DefaultEditor::with_config(config).map_err(|e| {
            LoaderError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to initialize editor: {}", e),
            ))
        })?;

        let history_path = history_path();
        if let Err(e) = editor.load_history(&history_path) {
            debug!("Could not load history: {}", e);
        }

        Ok(Self {
            editor,
            running: true,
            state,
            history_path,
        })
    }

    /// Run the REPL loop
    pub async fn run(&mut self) -> Result<()> {
        while self.running {
            println!();
            println!("{}", MENU);

            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match MenuChoice::parse(line) {
                        Ok(choice) => self.handle_choice(choice).await,
                        Err(e) => println!("{}", format_error(&e)),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    self.running = false;
                }
                Err(err) => {
                    println!("Error: {:?}", err);
                    self.running = false;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            debug!("Could not save history: {}", e);
        }
    }

    /// Handle a menu choice
    async fn handle_choice(&mut self, choice: MenuChoice) {
        if choice == MenuChoice::Quit {
            self.running = false;
        }
        match commands::handle_command(choice, &mut self.state).await {
            Ok(msg) => println!("{}", msg),
            Err(e) => println!("{}", format_error(&e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_path_is_per_application() {
        let path = history_path();
        assert!(path.to_string_lossy().contains("bookstore-loader"));
    }
}
