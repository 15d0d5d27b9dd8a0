// bookstore-loader: load a directory of CSV files into the bookstore schema
//
// This is the main entry point for the bookstore-loader application.

use anyhow::{Context, Result};
use bookstore_loader::cli::Repl;
use bookstore_loader::config::{AppState, Settings};
use bookstore_loader::database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    println!("bookstore-loader v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load settings")?;
    println!("Database: {}", settings.connection.describe());
    println!("CSV directory: {}", settings.csv_dir.display());

    let session = database::connect(&settings.connection)
        .await
        .context("Failed to connect to the database")?;
    info!("Connected to {}", session.backend().name());

    let state = AppState::new(session, settings.csv_dir);
    let mut repl = Repl::new(state).context("Failed to start the menu")?;
    repl.run().await?;

    Ok(())
}
