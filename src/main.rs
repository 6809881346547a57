/// Main entry point for the Hydration Tracker MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

use hydration_tracker::HydrationTrackerServer;

/// Find a writable data directory with a robust fallback strategy
fn get_default_data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        // 1. User's home directory (preferred)
        dirs::home_dir().map(|mut p| {
            p.push(".hydration_tracker");
            p
        }),
        // 2. User's data directory (platform-specific)
        dirs::data_dir().map(|mut p| {
            p.push("hydration_tracker");
            p
        }),
        // 3. User's config directory
        dirs::config_dir().map(|mut p| {
            p.push("hydration_tracker");
            p
        }),
        // 4. Current working directory (last resort)
        std::env::current_dir().ok().map(|mut p| {
            p.push(".hydration_tracker");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.clone());
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("hydration_tracker");
    std::fs::create_dir_all(&temp_path)?;

    tracing::warn!("Using temporary directory for data: {}", temp_path.display());
    Ok(temp_path)
}

/// Use `path` if given (creating its parent), otherwise `file_name` in the default data dir
fn resolve_path(path: Option<PathBuf>, file_name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                ensure_dir(parent)?;
            }
            Ok(path)
        }
        None => Ok(get_default_data_dir()?.join(file_name)),
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        Ok(())
    } else {
        std::fs::create_dir_all(dir)
    }
}

/// Command line arguments for the Hydration Tracker MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database holding hydration records
    /// If not provided, uses a default location in the user's home directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to the SQLite database holding critical onboarding flags
    /// Defaults to flags.db in the default data directory
    #[arg(long)]
    flags_database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("hydration_tracker={}", log_level))
        .with_writer(std::io::stderr) // stdout carries the protocol
        .init();

    info!("Starting Hydration Tracker MCP server");

    let db_path = resolve_path(args.database, "hydration.db")?;
    let flags_path = resolve_path(args.flags_database, "flags.db")?;

    info!("Using database at: {}", db_path.display());

    let server = HydrationTrackerServer::new(db_path, flags_path).await?;
    server.run().await?;

    info!("Hydration Tracker MCP server shutdown complete");
    Ok(())
}
