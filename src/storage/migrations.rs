/// Database migration management
///
/// This module creates and updates the SQLite schemas: the records database
/// behind `DataStore` and the separate flags database behind `FlagStore`.

use rusqlite::Connection;
use crate::storage::StorageError;

/// Current records database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Current flags database schema version
const CURRENT_FLAGS_VERSION: i32 = 1;

/// Initialize the records database schema
///
/// This creates all required tables if they don't exist and records the
/// schema version for future migrations.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    create_version_table(conn)?;

    let current_version = get_current_version(conn)?;
    if current_version < CURRENT_VERSION {
        run_migrations(conn, current_version)?;
        set_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Initialize the flags database schema
pub fn initialize_flags_database(conn: &Connection) -> Result<(), StorageError> {
    create_version_table(conn)?;

    let current_version = get_current_version(conn)?;
    if current_version < CURRENT_FLAGS_VERSION {
        if current_version < 1 {
            flags_migration_v1(conn)?;
        }
        set_version(conn, CURRENT_FLAGS_VERSION)?;
    }

    Ok(())
}

fn create_version_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;
    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .unwrap_or(0); // Default to version 0 if no version record exists

    Ok(version)
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run records migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: the key/value records table
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| StorageError::Migration(format!("records table: {}", e)))?;

    tracing::info!("Applied migration v1: Created records table");
    Ok(())
}

/// Flags migration to version 1: the critical flags table
fn flags_migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS critical_flags (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| StorageError::Migration(format!("critical_flags table: {}", e)))?;

    tracing::info!("Applied flags migration v1: Created critical_flags table");
    Ok(())
}
