/// SQLite-backed critical flag primitive
///
/// Flags live in their own database file so a damaged or wiped records
/// database never takes the onboarding gates with it.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::flags::{FlagBackend, FlagError};
use crate::storage::{migrations, StorageError};

pub struct SqliteFlagBackend {
    conn: Mutex<Connection>,
}

impl SqliteFlagBackend {
    /// Open (or create) the flags database at `db_path`
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open flags database: {}", e)))?;
        migrations::initialize_flags_database(&conn)?;

        tracing::info!("Flag storage initialized at: {:?}", db_path);
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory flags database: {}", e)))?;
        migrations::initialize_flags_database(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>) -> Result<T, FlagError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| FlagError::Unavailable("flags connection lock poisoned".to_string()))?;
        f(&conn).map_err(|e| FlagError::Storage(StorageError::Query(e)))
    }
}

#[async_trait]
impl FlagBackend for SqliteFlagBackend {
    async fn read_flag(&self, key: &str) -> Result<Option<bool>, FlagError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM critical_flags WHERE key = ?1",
                params![key],
                |row| row.get::<_, bool>(0),
            )
            .optional()
        })
    }

    async fn write_flag(&self, key: &str, value: bool) -> Result<(), FlagError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO critical_flags (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
        })?;
        tracing::debug!("Persisted flag {} = {}", key, value);
        Ok(())
    }
}
