/// SQLite implementation of the record storage interface
///
/// Records live in a single `records` table keyed by the store key string.
/// Values are JSON text written by `DataStore`.

use std::path::PathBuf;
use rusqlite::{Connection, OptionalExtension, params};
use chrono::Utc;

use crate::storage::{StorageError, KeyValueBackend, migrations};

/// SQLite-based record storage
///
/// This struct holds a connection to the SQLite database and implements
/// the operations defined in the KeyValueBackend trait.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (or create) the records database at `db_path`
    ///
    /// This runs any necessary migrations to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite storage initialized at: {:?}", db_path);

        Ok(Self { conn })
    }

    /// Open a private in-memory database (tests and dry runs)
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueBackend for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;

        tracing::debug!("Wrote record: {}", key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM records WHERE key = ?1", params![key])?;
        tracing::debug!("Removed record: {}", key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // substr instead of LIKE so '_' and '%' in the prefix stay literal
        let mut stmt = self.conn.prepare(
            "SELECT key FROM records WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key ASC",
        )?;
        let key_iter = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for key in key_iter {
            keys.push(key?);
        }
        Ok(keys)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed = self.conn.execute("DELETE FROM records", [])?;
        tracing::info!("Cleared {} records", removed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_read_overwrite() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(storage.read("daily_goal").unwrap(), None);

        storage.write("daily_goal", "2000").unwrap();
        storage.write("daily_goal", "2500").unwrap();
        assert_eq!(storage.read("daily_goal").unwrap().as_deref(), Some("2500"));

        storage.remove("daily_goal").unwrap();
        assert_eq!(storage.read("daily_goal").unwrap(), None);
    }

    #[test]
    fn test_prefix_listing_is_literal_and_sorted() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.write("entries:2026-01-02", "[]").unwrap();
        storage.write("entries:2026-01-01", "[]").unwrap();
        storage.write("entriesXother", "[]").unwrap();
        storage.write("user_settings", "{}").unwrap();

        let keys = storage.keys_with_prefix("entries:").unwrap();
        assert_eq!(keys, vec!["entries:2026-01-01", "entries:2026-01-02"]);

        storage.clear().unwrap();
        assert!(storage.keys_with_prefix("").unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_connections() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let path = temp_file.path().to_path_buf();

        SqliteStorage::new(path.clone()).unwrap().write("daily_goal", "1800").unwrap();
        let reopened = SqliteStorage::new(path).unwrap();
        assert_eq!(reopened.read("daily_goal").unwrap().as_deref(), Some("1800"));
    }
}
