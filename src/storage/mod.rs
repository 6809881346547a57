/// Storage layer for persisting hydration data
///
/// This module owns the raw persistence primitive: a string-keyed record
/// table holding JSON documents. The typed schema on top of it lives in
/// `StoreKey`; everything above this layer goes through `DataStore`.

pub mod sqlite;
pub mod memory;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;
pub use memory::*;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Key prefix shared by every per-date entry list
pub const ENTRIES_PREFIX: &str = "entries:";

/// The fixed set of records the store manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    DailyGoal,
    UserSettings,
    AppSettings,
    UserProfile,
    History,
    /// Entry list for one local calendar date
    Entries(NaiveDate),
}

impl StoreKey {
    /// Storage key string for this record
    pub fn as_key(&self) -> String {
        match self {
            StoreKey::DailyGoal => "daily_goal".to_string(),
            StoreKey::UserSettings => "user_settings".to_string(),
            StoreKey::AppSettings => "app_settings".to_string(),
            StoreKey::UserProfile => "user_profile".to_string(),
            StoreKey::History => "hydration_history".to_string(),
            StoreKey::Entries(date) => format!("{}{}", ENTRIES_PREFIX, date.format("%Y-%m-%d")),
        }
    }

    /// Parse a storage key string back into a record key
    pub fn parse(key: &str) -> Option<StoreKey> {
        match key {
            "daily_goal" => Some(StoreKey::DailyGoal),
            "user_settings" => Some(StoreKey::UserSettings),
            "app_settings" => Some(StoreKey::AppSettings),
            "user_profile" => Some(StoreKey::UserProfile),
            "hydration_history" => Some(StoreKey::History),
            other => other
                .strip_prefix(ENTRIES_PREFIX)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map(StoreKey::Entries),
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// Trait defining the raw record storage interface
///
/// Values are opaque JSON text; parsing and defaults are the caller's job.
/// This lets tests swap SQLite for an in-memory map.
pub trait KeyValueBackend {
    /// Read the raw value stored under `key`
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` (no-op if absent)
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List stored keys starting with `prefix`, sorted ascending
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Remove every record
    fn clear(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_key_round_trip() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        let keys = [
            StoreKey::DailyGoal,
            StoreKey::UserSettings,
            StoreKey::AppSettings,
            StoreKey::UserProfile,
            StoreKey::History,
            StoreKey::Entries(date),
        ];
        for key in keys {
            assert_eq!(StoreKey::parse(&key.as_key()), Some(key));
        }
        assert_eq!(StoreKey::Entries(date).as_key(), "entries:2026-01-09");
        assert_eq!(StoreKey::parse("entries:not-a-date"), None);
        assert_eq!(StoreKey::parse("theme"), None);
    }
}
