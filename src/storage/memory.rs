/// In-memory record storage
///
/// Used by tests and by callers that want an isolated, throwaway store.
/// Writes can be made to fail after a fixed number of successes to exercise
/// the persist-failure paths.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::storage::{KeyValueBackend, StorageError};

/// Map-backed implementation of `KeyValueBackend`
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<BTreeMap<String, String>>,
    /// Remaining writes before every write fails; `None` never fails
    writes_until_failure: Mutex<Option<usize>>,
    /// Writes to keys starting with this prefix always fail
    rejected_prefix: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `count` more writes succeed, then reject every write
    pub fn fail_writes_after(&self, count: usize) {
        *lock(&self.writes_until_failure) = Some(count);
    }

    /// Reject every write to a key starting with `prefix`
    pub fn reject_writes_with_prefix(&self, prefix: &str) {
        *lock(&self.rejected_prefix) = Some(prefix.to_string());
    }

    /// Store raw text directly, bypassing the failure switch (for corrupt-record tests)
    pub fn insert_raw(&self, key: &str, value: &str) {
        lock(&self.records).insert(key.to_string(), value.to_string());
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_write(&self, key: &str) -> Result<(), StorageError> {
        if let Some(prefix) = lock(&self.rejected_prefix).as_deref() {
            if key.starts_with(prefix) {
                return Err(StorageError::WriteRejected {
                    key: key.to_string(),
                    reason: format!("writes under '{}' are refused", prefix),
                });
            }
        }

        let mut remaining = lock(&self.writes_until_failure);
        match remaining.as_mut() {
            Some(0) => Err(StorageError::WriteRejected {
                key: key.to_string(),
                reason: "storage is refusing writes".to_string(),
            }),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl KeyValueBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.records).get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_write(key)?;
        lock(&self.records).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_write(key)?;
        lock(&self.records).remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.records)
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.check_write("*")?;
        lock(&self.records).clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_writes_after() {
        let storage = MemoryStorage::new();
        storage.fail_writes_after(1);
        assert!(storage.write("a", "1").is_ok());
        assert!(storage.write("b", "2").is_err());
        assert_eq!(storage.read("a").unwrap().as_deref(), Some("1"));
        assert_eq!(storage.read("b").unwrap(), None);
    }

    #[test]
    fn test_reject_writes_with_prefix() {
        let storage = MemoryStorage::new();
        storage.reject_writes_with_prefix("entries:");
        assert!(storage.write("entries:2026-05-01", "[]").is_err());
        assert!(storage.write("daily_goal", "2000").is_ok());
    }
}
