/// Cached, retrying front end over a `FlagBackend`
///
/// Reads hit the cache first; only a miss touches the backend. Every backend
/// call goes through `with_retry`. Overlapping writes to one flag resolve as
/// last-completer-wins.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::flags::{CriticalFlag, FlagBackend, FlagError};
use crate::retry::{with_retry, RetryPolicy};

pub struct FlagStore<P: FlagBackend> {
    backend: P,
    retry: RetryPolicy,
    cache: Mutex<HashMap<CriticalFlag, bool>>,
    initialized: AtomicBool,
}

impl<P: FlagBackend> FlagStore<P> {
    pub fn new(backend: P) -> Self {
        Self::with_policy(backend, RetryPolicy::default())
    }

    pub fn with_policy(backend: P, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            cache: Mutex::new(HashMap::new()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Load every known flag into the cache
    ///
    /// A flag whose reads all fail is cached as `false`. The store is marked
    /// initialized either way so startup never waits on this layer.
    pub async fn initialize(&self) {
        let mut degraded = 0;
        for flag in CriticalFlag::ALL {
            let value = match self.read_with_retry(flag).await {
                Ok(value) => value.unwrap_or(false),
                Err(e) => {
                    warn!("Flag {} unavailable at startup ({}), defaulting to false", flag.key(), e);
                    degraded += 1;
                    false
                }
            };
            self.cache().insert(flag, value);
        }

        self.initialized.store(true, Ordering::Release);
        if degraded > 0 {
            warn!("Flag store initialized in degraded mode ({} flag(s) defaulted)", degraded);
        } else {
            info!("Flag store initialized");
        }
    }

    /// Current value of `flag`; `false` if it was never set or cannot be read
    pub async fn get_flag(&self, flag: CriticalFlag) -> bool {
        if let Some(value) = self.cache().get(&flag).copied() {
            return value;
        }

        match self.read_with_retry(flag).await {
            Ok(value) => {
                let value = value.unwrap_or(false);
                self.cache().insert(flag, value);
                value
            }
            Err(e) => {
                warn!("Failed to read flag {}: {}", flag.key(), e);
                false
            }
        }
    }

    /// Persist `flag`; the cache only changes once the write succeeded
    pub async fn set_flag(&self, flag: CriticalFlag, value: bool) -> Result<(), FlagError> {
        let key = flag.key();
        let result = with_retry(&self.retry, &format!("write flag {}", key), |_| {
            self.backend.write_flag(key, value)
        })
        .await;

        match result {
            Ok(()) => {
                self.cache().insert(flag, value);
                debug!("Flag {} set to {}", key, value);
                Ok(())
            }
            Err(e) => {
                error!("Giving up on writing flag {}: {}", key, e);
                Err(e)
            }
        }
    }

    /// Every known flag keyed by its storage name
    pub async fn snapshot(&self) -> BTreeMap<String, bool> {
        let mut flags = BTreeMap::new();
        for flag in CriticalFlag::ALL {
            flags.insert(flag.key().to_string(), self.get_flag(flag).await);
        }
        flags
    }

    async fn read_with_retry(&self, flag: CriticalFlag) -> Result<Option<bool>, FlagError> {
        let key = flag.key();
        with_retry(&self.retry, &format!("read flag {}", key), |_| self.backend.read_flag(key)).await
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<CriticalFlag, bool>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    /// Backend that fails a fixed number of calls before behaving
    #[derive(Default)]
    struct FlakyBackend {
        values: Mutex<HashMap<String, bool>>,
        failures_left: AtomicU32,
        reads: AtomicU32,
        writes: AtomicU32,
    }

    impl FlakyBackend {
        fn failing(times: u32) -> Self {
            let backend = Self::default();
            backend.failures_left.store(times, Ordering::SeqCst);
            backend
        }

        fn fail_once_more(&self) -> Result<(), FlagError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(FlagError::Unavailable("preferences busy".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl FlagBackend for FlakyBackend {
        async fn read_flag(&self, key: &str) -> Result<Option<bool>, FlagError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.fail_once_more()?;
            Ok(self.values.lock().unwrap().get(key).copied())
        }

        async fn write_flag(&self, key: &str, value: bool) -> Result<(), FlagError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.fail_once_more()?;
            self.values.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }
    }

    fn store(backend: FlakyBackend) -> FlagStore<FlakyBackend> {
        FlagStore::with_policy(backend, RetryPolicy::default().without_delay())
    }

    #[tokio::test]
    async fn test_read_recovers_on_third_attempt_then_caches() {
        let backend = FlakyBackend::failing(2);
        backend.values.lock().unwrap().insert("onboarding_completed".to_string(), true);
        let flags = store(backend);

        assert!(flags.get_flag(CriticalFlag::OnboardingCompleted).await);
        assert_eq!(flags.backend.reads.load(Ordering::SeqCst), 3);

        assert!(flags.get_flag(CriticalFlag::OnboardingCompleted).await);
        assert_eq!(flags.backend.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_write_fills_cache() {
        let flags = store(FlakyBackend::failing(1));
        flags.set_flag(CriticalFlag::ProfileCompleted, true).await.unwrap();
        assert_eq!(flags.backend.writes.load(Ordering::SeqCst), 2);

        assert!(flags.get_flag(CriticalFlag::ProfileCompleted).await);
        assert_eq!(flags.backend.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let flags = store(FlakyBackend::failing(3));
        assert!(flags.set_flag(CriticalFlag::GoalSetupCompleted, true).await.is_err());
        assert!(!flags.cache().contains_key(&CriticalFlag::GoalSetupCompleted));
    }

    #[tokio::test]
    async fn test_initialize_degrades_to_false() {
        let backend = FlakyBackend::failing(u32::MAX);
        let flags = store(backend);
        assert!(!flags.is_initialized());

        flags.initialize().await;

        assert!(flags.is_initialized());
        let reads_after_init = flags.backend.reads.load(Ordering::SeqCst);
        assert!(!flags.get_flag(CriticalFlag::NotificationsPrompted).await);
        assert_eq!(flags.backend.reads.load(Ordering::SeqCst), reads_after_init);
    }

    #[tokio::test]
    async fn test_snapshot_lists_every_flag() {
        let flags = store(FlakyBackend::default());
        flags.set_flag(CriticalFlag::OnboardingCompleted, true).await.unwrap();

        let snapshot = flags.snapshot().await;
        assert_eq!(snapshot.len(), CriticalFlag::ALL.len());
        assert_eq!(snapshot.get("onboarding_completed"), Some(&true));
        assert_eq!(snapshot.get("profile_completed"), Some(&false));
    }
}
