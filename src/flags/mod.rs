/// Critical flag storage for onboarding gates
///
/// A handful of booleans that must survive aggressive process termination
/// are kept outside the main data store, behind their own durable backend,
/// a retry policy and an in-memory cache.

pub mod sqlite;
pub mod store;

pub use sqlite::SqliteFlagBackend;
pub use store::FlagStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while reading or writing flags
#[derive(Error, Debug)]
pub enum FlagError {
    #[error("Flag storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Flag storage unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),
}

/// The onboarding gates persisted as critical flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CriticalFlag {
    OnboardingCompleted,
    GoalSetupCompleted,
    NotificationsPrompted,
    ProfileCompleted,
}

impl CriticalFlag {
    pub const ALL: [CriticalFlag; 4] = [
        CriticalFlag::OnboardingCompleted,
        CriticalFlag::GoalSetupCompleted,
        CriticalFlag::NotificationsPrompted,
        CriticalFlag::ProfileCompleted,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CriticalFlag::OnboardingCompleted => "onboarding_completed",
            CriticalFlag::GoalSetupCompleted => "goal_setup_completed",
            CriticalFlag::NotificationsPrompted => "notifications_prompted",
            CriticalFlag::ProfileCompleted => "profile_completed",
        }
    }

    pub fn parse(key: &str) -> Result<Self, FlagError> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| FlagError::UnknownFlag(key.to_string()))
    }
}

/// The durable boolean-preference primitive behind `FlagStore`
#[async_trait]
pub trait FlagBackend: Send + Sync {
    /// Read a flag; `None` if it was never written
    async fn read_flag(&self, key: &str) -> Result<Option<bool>, FlagError>;

    /// Persist a flag
    async fn write_flag(&self, key: &str, value: bool) -> Result<(), FlagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_keys_round_trip() {
        for flag in CriticalFlag::ALL {
            assert_eq!(CriticalFlag::parse(flag.key()).unwrap(), flag);
        }
        assert!(matches!(CriticalFlag::parse("dark_mode"), Err(FlagError::UnknownFlag(_))));
    }
}
