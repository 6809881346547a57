/// Core types and enums used throughout the domain layer
///
/// This module defines the small value types (IDs, the daily goal, entry
/// sources, themes) shared by entries, history rows and settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Smallest daily goal the store accepts, in milliliters
pub const MIN_DAILY_GOAL_ML: u32 = 1;

/// Largest daily goal the store accepts, in milliliters
pub const MAX_DAILY_GOAL_ML: u32 = 10_000;

/// Goal used on first run before the user picks one
pub const DEFAULT_DAILY_GOAL_ML: u32 = 2_000;

/// Unique identifier for a hydration entry
///
/// This is a wrapper around UUID so an undo reversal can point at the exact
/// entry it cancels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Generate a new random entry ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an entry ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user's daily intake target in milliliters
///
/// Only values in `1..=10000` can be constructed, so a loaded goal is always
/// safe to divide by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct DailyGoal(u32);

impl DailyGoal {
    /// Create a goal, rejecting values outside the accepted range
    pub fn new(ml: i64) -> Result<Self, DomainError> {
        if ml < MIN_DAILY_GOAL_ML as i64 || ml > MAX_DAILY_GOAL_ML as i64 {
            return Err(DomainError::InvalidGoal(ml));
        }
        Ok(Self(ml as u32))
    }

    /// Goal in milliliters
    pub fn ml(self) -> u32 {
        self.0
    }
}

impl Default for DailyGoal {
    fn default() -> Self {
        Self(DEFAULT_DAILY_GOAL_ML)
    }
}

impl TryFrom<i64> for DailyGoal {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DailyGoal> for u32 {
    fn from(goal: DailyGoal) -> Self {
        goal.0
    }
}

/// Where a hydration entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// Logged by the user from the main screen
    #[default]
    Manual,
    /// Logged from a reminder notification action
    Reminder,
}

impl EntrySource {
    /// Parse a source name as sent by clients ("manual" / "reminder")
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(EntrySource::Manual),
            "reminder" => Ok(EntrySource::Reminder),
            other => Err(DomainError::Validation {
                message: format!("Unknown entry source '{}'", other),
            }),
        }
    }
}

/// Color theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Sex recorded on the user profile, used for intake recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_range() {
        assert!(DailyGoal::new(0).is_err());
        assert!(DailyGoal::new(-5).is_err());
        assert!(DailyGoal::new(10_001).is_err());
        assert_eq!(DailyGoal::new(1).unwrap().ml(), 1);
        assert_eq!(DailyGoal::new(10_000).unwrap().ml(), 10_000);
    }

    #[test]
    fn test_goal_deserialize_rejects_out_of_range() {
        let ok: DailyGoal = serde_json::from_str("2500").unwrap();
        assert_eq!(ok.ml(), 2500);
        assert!(serde_json::from_str::<DailyGoal>("0").is_err());
        assert!(serde_json::from_str::<DailyGoal>("\"lots\"").is_err());
    }

    #[test]
    fn test_entry_source_parse() {
        assert_eq!(EntrySource::parse("Manual").unwrap(), EntrySource::Manual);
        assert_eq!(EntrySource::parse("reminder").unwrap(), EntrySource::Reminder);
        assert!(EntrySource::parse("watch").is_err());
    }
}
