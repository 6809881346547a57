/// User settings, app settings and profile records
///
/// All three are stored as single records and loaded with defaults when
/// missing. Every struct uses `#[serde(default)]` so records written by an
/// older build (or an older backup) still load after fields are added.

use serde::{Deserialize, Serialize};
use chrono::{NaiveTime, Timelike};
use crate::domain::{DomainError, Sex, Theme};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Longest reminder interval accepted (one day)
pub const MAX_REMINDER_INTERVAL_MINUTES: u32 = MINUTES_PER_DAY;

/// Local-time window during which reminders must not fire
///
/// The window may cross midnight (e.g. 23:00-07:00). The start minute is
/// inside the window, the end minute is not. A window whose start equals its
/// end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }

    /// Whether a local time of day falls inside the window
    pub fn contains(&self, time: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        let start = minute_of_day(self.start);
        let end = minute_of_day(self.end);
        let length = (end + MINUTES_PER_DAY - start) % MINUTES_PER_DAY;
        let offset = (minute_of_day(time) + MINUTES_PER_DAY - start) % MINUTES_PER_DAY;
        offset < length
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        }
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Reminder and feedback preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub notifications_enabled: bool,
    /// Minutes between reminders
    pub reminder_interval_minutes: u32,
    pub quiet_hours: QuietHours,
    pub weekend_reminders: bool,
    pub smart_reminders: bool,
    pub haptics_enabled: bool,
    pub sound_enabled: bool,
}

impl UserSettings {
    /// Validate values a client may have edited
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.reminder_interval_minutes == 0
            || self.reminder_interval_minutes > MAX_REMINDER_INTERVAL_MINUTES
        {
            return Err(DomainError::InvalidInterval(self.reminder_interval_minutes));
        }
        Ok(())
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            reminder_interval_minutes: 60,
            quiet_hours: QuietHours::default(),
            weekend_reminders: true,
            smart_reminders: true,
            haptics_enabled: true,
            sound_enabled: true,
        }
    }
}

/// Per-feature onboarding progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OnboardingProgress {
    pub welcome: bool,
    pub goal_setup: bool,
    pub reminders_setup: bool,
    pub profile_setup: bool,
}

/// App-level presentation state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub theme: Theme,
    pub onboarding: OnboardingProgress,
    /// Last screen the user had open, restored on launch
    pub last_view: Option<String>,
    pub reduced_motion: bool,
}

/// Profile fields owned by the session layer and persisted through the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub name: Option<String>,
    pub weight_kg: Option<f32>,
    pub height_cm: Option<f32>,
    pub sex: Option<Sex>,
    pub wake_time: Option<NaiveTime>,
    pub sleep_time: Option<NaiveTime>,
    /// Photo as a data URL or file reference
    pub photo: Option<String>,
}

impl UserProfile {
    /// Suggested daily goal from body weight (35 ml per kg), clamped to the goal range
    pub fn recommended_goal_ml(&self) -> Option<u32> {
        let weight = self.weight_kg.filter(|w| w.is_finite() && *w > 0.0)?;
        let goal = (weight * 35.0).round() as u32;
        Some(goal.clamp(crate::domain::MIN_DAILY_GOAL_ML, crate::domain::MAX_DAILY_GOAL_ML))
    }
}
