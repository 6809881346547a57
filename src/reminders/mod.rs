/// Reminder scheduling
///
/// The scheduler decides *when* hydration reminders fire. Showing them is
/// the job of a `NotificationDispatcher`, which owns the pending set.

pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::{DispatchCounts, InMemoryDispatcher};
pub use scheduler::{plan_reminders, ReminderPlan, ReminderScheduler, ScheduleOutcome, SchedulerConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid reminder interval: {0} minutes")]
    InvalidInterval(u32),
}

/// What a pending notification is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    Hydration,
    /// Anything this crate did not schedule; never cancelled by the scheduler
    Other,
}

/// A notification registered with the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReminder {
    pub id: String,
    pub kind: ReminderKind,
    pub fire_at: DateTime<Utc>,
}

impl PendingReminder {
    pub fn hydration(fire_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("hydration-{}", fire_at.timestamp()),
            kind: ReminderKind::Hydration,
            fire_at,
        }
    }
}

/// The notification service the scheduler registers reminders with
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Every notification currently waiting to fire
    async fn pending(&self) -> Result<Vec<PendingReminder>, SchedulerError>;

    /// Register reminders
    async fn schedule(&self, reminders: &[PendingReminder]) -> Result<(), SchedulerError>;

    /// Cancel reminders by id
    async fn cancel(&self, ids: &[String]) -> Result<(), SchedulerError>;
}
