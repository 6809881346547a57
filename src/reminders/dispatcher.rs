/// In-process notification dispatcher
///
/// Keeps the pending set in memory and logs each registration. The server
/// uses it in place of an OS notification center; tests use its call counts.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use crate::reminders::{NotificationDispatcher, PendingReminder, SchedulerError};

/// Number of mutating calls made against a dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    pub schedule: u32,
    pub cancel: u32,
}

#[derive(Default)]
pub struct InMemoryDispatcher {
    pending: Mutex<Vec<PendingReminder>>,
    counts: Mutex<DispatchCounts>,
}

impl InMemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with reminders already pending (e.g. left over from a previous run)
    pub fn with_pending(reminders: Vec<PendingReminder>) -> Self {
        Self {
            pending: Mutex::new(reminders),
            counts: Mutex::new(DispatchCounts::default()),
        }
    }

    pub fn counts(&self) -> DispatchCounts {
        *lock(&self.counts)
    }

    /// Snapshot of the pending set sorted by fire time
    pub fn snapshot(&self) -> Vec<PendingReminder> {
        let mut pending = lock(&self.pending).clone();
        pending.sort_by_key(|r| r.fire_at);
        pending
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl NotificationDispatcher for InMemoryDispatcher {
    async fn pending(&self) -> Result<Vec<PendingReminder>, SchedulerError> {
        Ok(lock(&self.pending).clone())
    }

    async fn schedule(&self, reminders: &[PendingReminder]) -> Result<(), SchedulerError> {
        lock(&self.counts).schedule += 1;
        let mut pending = lock(&self.pending);
        for reminder in reminders {
            info!("Reminder {} scheduled for {}", reminder.id, reminder.fire_at);
            pending.retain(|p| p.id != reminder.id);
            pending.push(reminder.clone());
        }
        Ok(())
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), SchedulerError> {
        lock(&self.counts).cancel += 1;
        lock(&self.pending).retain(|p| !ids.contains(&p.id));
        Ok(())
    }
}
