/// Tool for (re)building the reminder schedule
///
/// This module implements the reminders_schedule MCP tool.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::reminders::{NotificationDispatcher, ReminderScheduler, ScheduleOutcome};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;
use crate::tools::{plural, ToolError};

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleParams {
    /// Replace reminders that are already pending
    pub force: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub fire_times: Vec<DateTime<Utc>>,
    pub message: String,
}

pub async fn schedule_reminders<B, D>(
    store: &DataStore<B>,
    scheduler: &ReminderScheduler,
    dispatcher: &D,
    params: ScheduleParams,
) -> Result<ScheduleResponse, ToolError>
where
    B: KeyValueBackend,
    D: NotificationDispatcher + ?Sized,
{
    let outcome = scheduler
        .ensure_scheduled(store, dispatcher, params.force.unwrap_or(false))
        .await?;

    let (fire_times, message) = match outcome {
        ScheduleOutcome::Disabled => (Vec::new(), "🔕 Notifications are disabled; no reminders scheduled".to_string()),
        ScheduleOutcome::AlreadyScheduled { pending } => (
            Vec::new(),
            format!("⏰ {} reminder{} already pending; pass force to rebuild", pending, plural(pending)),
        ),
        ScheduleOutcome::SkippedWeekend => (Vec::new(), "🛋️ Weekend reminders are off".to_string()),
        ScheduleOutcome::Scheduled { fire_times, guard_tripped } => {
            let mut message = format!("⏰ Scheduled {} reminder{}", fire_times.len(), plural(fire_times.len()));
            if let Some(first) = fire_times.first() {
                message.push_str(&format!(", next at {}", first.with_timezone(&chrono::Local).format("%H:%M")));
            }
            if guard_tripped {
                message.push_str(" (stopped early at the scheduling limit)");
            }
            (fire_times, message)
        }
    };

    Ok(ScheduleResponse { fire_times, message })
}
