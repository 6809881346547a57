/// Reminder scheduler
///
/// Computes the reminders for the next horizon from the stored settings and
/// the last intake, then registers them with a `NotificationDispatcher`.
/// Re-running while future reminders are pending is a no-op unless forced.

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, TimeZone, Utc, Weekday};
use tracing::{debug, info, warn};

use crate::domain::{QuietHours, UserSettings};
use crate::reminders::{NotificationDispatcher, PendingReminder, ReminderKind, SchedulerError};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How far ahead reminders are registered
    pub horizon: Duration,
    /// Loop budget per run, counting quiet-hour jumps
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon: Duration::hours(24),
            max_attempts: 48,
        }
    }
}

/// Result of one scheduling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Notifications are off; pending hydration reminders were cancelled
    Disabled,
    /// Future reminders were already pending and nothing was changed
    AlreadyScheduled { pending: usize },
    /// Weekend reminders are off and today is a weekend day
    SkippedWeekend,
    Scheduled {
        fire_times: Vec<DateTime<Utc>>,
        /// The attempt budget ran out before the horizon was covered
        guard_tripped: bool,
    },
}

/// Reminder fire times computed for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderPlan {
    pub fire_times: Vec<DateTime<Utc>>,
    pub guard_tripped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReminderScheduler {
    config: SchedulerConfig,
}

impl ReminderScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedule against the system clock and local time zone
    pub async fn ensure_scheduled<B, D>(
        &self,
        store: &DataStore<B>,
        dispatcher: &D,
        force: bool,
    ) -> Result<ScheduleOutcome, SchedulerError>
    where
        B: KeyValueBackend,
        D: NotificationDispatcher + ?Sized,
    {
        self.ensure_scheduled_at(store, dispatcher, force, Local::now()).await
    }

    /// Schedule as if the current instant were `now`, judging weekends and
    /// quiet hours in `now`'s time zone
    pub async fn ensure_scheduled_at<B, D, Tz>(
        &self,
        store: &DataStore<B>,
        dispatcher: &D,
        force: bool,
        now: DateTime<Tz>,
    ) -> Result<ScheduleOutcome, SchedulerError>
    where
        B: KeyValueBackend,
        D: NotificationDispatcher + ?Sized,
        Tz: TimeZone,
    {
        let settings = store.load_user_settings();
        let now_utc = now.with_timezone(&Utc);

        let pending: Vec<PendingReminder> = dispatcher
            .pending()
            .await?
            .into_iter()
            .filter(|r| r.kind == ReminderKind::Hydration)
            .collect();

        if !settings.notifications_enabled {
            if !pending.is_empty() {
                let ids: Vec<String> = pending.into_iter().map(|r| r.id).collect();
                dispatcher.cancel(&ids).await?;
                info!("Notifications disabled, cancelled {} reminders", ids.len());
            }
            return Ok(ScheduleOutcome::Disabled);
        }

        let upcoming = pending.iter().filter(|r| r.fire_at > now_utc).count();
        if upcoming > 0 && !force {
            debug!("{} reminders already pending, leaving them in place", upcoming);
            return Ok(ScheduleOutcome::AlreadyScheduled { pending: upcoming });
        }

        if !pending.is_empty() {
            let ids: Vec<String> = pending.into_iter().map(|r| r.id).collect();
            dispatcher.cancel(&ids).await?;
            debug!("Cancelled {} previous reminders", ids.len());
        }

        if !settings.weekend_reminders && matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
            info!("Weekend reminders disabled, skipping scheduling");
            return Ok(ScheduleOutcome::SkippedWeekend);
        }

        settings
            .validate()
            .map_err(|_| SchedulerError::InvalidInterval(settings.reminder_interval_minutes))?;

        let anchor = if settings.smart_reminders {
            store
                .last_hydration_entry()
                .map(|entry| entry.timestamp)
                .unwrap_or(now_utc)
        } else {
            now_utc
        };

        let plan = plan_reminders(&self.config, &settings, anchor, &now);
        if plan.guard_tripped {
            warn!(
                "Reminder scheduling stopped after {} attempts with {} reminders planned",
                self.config.max_attempts,
                plan.fire_times.len()
            );
        }

        let reminders: Vec<PendingReminder> =
            plan.fire_times.iter().copied().map(PendingReminder::hydration).collect();
        if !reminders.is_empty() {
            dispatcher.schedule(&reminders).await?;
        }
        info!("Scheduled {} hydration reminders", reminders.len());

        Ok(ScheduleOutcome::Scheduled {
            fire_times: plan.fire_times,
            guard_tripped: plan.guard_tripped,
        })
    }
}

/// Fire times within `config.horizon` of `now`, spaced by the reminder
/// interval from `anchor` and pushed out of quiet hours
///
/// `settings` must carry a valid interval.
pub fn plan_reminders<Tz: TimeZone>(
    config: &SchedulerConfig,
    settings: &UserSettings,
    anchor: DateTime<Utc>,
    now: &DateTime<Tz>,
) -> ReminderPlan {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);
    let horizon_end = now_utc + config.horizon;
    let interval = Duration::minutes(i64::from(settings.reminder_interval_minutes.max(1)));

    let mut candidate = anchor + interval;
    if candidate <= now_utc {
        // Catch up past `now` in one step instead of walking every missed slot
        let behind = (now_utc - candidate).num_seconds();
        let steps = behind / interval.num_seconds() + 1;
        candidate = candidate + Duration::seconds(steps * interval.num_seconds());
    }

    let mut fire_times = Vec::new();
    let mut attempts = 0;
    let mut guard_tripped = false;

    while candidate <= horizon_end {
        if attempts >= config.max_attempts {
            guard_tripped = true;
            break;
        }
        attempts += 1;

        let local = candidate.with_timezone(&tz);
        if settings.quiet_hours.contains(local.time()) {
            candidate = quiet_end_after(&settings.quiet_hours, &local).unwrap_or(candidate + interval);
            continue;
        }

        fire_times.push(candidate);
        candidate = candidate + interval;
    }

    ReminderPlan {
        fire_times,
        guard_tripped,
    }
}

/// First instant after `local` at which the quiet window ends
fn quiet_end_after<Tz: TimeZone>(quiet: &QuietHours, local: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    let mut end = local.date_naive().and_time(quiet.end);
    if end <= local.naive_local() {
        end = end + Duration::days(1);
    }
    match local.timezone().from_local_datetime(&end) {
        LocalResult::Single(instant) => Some(instant.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}
