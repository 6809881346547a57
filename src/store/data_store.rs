/// The central hydration data store
///
/// `DataStore` wraps a `KeyValueBackend` with the typed record schema, the
/// change bus, and the composite operations that keep per-day entry lists and
/// the history aggregate in step with each other.
///
/// Reads never fail: a missing or corrupt record yields its default and a
/// warning. Writes are best-effort: persist failures are logged and swallowed
/// so UI flows keep working. The `try_*` variants surface failures for callers
/// that must know (backup restore).

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::domain::{
    effective_intakes, last_undoable, normalize_history, total_amount, upsert_day, AppSettings,
    DailyGoal, DomainError, EntrySource, HydrationDay, HydrationEntry, UserProfile, UserSettings,
};
use crate::storage::{KeyValueBackend, StorageError, StoreKey, ENTRIES_PREFIX};
use crate::store::events::{EventBus, StoreEvent, Subscription, Topic};

/// A typed value for one `StoreKey`
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    DailyGoal(DailyGoal),
    UserSettings(UserSettings),
    AppSettings(AppSettings),
    UserProfile(UserProfile),
    History(Vec<HydrationDay>),
    Entries(NaiveDate, Vec<HydrationEntry>),
}

impl Record {
    pub fn key(&self) -> StoreKey {
        match self {
            Record::DailyGoal(_) => StoreKey::DailyGoal,
            Record::UserSettings(_) => StoreKey::UserSettings,
            Record::AppSettings(_) => StoreKey::AppSettings,
            Record::UserProfile(_) => StoreKey::UserProfile,
            Record::History(_) => StoreKey::History,
            Record::Entries(date, _) => StoreKey::Entries(*date),
        }
    }
}

/// Today's local calendar date
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct DataStore<B: KeyValueBackend> {
    backend: B,
    bus: EventBus,
}

impl<B: KeyValueBackend> DataStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bus: EventBus::new(),
        }
    }

    /// The underlying record storage
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Subscribe to changes on `topic`
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(topic, callback)
    }

    /// The bus events are published on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    // Generic typed access

    /// Read the record stored under `key`, or its default
    pub fn get(&self, key: StoreKey) -> Record {
        match key {
            StoreKey::DailyGoal => Record::DailyGoal(self.load_daily_goal()),
            StoreKey::UserSettings => Record::UserSettings(self.load_user_settings()),
            StoreKey::AppSettings => Record::AppSettings(self.load_app_settings()),
            StoreKey::UserProfile => Record::UserProfile(self.load_user_profile()),
            StoreKey::History => Record::History(self.load_history()),
            StoreKey::Entries(date) => Record::Entries(date, self.load_hydration_entries(date)),
        }
    }

    /// Write a record through its typed setter (composite rules included)
    pub fn set(&self, record: Record) {
        match record {
            Record::DailyGoal(goal) => self.save_daily_goal(goal),
            Record::UserSettings(settings) => self.save_user_settings(settings),
            Record::AppSettings(settings) => self.save_app_settings(settings),
            Record::UserProfile(profile) => self.save_user_profile(profile),
            Record::History(history) => self.save_history(history),
            Record::Entries(date, entries) => self.save_hydration_entries(date, entries),
        }
    }

    // Daily goal

    pub fn load_daily_goal(&self) -> DailyGoal {
        self.read_record(StoreKey::DailyGoal)
    }

    /// Save the goal and retroactively apply it to today's history row
    pub fn save_daily_goal(&self, goal: DailyGoal) {
        self.save_daily_goal_as_of(goal, local_today());
    }

    /// Save the goal, treating `today` as the current date
    ///
    /// If the goal itself cannot be persisted, history is left alone.
    pub fn save_daily_goal_as_of(&self, goal: DailyGoal, today: NaiveDate) {
        if let Err(e) = self.try_save_daily_goal(goal) {
            error!("Failed to persist daily goal: {}", e);
            return;
        }

        let mut history = self.load_history();
        if let Some(day) = history.iter_mut().find(|d| d.date == today) {
            if day.goal_at_the_time != goal.ml() {
                day.goal_at_the_time = goal.ml();
                self.save_history(history);
            }
        }
    }

    pub fn try_save_daily_goal(&self, goal: DailyGoal) -> Result<(), StorageError> {
        self.try_write_record(StoreKey::DailyGoal, &goal, || StoreEvent::DailyGoalChanged(goal))
            .map(|_| ())
    }

    // Entries

    pub fn load_hydration_entries(&self, date: NaiveDate) -> Vec<HydrationEntry> {
        self.read_record(StoreKey::Entries(date))
    }

    /// Replace the entry list for `date` and bring its history row in line
    ///
    /// An empty list is a reset: the history row (if any) drops to zero. No
    /// row is created for a date that never had one. If the list cannot be
    /// persisted, history is left alone.
    pub fn save_hydration_entries(&self, date: NaiveDate, entries: Vec<HydrationEntry>) {
        let amount = total_amount(&entries);
        let had_entries = !entries.is_empty();
        if let Err(e) = self.try_save_entries_raw(date, &entries) {
            error!("Failed to persist entries for {}: {}", date, e);
            return;
        }

        let mut history = self.load_history();
        let existing = history.iter().find(|d| d.date == date).cloned();
        match existing {
            Some(day) if day.amount == amount => {}
            Some(day) => {
                upsert_day(&mut history, HydrationDay::new(date, amount, day.goal_at_the_time));
                self.save_history(history);
            }
            None if had_entries => {
                let goal = self.load_daily_goal().ml();
                upsert_day(&mut history, HydrationDay::new(date, amount, goal));
                self.save_history(history);
            }
            None => {}
        }
    }

    /// Append one entry to `date` and update the history row
    pub fn add_hydration_entry(&self, date: NaiveDate, entry: HydrationEntry) {
        debug!("Adding {} ml entry for {}", entry.amount, date);
        let mut entries = self.load_hydration_entries(date);
        entries.push(entry);
        self.save_hydration_entries(date, entries);
    }

    /// Log an intake happening now, on today's date
    pub fn log_intake(&self, amount: i32, source: EntrySource) -> Result<HydrationEntry, DomainError> {
        let entry = HydrationEntry::new(amount, source, Utc::now())?;
        self.add_hydration_entry(local_today(), entry.clone());
        Ok(entry)
    }

    /// Cancel the latest intake on `date` by appending a reversal entry
    ///
    /// Returns the reversal, or `None` if nothing on that date can be undone.
    pub fn undo_last_entry(&self, date: NaiveDate, at: DateTime<Utc>) -> Option<HydrationEntry> {
        let mut entries = self.load_hydration_entries(date);
        let reversal = HydrationEntry::reversal_of(last_undoable(&entries)?, at);
        entries.push(reversal.clone());
        self.save_hydration_entries(date, entries);
        Some(reversal)
    }

    /// Empty the entry list for `date`
    pub fn reset_day(&self, date: NaiveDate) {
        debug!("Resetting entries for {}", date);
        self.save_hydration_entries(date, Vec::new());
    }

    /// Dates that have a stored entry list, oldest first
    pub fn entry_dates(&self) -> Vec<NaiveDate> {
        match self.try_entry_dates() {
            Ok(dates) => dates,
            Err(e) => {
                warn!("Failed to list entry dates: {}", e);
                Vec::new()
            }
        }
    }

    pub fn try_entry_dates(&self) -> Result<Vec<NaiveDate>, StorageError> {
        let mut dates: Vec<NaiveDate> = self
            .backend
            .keys_with_prefix(ENTRIES_PREFIX)?
            .iter()
            .filter_map(|k| match StoreKey::parse(k) {
                Some(StoreKey::Entries(date)) => Some(date),
                _ => None,
            })
            .collect();
        dates.sort();
        Ok(dates)
    }

    /// Most recent intake that has not been undone
    pub fn last_hydration_entry(&self) -> Option<HydrationEntry> {
        self.entry_dates().into_iter().rev().find_map(|date| {
            let entries = self.load_hydration_entries(date);
            effective_intakes(&entries).max_by_key(|e| e.timestamp).cloned()
        })
    }

    /// Write an entry list verbatim, without touching history
    pub fn try_save_entries_raw(&self, date: NaiveDate, entries: &[HydrationEntry]) -> Result<(), StorageError> {
        self.try_write_record(StoreKey::Entries(date), entries, || StoreEvent::EntriesChanged {
            date,
            entries: entries.to_vec(),
        })
        .map(|_| ())
    }

    /// Delete the entry list for `date`
    pub fn try_remove_entries(&self, date: NaiveDate) -> Result<(), StorageError> {
        let key = StoreKey::Entries(date).as_key();
        if self.backend.read(&key)?.is_none() {
            return Ok(());
        }
        self.backend.remove(&key)?;
        self.bus.publish(&StoreEvent::EntriesChanged {
            date,
            entries: Vec::new(),
        });
        Ok(())
    }

    // History

    /// History rows sorted oldest first, one per date
    pub fn load_history(&self) -> Vec<HydrationDay> {
        let mut history: Vec<HydrationDay> = self.read_record(StoreKey::History);
        normalize_history(&mut history);
        history
    }

    pub fn save_history(&self, mut history: Vec<HydrationDay>) {
        normalize_history(&mut history);
        self.write_record(StoreKey::History, &history, || StoreEvent::HistoryChanged(history.clone()));
    }

    pub fn try_save_history(&self, mut history: Vec<HydrationDay>) -> Result<(), StorageError> {
        normalize_history(&mut history);
        self.try_write_record(StoreKey::History, &history, || StoreEvent::HistoryChanged(history.clone()))
            .map(|_| ())
    }

    /// Upsert one history row
    ///
    /// This is also the historical-override path: it may set an amount that
    /// differs from the sum of the day's entries. A goal outside the daily
    /// goal range is rejected before anything is written.
    pub fn update_history_day(&self, date: NaiveDate, amount: i32, goal_at_the_time: u32) -> Result<(), DomainError> {
        let day = HydrationDay::new(date, amount, goal_at_the_time);
        day.validate()?;
        let mut history = self.load_history();
        upsert_day(&mut history, day);
        self.save_history(history);
        Ok(())
    }

    // Settings and profile

    pub fn load_user_settings(&self) -> UserSettings {
        self.read_record(StoreKey::UserSettings)
    }

    pub fn save_user_settings(&self, settings: UserSettings) {
        self.write_record(StoreKey::UserSettings, &settings, || {
            StoreEvent::UserSettingsChanged(settings.clone())
        });
    }

    pub fn try_save_user_settings(&self, settings: &UserSettings) -> Result<(), StorageError> {
        self.try_write_record(StoreKey::UserSettings, settings, || {
            StoreEvent::UserSettingsChanged(settings.clone())
        })
        .map(|_| ())
    }

    pub fn load_app_settings(&self) -> AppSettings {
        self.read_record(StoreKey::AppSettings)
    }

    pub fn save_app_settings(&self, settings: AppSettings) {
        self.write_record(StoreKey::AppSettings, &settings, || {
            StoreEvent::AppSettingsChanged(settings.clone())
        });
    }

    pub fn try_save_app_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        self.try_write_record(StoreKey::AppSettings, settings, || {
            StoreEvent::AppSettingsChanged(settings.clone())
        })
        .map(|_| ())
    }

    pub fn load_user_profile(&self) -> UserProfile {
        self.read_record(StoreKey::UserProfile)
    }

    pub fn save_user_profile(&self, profile: UserProfile) {
        self.write_record(StoreKey::UserProfile, &profile, || {
            StoreEvent::UserProfileChanged(profile.clone())
        });
    }

    pub fn try_save_user_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.try_write_record(StoreKey::UserProfile, profile, || {
            StoreEvent::UserProfileChanged(profile.clone())
        })
        .map(|_| ())
    }

    // Wipe

    /// Remove every record and notify `Topic::Cleared` subscribers
    pub fn clear_all(&self) {
        match self.backend.clear() {
            Ok(()) => self.bus.publish(&StoreEvent::Cleared),
            Err(e) => error!("Failed to clear store: {}", e),
        }
    }

    // Record plumbing

    fn read_record<T: DeserializeOwned + Default>(&self, key: StoreKey) -> T {
        match self.backend.read(&key.as_key()) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Record {} is corrupt ({}), using default", key, e);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                warn!("Failed to read record {} ({}), using default", key, e);
                T::default()
            }
        }
    }

    /// Persist `value` and publish if it differs from what is stored
    ///
    /// Returns whether anything changed.
    fn try_write_record<T, F>(&self, key: StoreKey, value: &T, event: F) -> Result<bool, StorageError>
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> StoreEvent,
    {
        let key_str = key.as_key();
        let text = serde_json::to_string(value)?;

        let unchanged = matches!(self.backend.read(&key_str), Ok(Some(ref existing)) if *existing == text);
        if unchanged {
            debug!("Record {} unchanged, skipping write", key);
            return Ok(false);
        }

        self.backend.write(&key_str, &text)?;
        self.bus.publish(&event());
        Ok(true)
    }

    fn write_record<T, F>(&self, key: StoreKey, value: &T, event: F)
    where
        T: Serialize + ?Sized,
        F: FnOnce() -> StoreEvent,
    {
        if let Err(e) = self.try_write_record(key, value, event) {
            error!("Failed to persist record {}: {}", key, e);
        }
    }
}
