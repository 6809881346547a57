/// Backup export and restore
///
/// A backup is one JSON document holding every record the store manages plus
/// the critical flags, tagged with a format version. Restoring validates the
/// whole document before the first write, then replaces every managed key in
/// a fixed order.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{AppSettings, DailyGoal, HydrationDay, HydrationEntry, UserProfile, UserSettings};
use crate::flags::{CriticalFlag, FlagBackend, FlagStore};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;

/// Format version written by this build
pub const BACKUP_FORMAT_VERSION: u64 = 1;

/// Top-level fields a document must carry to be considered a backup
const REQUIRED_FIELDS: [&str; 4] = ["version", "dailyGoal", "entries", "history"];

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Backup is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Backup has an invalid shape: {0}")]
    InvalidShape(String),

    #[error("Unsupported backup version {found} (this build reads 1-{supported})")]
    UnsupportedVersion { found: u64, supported: u64 },

    #[error("Backup content is invalid: {0}")]
    InvalidContent(String),

    #[error("Failed to serialize backup: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Restore stopped while writing {step}; store is partially restored: {message}")]
    PartialRestore { step: String, message: String },
}

/// The portable snapshot of all persisted state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub daily_goal: DailyGoal,
    #[serde(default)]
    pub user_settings: UserSettings,
    #[serde(default)]
    pub app_settings: AppSettings,
    #[serde(default)]
    pub user_profile: UserProfile,
    /// Entry lists keyed by `YYYY-MM-DD`
    pub entries: BTreeMap<String, Vec<HydrationEntry>>,
    pub history: Vec<HydrationDay>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

/// Counts reported after a successful restore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub days: usize,
    pub entries: usize,
    pub flags: usize,
}

/// Collect the current store and flags into a snapshot
pub async fn build_snapshot<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
) -> BackupSnapshot {
    let entries = store
        .entry_dates()
        .into_iter()
        .map(|date| (date_key(date), store.load_hydration_entries(date)))
        .collect();

    BackupSnapshot {
        version: BACKUP_FORMAT_VERSION,
        created_at: Some(Utc::now()),
        daily_goal: store.load_daily_goal(),
        user_settings: store.load_user_settings(),
        app_settings: store.load_app_settings(),
        user_profile: store.load_user_profile(),
        entries,
        history: store.load_history(),
        flags: flags.snapshot().await,
    }
}

/// Serialize the whole store into a backup document
pub async fn create_backup<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
) -> Result<String, BackupError> {
    let snapshot = build_snapshot(store, flags).await;
    let text = serde_json::to_string_pretty(&snapshot).map_err(BackupError::Serialization)?;
    info!(
        "Created backup with {} day(s) of entries and {} history row(s)",
        snapshot.entries.len(),
        snapshot.history.len()
    );
    Ok(text)
}

/// Parse and validate a backup document without touching any store
pub fn parse_backup(text: &str) -> Result<BackupSnapshot, BackupError> {
    let value: Value = serde_json::from_str(text).map_err(BackupError::Parse)?;

    let object = value
        .as_object()
        .ok_or_else(|| BackupError::InvalidShape("document is not a JSON object".to_string()))?;
    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(BackupError::InvalidShape(format!("missing field '{}'", field)));
        }
    }

    let version = object
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| BackupError::InvalidShape("'version' must be a positive integer".to_string()))?;
    if version == 0 || version > BACKUP_FORMAT_VERSION {
        return Err(BackupError::UnsupportedVersion {
            found: version,
            supported: BACKUP_FORMAT_VERSION,
        });
    }
    if !object.get("entries").is_some_and(Value::is_object) {
        return Err(BackupError::InvalidShape("'entries' must be an object".to_string()));
    }
    if !object.get("history").is_some_and(Value::is_array) {
        return Err(BackupError::InvalidShape("'history' must be an array".to_string()));
    }

    let snapshot: BackupSnapshot =
        serde_json::from_value(value).map_err(|e| BackupError::InvalidContent(e.to_string()))?;
    validate_content(&snapshot)?;
    Ok(snapshot)
}

fn validate_content(snapshot: &BackupSnapshot) -> Result<(), BackupError> {
    for key in snapshot.entries.keys() {
        parse_date_key(key)?;
    }

    let mut dates: Vec<NaiveDate> = snapshot.history.iter().map(|d| d.date).collect();
    dates.sort();
    if let Some(pair) = dates.windows(2).find(|w| w[0] == w[1]) {
        return Err(BackupError::InvalidContent(format!(
            "history contains {} more than once",
            pair[0]
        )));
    }
    for day in &snapshot.history {
        day.validate()
            .map_err(|e| BackupError::InvalidContent(format!("history row {}: {}", day.date, e)))?;
    }

    snapshot
        .user_settings
        .validate()
        .map_err(|e| BackupError::InvalidContent(e.to_string()))
}

/// Replace the store and flags with the contents of `text`
///
/// Any parse or validation failure returns before the first write. A
/// failure during the writes is returned as `PartialRestore`.
pub async fn restore_backup<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
    text: &str,
) -> Result<RestoreSummary, BackupError> {
    let snapshot = parse_backup(text)?;
    let summary = apply_snapshot(store, flags, &snapshot).await.map_err(|e| {
        error!("Backup restore failed mid-write: {}", e);
        e
    })?;

    info!(
        "Restored backup: {} day(s), {} entries, {} flag(s)",
        summary.days, summary.entries, summary.flags
    );
    Ok(summary)
}

async fn apply_snapshot<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
    snapshot: &BackupSnapshot,
) -> Result<RestoreSummary, BackupError> {
    store
        .try_save_daily_goal(snapshot.daily_goal)
        .map_err(|e| partial("daily goal", e))?;
    store
        .try_save_user_settings(&snapshot.user_settings)
        .map_err(|e| partial("user settings", e))?;
    store
        .try_save_app_settings(&snapshot.app_settings)
        .map_err(|e| partial("app settings", e))?;
    store
        .try_save_user_profile(&snapshot.user_profile)
        .map_err(|e| partial("user profile", e))?;
    store
        .try_save_history(snapshot.history.clone())
        .map_err(|e| partial("history", e))?;

    // BTreeMap iteration keeps dates ascending
    let mut restored_dates = Vec::with_capacity(snapshot.entries.len());
    let mut entry_count = 0;
    for (key, entries) in &snapshot.entries {
        let date = parse_date_key(key)?;
        store
            .try_save_entries_raw(date, entries)
            .map_err(|e| partial(&format!("entries for {}", key), e))?;
        restored_dates.push(date);
        entry_count += entries.len();
    }

    let existing = store.try_entry_dates().map_err(|e| partial("entry index", e))?;
    for date in existing.into_iter().filter(|d| !restored_dates.contains(d)) {
        store
            .try_remove_entries(date)
            .map_err(|e| partial(&format!("stale entries for {}", date), e))?;
    }

    for key in snapshot.flags.keys().filter(|k| CriticalFlag::parse(k).is_err()) {
        warn!("Skipping unknown flag '{}' in backup", key);
    }
    // Flags missing from the document reset to false
    for flag in CriticalFlag::ALL {
        let value = snapshot.flags.get(flag.key()).copied().unwrap_or(false);
        flags
            .set_flag(flag, value)
            .await
            .map_err(|e| partial(&format!("flag {}", flag.key()), e))?;
    }
    let flag_count = CriticalFlag::ALL.len();

    Ok(RestoreSummary {
        days: snapshot.history.len(),
        entries: entry_count,
        flags: flag_count,
    })
}

fn partial(step: &str, error: impl std::fmt::Display) -> BackupError {
    BackupError::PartialRestore {
        step: step.to_string(),
        message: error.to_string(),
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date_key(key: &str) -> Result<NaiveDate, BackupError> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|_| BackupError::InvalidContent(format!("'{}' is not a YYYY-MM-DD date", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntrySource;
    use crate::flags::SqliteFlagBackend;
    use crate::retry::RetryPolicy;
    use crate::storage::MemoryStorage;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    fn flag_store() -> FlagStore<SqliteFlagBackend> {
        FlagStore::with_policy(SqliteFlagBackend::in_memory().unwrap(), RetryPolicy::default().without_delay())
    }

    fn entry(amount: i32) -> HydrationEntry {
        HydrationEntry::new(amount, EntrySource::Manual, Utc::now()).unwrap()
    }

    async fn populated() -> (DataStore<MemoryStorage>, FlagStore<SqliteFlagBackend>) {
        let store = DataStore::new(MemoryStorage::new());
        store.save_daily_goal(DailyGoal::new(2200).unwrap());
        store.add_hydration_entry(date(1), entry(500));
        store.add_hydration_entry(date(2), entry(2200));
        store.update_history_day(date(3), 1500, 2200).unwrap();
        let mut settings = UserSettings::default();
        settings.reminder_interval_minutes = 45;
        store.save_user_settings(settings);

        let flags = flag_store();
        flags.set_flag(CriticalFlag::OnboardingCompleted, true).await.unwrap();
        (store, flags)
    }

    #[tokio::test]
    async fn test_round_trip_is_lossless_and_idempotent() {
        let (store, flags) = populated().await;
        let text = create_backup(&store, &flags).await.unwrap();

        let target = DataStore::new(MemoryStorage::new());
        let target_flags = flag_store();
        restore_backup(&target, &target_flags, &text).await.unwrap();
        restore_backup(&target, &target_flags, &text).await.unwrap();

        let original = build_snapshot(&store, &flags).await;
        let restored = build_snapshot(&target, &target_flags).await;
        assert_eq!(BackupSnapshot { created_at: None, ..restored }, BackupSnapshot { created_at: None, ..original });
    }

    #[tokio::test]
    async fn test_restore_removes_dates_not_in_backup() {
        let (store, flags) = populated().await;
        let text = create_backup(&store, &flags).await.unwrap();

        store.add_hydration_entry(date(9), entry(100));
        restore_backup(&store, &flags, &text).await.unwrap();
        assert_eq!(store.entry_dates(), vec![date(1), date(2)]);
    }

    #[tokio::test]
    async fn test_invalid_documents_touch_nothing() {
        let (store, flags) = populated().await;
        let before = build_snapshot(&store, &flags).await;

        let cases = [
            ("not json", "Parse"),
            ("[1, 2]", "InvalidShape"),
            (r#"{"version": 1, "dailyGoal": 2000, "entries": {}}"#, "InvalidShape"),
            (r#"{"version": 99, "dailyGoal": 2000, "entries": {}, "history": []}"#, "UnsupportedVersion"),
            (r#"{"version": 1, "dailyGoal": 0, "entries": {}, "history": []}"#, "InvalidContent"),
            (r#"{"version": 1, "dailyGoal": 2000, "entries": {"yesterday": []}, "history": []}"#, "InvalidContent"),
            (
                r#"{"version": 1, "dailyGoal": 2000, "entries": {}, "history": [
                    {"date": "2026-06-01", "amount": 1, "goalAtTheTime": 2000},
                    {"date": "2026-06-01", "amount": 2, "goalAtTheTime": 2000}]}"#,
                "InvalidContent",
            ),
            (
                r#"{"version": 1, "dailyGoal": 2000, "entries": {}, "history": [
                    {"date": "2026-06-01", "amount": 0, "goalAtTheTime": 0}]}"#,
                "InvalidContent",
            ),
            (
                r#"{"version": 1, "dailyGoal": 2000, "entries": {}, "history": [
                    {"date": "2026-06-01", "amount": 0, "goalAtTheTime": 3000000000}]}"#,
                "InvalidContent",
            ),
        ];

        for (text, expected) in cases {
            let err = restore_backup(&store, &flags, text).await.unwrap_err();
            let kind = match err {
                BackupError::Parse(_) => "Parse",
                BackupError::InvalidShape(_) => "InvalidShape",
                BackupError::UnsupportedVersion { .. } => "UnsupportedVersion",
                BackupError::InvalidContent(_) => "InvalidContent",
                other => panic!("unexpected error {:?}", other),
            };
            assert_eq!(kind, expected, "document: {}", text);
        }

        let after = build_snapshot(&store, &flags).await;
        assert_eq!(BackupSnapshot { created_at: None, ..after }, BackupSnapshot { created_at: None, ..before });
    }

    #[tokio::test]
    async fn test_minimal_document_fills_defaults() {
        let store = DataStore::new(MemoryStorage::new());
        let text = r#"{"version": 1, "dailyGoal": 1800, "entries": {}, "history": [], "futureField": true}"#;
        let summary = restore_backup(&store, &flag_store(), text).await.unwrap();

        assert_eq!(summary, RestoreSummary { days: 0, entries: 0, flags: CriticalFlag::ALL.len() });
        assert_eq!(store.load_daily_goal().ml(), 1800);
        assert_eq!(store.load_user_settings(), UserSettings::default());
    }

    #[tokio::test]
    async fn test_restore_resets_flags_missing_from_document() {
        let (store, flags) = populated().await;
        flags.set_flag(CriticalFlag::GoalSetupCompleted, true).await.unwrap();

        let text = r#"{"version": 1, "dailyGoal": 1800, "entries": {}, "history": [],
            "flags": {"goal_setup_completed": true}}"#;
        restore_backup(&store, &flags, text).await.unwrap();
        assert!(!flags.get_flag(CriticalFlag::OnboardingCompleted).await);
        assert!(flags.get_flag(CriticalFlag::GoalSetupCompleted).await);

        let bare = r#"{"version": 1, "dailyGoal": 1800, "entries": {}, "history": []}"#;
        restore_backup(&store, &flags, bare).await.unwrap();
        for flag in CriticalFlag::ALL {
            assert!(!flags.get_flag(flag).await, "{} should be reset", flag.key());
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_as_partial() {
        let (source, source_flags) = populated().await;
        let text = create_backup(&source, &source_flags).await.unwrap();

        let target = DataStore::new(MemoryStorage::new());
        target.backend().fail_writes_after(2);
        let err = restore_backup(&target, &flag_store(), &text).await.unwrap_err();

        match err {
            BackupError::PartialRestore { step, .. } => assert_eq!(step, "app settings"),
            other => panic!("expected partial restore, got {:?}", other),
        }
    }
}
