/// Basic unit tests to verify core functionality through the public API
use hydration_tracker::backup::parse_backup;
use hydration_tracker::*;
use chrono::{NaiveDate, NaiveTime, Utc};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
}

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    #[test]
    fn test_goal_bounds() {
        assert!(DailyGoal::new(1).is_ok());
        assert!(DailyGoal::new(10_000).is_ok());
        assert!(DailyGoal::new(0).is_err());
        assert!(DailyGoal::new(10_001).is_err());
    }

    #[test]
    fn test_entry_creation() {
        let entry = HydrationEntry::new(250, EntrySource::Manual, Utc::now()).unwrap();
        assert_eq!(entry.amount, 250);
        assert!(!entry.is_reversal());
        assert!(HydrationEntry::new(-250, EntrySource::Manual, Utc::now()).is_err());
    }

    #[test]
    fn test_quiet_hours_overnight() {
        let quiet = QuietHours::new(
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        );
        assert!(quiet.contains(NaiveTime::from_hms_opt(0, 30, 0).unwrap()));
        assert!(!quiet.contains(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
    }

    #[test]
    fn test_streaks_from_store_history() {
        let store = DataStore::new(MemoryStorage::new());
        for (i, amount) in [2000, 2000, 1000, 2000].into_iter().enumerate() {
            store.update_history_day(day(i as u32 + 1), amount, 2000).unwrap();
        }

        let stats = AnalyticsEngine::new().calculate_stats(&store.load_history());
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.total_water_consumed, 7000);
    }

    #[test]
    fn test_subscription_sees_entry_changes() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let store = DataStore::new(MemoryStorage::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let subscription = store.subscribe(Topic::Entries, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.log_intake(300, EntrySource::Manual).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(subscription.unsubscribe());
        store.log_intake(300, EntrySource::Manual).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backup_validation_errors() {
        assert!(matches!(parse_backup("not json"), Err(BackupError::Parse(_))));
        assert!(matches!(parse_backup("[]"), Err(BackupError::InvalidShape(_))));
        assert!(matches!(
            parse_backup(r#"{"version": 99, "dailyGoal": 2000, "entries": {}, "history": []}"#),
            Err(BackupError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_critical_flag_names() {
        for flag in CriticalFlag::ALL {
            assert_eq!(CriticalFlag::parse(flag.key()).unwrap(), flag);
        }
        assert!(CriticalFlag::parse("unknown").is_err());
    }

    #[test]
    fn test_sqlite_storage_creation() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = SqliteStorage::new(dir.path().join("records.db"));
        assert!(storage.is_ok());
    }
}
