/// Tool for checking a day's progress
///
/// This module implements the hydration_today MCP tool.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{effective_intakes, total_amount, HydrationEntry};
use crate::storage::KeyValueBackend;
use crate::store::{local_today, DataStore};
use crate::tools::{date_or_today, plural, ToolError};

#[derive(Debug, Default, Deserialize)]
pub struct TodayParams {
    /// Day to report on (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub total_ml: i32,
    pub goal_ml: u32,
    pub remaining_ml: i32,
    /// Percent of the goal, not capped
    pub progress_percent: u32,
    pub entries: Vec<HydrationEntry>,
    pub message: String,
}

/// Progress for one day against the goal that applied to it
pub fn today_status<B: KeyValueBackend>(store: &DataStore<B>, params: TodayParams) -> Result<TodayResponse, ToolError> {
    let date = date_or_today(params.date.as_deref())?;
    let entries = store.load_hydration_entries(date);
    let total = total_amount(&entries);

    // Past days keep the goal recorded in history
    let goal = store
        .load_history()
        .into_iter()
        .find(|d| d.date == date)
        .map(|d| d.goal_at_the_time)
        .filter(|_| date != local_today())
        .unwrap_or_else(|| store.load_daily_goal().ml());

    let progress = if goal == 0 {
        0
    } else {
        (total.max(0) as f64 / goal as f64 * 100.0).round() as u32
    };
    let drinks = effective_intakes(&entries).count();

    let message = format!(
        "📊 {}: {} / {} ml ({}%) from {} drink{}{}",
        date,
        total,
        goal,
        progress,
        drinks,
        plural(drinks),
        if total >= goal as i32 { " ✅" } else { "" }
    );

    Ok(TodayResponse {
        date,
        total_ml: total,
        goal_ml: goal,
        remaining_ml: (goal as i32 - total).max(0),
        progress_percent: progress,
        entries,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyGoal, HydrationDay};
    use crate::storage::MemoryStorage;
    use crate::domain::EntrySource;

    #[test]
    fn test_today_progress() {
        let store = DataStore::new(MemoryStorage::new());
        store.save_daily_goal(DailyGoal::new(2000).unwrap());
        store.log_intake(500, EntrySource::Manual).unwrap();
        store.log_intake(500, EntrySource::Reminder).unwrap();

        let status = today_status(&store, TodayParams::default()).unwrap();
        assert_eq!(status.total_ml, 1000);
        assert_eq!(status.remaining_ml, 1000);
        assert_eq!(status.progress_percent, 50);
        assert!(status.message.contains("2 drinks"));
    }

    #[test]
    fn test_past_day_uses_recorded_goal() {
        let store = DataStore::new(MemoryStorage::new());
        store.save_daily_goal(DailyGoal::new(3000).unwrap());
        store.save_history(vec![HydrationDay::new(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), 0, 1500)]);

        let status = today_status(&store, TodayParams { date: Some("2026-01-05".into()) }).unwrap();
        assert_eq!(status.goal_ml, 1500);
        assert_eq!(status.progress_percent, 0);
    }
}
