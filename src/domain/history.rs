/// Daily history aggregate
///
/// One row per calendar date with the total consumed and the goal in force on
/// that day. Kept alongside the raw entries so charts and streaks scale with
/// the number of days instead of the number of drinks.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

use crate::domain::{DomainError, MAX_DAILY_GOAL_ML, MIN_DAILY_GOAL_ML};

/// Aggregated intake for a single local calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationDay {
    /// Local calendar date (unique within the history list)
    pub date: NaiveDate,
    /// Total consumed in milliliters
    pub amount: i32,
    /// Daily goal that applied when the day was recorded
    pub goal_at_the_time: u32,
}

impl HydrationDay {
    pub fn new(date: NaiveDate, amount: i32, goal_at_the_time: u32) -> Self {
        Self {
            date,
            amount,
            goal_at_the_time,
        }
    }

    /// Check that the recorded goal lies within the daily goal range
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(MIN_DAILY_GOAL_ML..=MAX_DAILY_GOAL_ML).contains(&self.goal_at_the_time) {
            return Err(DomainError::InvalidGoal(i64::from(self.goal_at_the_time)));
        }
        Ok(())
    }

    /// Whether the day's goal was met or exceeded
    ///
    /// A zero goal is never met.
    pub fn goal_met(&self) -> bool {
        self.goal_at_the_time > 0 && i64::from(self.amount) >= i64::from(self.goal_at_the_time)
    }
}

/// Insert or replace the row for `day.date`, keeping the list sorted oldest first
pub fn upsert_day(history: &mut Vec<HydrationDay>, day: HydrationDay) {
    match history.binary_search_by(|d| d.date.cmp(&day.date)) {
        Ok(index) => history[index] = day,
        Err(index) => history.insert(index, day),
    }
}

/// Sort rows oldest first and drop duplicate dates, keeping the last written row
pub fn normalize_history(history: &mut Vec<HydrationDay>) {
    // Stable sort keeps write order within a date, so the later duplicate wins.
    history.sort_by(|a, b| a.date.cmp(&b.date));
    let mut deduped: Vec<HydrationDay> = Vec::with_capacity(history.len());
    for day in history.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.date == day.date => *last = day,
            _ => deduped.push(day),
        }
    }
    *history = deduped;
}
