/// Tools for logging and correcting water intake
///
/// This module implements the hydration_log, hydration_undo and
/// hydration_reset_day MCP tools.

use serde::{Deserialize, Serialize};
use chrono::Utc;
use crate::domain::{total_amount, EntrySource, HydrationEntry};
use crate::storage::KeyValueBackend;
use crate::store::{local_today, DataStore};
use crate::tools::{date_or_today, plural, ToolError};

/// Parameters for logging a drink
#[derive(Debug, Deserialize)]
pub struct LogIntakeParams {
    pub amount_ml: i32,
    /// "manual" (default) or "reminder"
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogIntakeResponse {
    pub entry: HydrationEntry,
    pub total_today_ml: i32,
    pub goal_ml: u32,
    pub message: String,
}

/// Log a drink happening now
pub fn log_intake<B: KeyValueBackend>(
    store: &DataStore<B>,
    params: LogIntakeParams,
) -> Result<LogIntakeResponse, ToolError> {
    let source = match params.source.as_deref() {
        Some(s) => EntrySource::parse(s)?,
        None => EntrySource::Manual,
    };

    let entry = store.log_intake(params.amount_ml, source)?;
    let total = total_amount(&store.load_hydration_entries(local_today()));
    let goal = store.load_daily_goal().ml();

    let message = if total >= goal as i32 {
        format!("💧 Logged {} ml. Goal reached: {} / {} ml", entry.amount, total, goal)
    } else {
        format!("💧 Logged {} ml. {} / {} ml today, {} ml to go", entry.amount, total, goal, goal as i32 - total)
    };

    Ok(LogIntakeResponse {
        entry,
        total_today_ml: total,
        goal_ml: goal,
        message,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct UndoParams {
    /// Day to undo on (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UndoResponse {
    pub reversal: Option<HydrationEntry>,
    pub total_ml: i32,
    pub message: String,
}

/// Cancel the latest drink on a day
pub fn undo_last<B: KeyValueBackend>(store: &DataStore<B>, params: UndoParams) -> Result<UndoResponse, ToolError> {
    let date = date_or_today(params.date.as_deref())?;
    let reversal = store.undo_last_entry(date, Utc::now());
    let total = total_amount(&store.load_hydration_entries(date));

    let message = match &reversal {
        Some(r) => format!("↩️ Undid {} ml on {}. Total is now {} ml", -r.amount, date, total),
        None => format!("Nothing to undo on {}", date),
    };

    Ok(UndoResponse {
        reversal,
        total_ml: total,
        message,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetDayParams {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetDayResponse {
    pub removed_entries: usize,
    pub message: String,
}

/// Clear every entry on a day
pub fn reset_day<B: KeyValueBackend>(store: &DataStore<B>, params: ResetDayParams) -> Result<ResetDayResponse, ToolError> {
    let date = date_or_today(params.date.as_deref())?;
    let removed = store.load_hydration_entries(date).len();
    store.reset_day(date);

    Ok(ResetDayResponse {
        removed_entries: removed,
        message: format!("🧹 Cleared {} drink{} for {}", removed, plural(removed), date),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn log(store: &DataStore<MemoryStorage>, amount: i32) -> Result<LogIntakeResponse, ToolError> {
        log_intake(store, LogIntakeParams { amount_ml: amount, source: None })
    }

    #[test]
    fn test_log_then_undo() {
        let store = DataStore::new(MemoryStorage::new());
        log(&store, 300).unwrap();
        let second = log(&store, 200).unwrap();
        assert_eq!(second.total_today_ml, 500);
        assert!(second.message.contains("1500 ml to go"));

        let undo = undo_last(&store, UndoParams::default()).unwrap();
        assert_eq!(undo.reversal.unwrap().amount, -200);
        assert_eq!(undo.total_ml, 300);
    }

    #[test]
    fn test_log_rejects_bad_input() {
        let store = DataStore::new(MemoryStorage::new());
        assert!(matches!(log(&store, 0), Err(ToolError::Domain(_))));
        assert!(matches!(
            log_intake(&store, LogIntakeParams { amount_ml: 250, source: Some("telepathy".into()) }),
            Err(ToolError::Domain(_))
        ));
        assert!(store.load_hydration_entries(local_today()).is_empty());
    }

    #[test]
    fn test_undo_on_empty_day() {
        let store = DataStore::new(MemoryStorage::new());
        let undo = undo_last(&store, UndoParams { date: Some("2026-01-01".into()) }).unwrap();
        assert!(undo.reversal.is_none());
    }

    #[test]
    fn test_reset_day() {
        let store = DataStore::new(MemoryStorage::new());
        log(&store, 250).unwrap();
        log(&store, 250).unwrap();
        let reset = reset_day(&store, ResetDayParams::default()).unwrap();
        assert_eq!(reset.removed_entries, 2);
        assert!(reset.message.contains("Cleared 2 drinks"));
        assert!(store.load_hydration_entries(local_today()).is_empty());
        assert_eq!(store.load_history()[0].amount, 0);

        log(&store, 250).unwrap();
        let single = reset_day(&store, ResetDayParams::default()).unwrap();
        assert!(single.message.contains("Cleared 1 drink for"));
    }
}
