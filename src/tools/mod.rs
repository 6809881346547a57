/// MCP tools for hydration tracking
///
/// This module contains all the MCP tools that external clients can call to
/// interact with the hydration tracker. Each tool takes a deserialized
/// parameter struct and the components it needs, and returns a response whose
/// `message` is shown to the client.

pub mod log;
pub mod status;
pub mod goal;
pub mod stats;
pub mod settings;
pub mod backup;
pub mod reminders;
pub mod flags;

// Re-export tool functions for easy access
pub use log::*;
pub use status::*;
pub use goal::*;
pub use stats::*;
pub use settings::*;
pub use backup::*;
pub use reminders::*;
pub use flags::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::backup::BackupError;
use crate::domain::DomainError;
use crate::flags::FlagError;
use crate::reminders::SchedulerError;
use crate::storage::StorageError;
use crate::store::local_today;

/// Errors a tool call can report back to the client
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to today
pub(crate) fn date_or_today(date: Option<&str>) -> Result<NaiveDate, ToolError> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ToolError::Domain(DomainError::InvalidDate(s.to_string()))),
        None => Ok(local_today()),
    }
}

pub(crate) fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
