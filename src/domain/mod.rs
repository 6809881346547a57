/// Domain module containing the hydration data model
///
/// This module defines the records the store persists (goal, entries, daily
/// history, settings, profile) and their validation rules.

pub mod types;
pub mod entry;
pub mod history;
pub mod settings;

// Re-export public types for easy access
pub use types::*;
pub use entry::*;
pub use history::*;
pub use settings::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid daily goal: {0} ml (must be 1-10000)")]
    InvalidGoal(i64),

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid reminder interval: {0} minutes")]
    InvalidInterval(u32),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}
