/// HydrationEntry entity for tracking water intake
///
/// This module defines the HydrationEntry struct that represents a single
/// logged drink, or the reversal of one when the user undoes it.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{DomainError, EntryId, EntrySource};

/// Largest single drink the store accepts, in milliliters
pub const MAX_ENTRY_ML: i32 = 5_000;

/// A record of drinking (or un-drinking) water at a point in time
///
/// Entries are append-only. An undo does not remove the original entry; it
/// appends a reversal with the negated amount whose `reverses` field names the
/// cancelled entry, so replaying the list always reproduces the day's total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationEntry {
    /// Unique identifier for this entry
    #[serde(default)]
    pub id: EntryId,
    /// When the intake happened
    pub timestamp: DateTime<Utc>,
    /// Amount in milliliters (negative for a reversal)
    pub amount: i32,
    /// How the entry was logged
    #[serde(default)]
    pub source: EntrySource,
    /// The entry this one cancels, if it is an undo reversal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses: Option<EntryId>,
}

impl HydrationEntry {
    /// Create a new intake entry with validation
    pub fn new(
        amount: i32,
        source: EntrySource,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::validate_amount(amount)?;

        Ok(Self {
            id: EntryId::new(),
            timestamp,
            amount,
            source,
            reverses: None,
        })
    }

    /// Create the reversal that cancels `original`
    pub fn reversal_of(original: &HydrationEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            timestamp,
            amount: -original.amount,
            source: original.source,
            reverses: Some(original.id),
        }
    }

    /// Whether this entry is an undo reversal
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    /// Validate an intake amount (reversals are built internally and skip this)
    fn validate_amount(amount: i32) -> Result<(), DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidAmount {
                message: "Intake must be a positive number of milliliters".to_string(),
            });
        }
        if amount > MAX_ENTRY_ML {
            return Err(DomainError::InvalidAmount {
                message: format!("A single entry cannot exceed {} ml", MAX_ENTRY_ML),
            });
        }
        Ok(())
    }
}

/// Sum of a day's entries, reversals included
pub fn total_amount(entries: &[HydrationEntry]) -> i32 {
    entries.iter().map(|e| e.amount).sum()
}

/// The most recent entry that has not been reversed yet
///
/// Reversals themselves are never candidates, so undoing twice walks back
/// through the day one drink at a time.
pub fn last_undoable(entries: &[HydrationEntry]) -> Option<&HydrationEntry> {
    effective_intakes(entries).last()
}

/// Intake entries that are neither reversals nor reversed, in list order
pub fn effective_intakes(entries: &[HydrationEntry]) -> impl Iterator<Item = &HydrationEntry> + '_ {
    entries
        .iter()
        .filter(|e| !e.is_reversal())
        .filter(move |e| !entries.iter().any(|r| r.reverses == Some(e.id)))
}
