/// Tool for changing the daily goal
///
/// This module implements the goal_set MCP tool.

use serde::{Deserialize, Serialize};
use crate::domain::{DailyGoal, DomainError};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;
use crate::tools::ToolError;

#[derive(Debug, Default, Deserialize)]
pub struct SetGoalParams {
    pub goal_ml: Option<i64>,
    /// Derive the goal from the stored profile's weight instead
    pub use_recommended: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SetGoalResponse {
    pub previous_ml: u32,
    pub goal_ml: u32,
    pub message: String,
}

/// Set the goal from an explicit value or the profile recommendation
pub fn set_goal<B: KeyValueBackend>(store: &DataStore<B>, params: SetGoalParams) -> Result<SetGoalResponse, ToolError> {
    let requested = if params.use_recommended.unwrap_or(false) {
        store.load_user_profile().recommended_goal_ml().map(i64::from).ok_or_else(|| {
            ToolError::Domain(DomainError::Validation {
                message: "Profile has no weight to base a recommendation on".to_string(),
            })
        })?
    } else {
        params
            .goal_ml
            .ok_or_else(|| ToolError::InvalidParams("goal_ml is required".to_string()))?
    };

    let goal = DailyGoal::new(requested)?;
    let previous = store.load_daily_goal();
    store.save_daily_goal(goal);

    Ok(SetGoalResponse {
        previous_ml: previous.ml(),
        goal_ml: goal.ml(),
        message: format!("🎯 Daily goal set to {} ml (was {} ml)", goal.ml(), previous.ml()),
    })
}
