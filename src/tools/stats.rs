/// Tool for statistics and achievements
///
/// This module implements the stats_get MCP tool.

use serde::Serialize;
use crate::analytics::{Achievement, AnalyticsEngine, UserStats};
use crate::storage::KeyValueBackend;
use crate::store::DataStore;
use crate::tools::ToolError;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: UserStats,
    pub achievements: Vec<Achievement>,
    pub message: String,
}

/// Compute stats over the stored history
pub fn get_stats<B: KeyValueBackend>(store: &DataStore<B>, engine: &AnalyticsEngine) -> Result<StatsResponse, ToolError> {
    let stats = engine.calculate_stats(&store.load_history());
    let achievements = engine.achievements(&stats);

    let unlocked: Vec<&str> = achievements.iter().filter(|a| a.unlocked).map(|a| a.title).collect();
    let mut message = format!(
        "📈 **Hydration Stats**\n- Days tracked: {}\n- Current streak: {} | Best: {}\n- Goals met: {} | Perfect days: {}\n- Total: {:.1} L | Avg completion: {}%",
        stats.total_days_tracked,
        stats.current_streak,
        stats.best_streak,
        stats.total_goals_achieved,
        stats.perfect_days,
        stats.total_water_consumed as f64 / 1000.0,
        stats.average_completion,
    );
    if !unlocked.is_empty() {
        message.push_str(&format!("\n\n🏆 Achievements: {}", unlocked.join(", ")));
    }

    Ok(StatsResponse {
        stats,
        achievements,
        message,
    })
}
