/// Analytics engine for hydration statistics and achievements
///
/// Everything here is a pure function of the history rows; nothing is
/// cached or persisted.

pub mod achievements;

pub use achievements::{Achievement, AchievementKind};

use serde::Serialize;
use crate::domain::HydrationDay;

/// What counts as a "perfect day"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerfectDayRule {
    /// Consumption exactly equals the goal
    #[default]
    ExactGoal,
    /// Consumption meets or exceeds the goal
    MeetsGoal,
}

impl PerfectDayRule {
    fn is_perfect(self, day: &HydrationDay) -> bool {
        if day.goal_at_the_time == 0 {
            return false;
        }
        let (amount, goal) = (i64::from(day.amount), i64::from(day.goal_at_the_time));
        match self {
            PerfectDayRule::ExactGoal => amount == goal,
            PerfectDayRule::MeetsGoal => amount >= goal,
        }
    }
}

/// Derived statistics over the whole history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_days_tracked: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Milliliters
    pub total_water_consumed: i64,
    pub perfect_days: u32,
    pub total_goals_achieved: u32,
    /// Percent, 0-100
    pub average_completion: u32,
}

/// Stateless calculator for `UserStats`
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    perfect_day_rule: PerfectDayRule,
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_perfect_day_rule(perfect_day_rule: PerfectDayRule) -> Self {
        Self { perfect_day_rule }
    }

    /// Compute statistics from history rows in any order
    ///
    /// Streaks are counted over consecutive calendar dates: a date with no
    /// row breaks a streak the same way a missed goal does.
    pub fn calculate_stats(&self, history: &[HydrationDay]) -> UserStats {
        if history.is_empty() {
            return UserStats::default();
        }

        // Newest first
        let mut days: Vec<&HydrationDay> = history.iter().collect();
        days.sort_by(|a, b| b.date.cmp(&a.date));

        let mut current_streak = 0;
        let mut current_open = true;
        let mut run = 0;
        let mut best_streak = 0;
        let mut previous: Option<&HydrationDay> = None;

        for &day in &days {
            let contiguous = previous.map_or(true, |p| (p.date - day.date).num_days() == 1);
            if !contiguous {
                run = 0;
                current_open = false;
            }

            if day.goal_met() {
                run += 1;
                best_streak = best_streak.max(run);
                if current_open {
                    current_streak = run;
                }
            } else {
                run = 0;
                current_open = false;
            }
            previous = Some(day);
        }

        let total_completion: f64 = days.iter().map(|d| completion_ratio(d)).sum();
        let average_completion = (total_completion / days.len() as f64 * 100.0).round() as u32;

        UserStats {
            total_days_tracked: days.len() as u32,
            current_streak,
            best_streak,
            total_water_consumed: days.iter().map(|d| d.amount.max(0) as i64).sum(),
            perfect_days: days.iter().filter(|d| self.perfect_day_rule.is_perfect(d)).count() as u32,
            total_goals_achieved: days.iter().filter(|d| d.goal_met()).count() as u32,
            average_completion,
        }
    }

    /// Achievements unlocked by `stats`
    pub fn achievements(&self, stats: &UserStats) -> Vec<Achievement> {
        achievements::evaluate(stats)
    }
}

/// `min(amount / goal, 1)`, with negative amounts and a zero goal counting as 0
fn completion_ratio(day: &HydrationDay) -> f64 {
    if day.goal_at_the_time == 0 {
        return 0.0;
    }
    (day.amount.max(0) as f64 / day.goal_at_the_time as f64).min(1.0)
}
