/// Gamified achievements derived from `UserStats`
///
/// Achievements are recomputed from the stats on every request, so they can
/// never drift from the data they describe.

use serde::Serialize;
use crate::analytics::UserStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstSip,
    ThreeDayStreak,
    WeekStreak,
    MonthStreak,
    TenPerfectDays,
    HundredLitres,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 6] = [
        AchievementKind::FirstSip,
        AchievementKind::ThreeDayStreak,
        AchievementKind::WeekStreak,
        AchievementKind::MonthStreak,
        AchievementKind::TenPerfectDays,
        AchievementKind::HundredLitres,
    ];

    pub fn title(self) -> &'static str {
        match self {
            AchievementKind::FirstSip => "First Sip",
            AchievementKind::ThreeDayStreak => "Getting Into the Flow",
            AchievementKind::WeekStreak => "Week of Water",
            AchievementKind::MonthStreak => "Hydration Habit",
            AchievementKind::TenPerfectDays => "Bullseye",
            AchievementKind::HundredLitres => "Reservoir",
        }
    }

    fn unlocked(self, stats: &UserStats) -> bool {
        match self {
            AchievementKind::FirstSip => stats.total_water_consumed > 0,
            AchievementKind::ThreeDayStreak => stats.best_streak >= 3,
            AchievementKind::WeekStreak => stats.best_streak >= 7,
            AchievementKind::MonthStreak => stats.best_streak >= 30,
            AchievementKind::TenPerfectDays => stats.perfect_days >= 10,
            AchievementKind::HundredLitres => stats.total_water_consumed >= 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: &'static str,
    pub unlocked: bool,
}

/// Every achievement with its unlock state
pub fn evaluate(stats: &UserStats) -> Vec<Achievement> {
    AchievementKind::ALL
        .into_iter()
        .map(|kind| Achievement {
            kind,
            title: kind.title(),
            unlocked: kind.unlocked(stats),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_unlocked_for_new_user() {
        assert!(evaluate(&UserStats::default()).iter().all(|a| !a.unlocked));
    }

    #[test]
    fn test_streak_thresholds() {
        let stats = UserStats {
            best_streak: 7,
            total_water_consumed: 14_000,
            ..Default::default()
        };
        let unlocked: Vec<AchievementKind> =
            evaluate(&stats).into_iter().filter(|a| a.unlocked).map(|a| a.kind).collect();
        assert_eq!(
            unlocked,
            vec![AchievementKind::FirstSip, AchievementKind::ThreeDayStreak, AchievementKind::WeekStreak]
        );
    }
}
