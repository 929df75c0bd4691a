use std::collections::BTreeMap;
use std::fmt;

use crate::score_store::PlayerStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AchievementCategory {
    Collection,
    LevelProgression,
    Survival,
    Completion,
    Activity,
}

impl AchievementCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Collection => "Collection",
            Self::LevelProgression => "Level Progression",
            Self::Survival => "Survival",
            Self::Completion => "Completion",
            Self::Activity => "Activity",
        }
    }
}

pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: AchievementCategory,
    pub xp_reward: u64,
    check: fn(&PlayerStats) -> bool,
}

impl fmt::Debug for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("xp_reward", &self.xp_reward)
            .finish()
    }
}

impl Achievement {
    pub fn is_met(&self, stats: &PlayerStats) -> bool {
        (self.check)(stats)
    }
}

const fn achievement(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: AchievementCategory,
    xp_reward: u64,
    check: fn(&PlayerStats) -> bool,
) -> Achievement {
    Achievement {
        id,
        name,
        description,
        category,
        xp_reward,
        check,
    }
}

use self::AchievementCategory::{Activity, Collection, Completion, LevelProgression, Survival};

pub static ACHIEVEMENTS: [Achievement; 15] = [
    achievement("first_item", "First Collection", "Collect your first item", Collection, 50, |s| {
        s.items_collected >= 1
    }),
    achievement("collect_10", "Item Collector", "Collect 10 items", Collection, 100, |s| {
        s.items_collected >= 10
    }),
    achievement("collect_50", "Item Hoarder", "Collect 50 items", Collection, 250, |s| {
        s.items_collected >= 50
    }),
    achievement("collect_100", "Master Collector", "Collect 100 items", Collection, 500, |s| {
        s.items_collected >= 100
    }),
    achievement("level_3", "Level Explorer", "Reach level 3", LevelProgression, 150, |s| {
        s.highest_level >= 3
    }),
    achievement("level_5", "Level Master", "Reach level 5", LevelProgression, 200, |s| {
        s.highest_level >= 5
    }),
    achievement("level_10", "Level Champion", "Reach level 10", LevelProgression, 400, |s| {
        s.highest_level >= 10
    }),
    achievement(
        "zombie_survivor",
        "Zombie Survivor",
        "Complete a game without dying",
        Survival,
        150,
        |s| s.deaths == 0 && s.games_completed >= 1,
    ),
    achievement(
        "perfect_game",
        "Perfect Game",
        "Complete 3 games without dying",
        Survival,
        300,
        |s| s.deaths == 0 && s.games_completed >= 3,
    ),
    achievement("first_win", "First Victory", "Win your first level", Completion, 100, |s| {
        s.wins >= 1
    }),
    achievement("win_10", "Victory Master", "Win 10 levels", Completion, 300, |s| s.wins >= 10),
    achievement(
        "complete_5_levels",
        "Level Completer",
        "Complete 5 levels",
        Completion,
        200,
        |s| s.levels_completed >= 5,
    ),
    achievement(
        "complete_20_levels",
        "Level Expert",
        "Complete 20 levels",
        Completion,
        400,
        |s| s.levels_completed >= 20,
    ),
    achievement("play_5_games", "Dedicated Player", "Play 5 games", Activity, 100, |s| {
        s.games_played >= 5
    }),
    achievement("play_20_games", "Veteran Player", "Play 20 games", Activity, 300, |s| {
        s.games_played >= 20
    }),
];

/// Achievements whose condition holds and that are not yet in `unlocked`, in table order.
pub fn evaluate(stats: &PlayerStats, unlocked: &[String]) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|entry| !unlocked.iter().any(|id| id == entry.id))
        .filter(|entry| entry.is_met(stats))
        .collect()
}

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|entry| entry.id == id)
}

pub fn by_category() -> BTreeMap<AchievementCategory, Vec<&'static str>> {
    let mut grouped: BTreeMap<AchievementCategory, Vec<&'static str>> = BTreeMap::new();
    for entry in &ACHIEVEMENTS {
        grouped.entry(entry.category).or_default().push(entry.id);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(found: &[&'static Achievement]) -> Vec<&'static str> {
        found.iter().map(|entry| entry.id).collect()
    }

    #[test]
    fn fresh_player_unlocks_nothing() {
        assert!(evaluate(&PlayerStats::default(), &[]).is_empty());
    }

    #[test]
    fn thresholds_unlock_in_table_order() {
        let stats = PlayerStats {
            items_collected: 12,
            highest_level: 3,
            wins: 1,
            ..PlayerStats::default()
        };
        assert_eq!(
            ids(&evaluate(&stats, &[])),
            vec!["first_item", "collect_10", "level_3", "first_win"]
        );
    }

    #[test]
    fn already_unlocked_entries_are_skipped() {
        let stats = PlayerStats {
            items_collected: 1,
            ..PlayerStats::default()
        };
        assert!(evaluate(&stats, &["first_item".to_string()]).is_empty());
    }

    #[test]
    fn survival_requires_no_deaths() {
        let mut stats = PlayerStats {
            games_completed: 3,
            ..PlayerStats::default()
        };
        assert_eq!(
            ids(&evaluate(&stats, &[])),
            vec!["zombie_survivor", "perfect_game"]
        );
        stats.deaths = 1;
        assert!(evaluate(&stats, &[]).is_empty());
    }

    #[test]
    fn lookup_and_grouping_cover_the_table() {
        assert_eq!(find("win_10").map(|entry| entry.xp_reward), Some(300));
        assert!(find("unknown").is_none());

        let grouped = by_category();
        assert_eq!(grouped.values().map(Vec::len).sum::<usize>(), ACHIEVEMENTS.len());
        assert_eq!(
            grouped.get(&AchievementCategory::Survival),
            Some(&vec!["zombie_survivor", "perfect_game"])
        );
        assert_eq!(AchievementCategory::LevelProgression.label(), "Level Progression");
    }
}
