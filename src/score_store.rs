use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::achievements;
use crate::store_io::{installation_file, read_json, write_json_atomic, StoreError};
use crate::types::{LevelOutcome, LevelSummary};

const SCORE_FILE_VERSION: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatName {
    GamesPlayed,
    GamesCompleted,
    Wins,
    LevelsCompleted,
    HighestLevel,
    ItemsCollected,
    Deaths,
    Xp,
}

impl StatName {
    pub const ALL: [StatName; 8] = [
        StatName::GamesPlayed,
        StatName::GamesCompleted,
        StatName::Wins,
        StatName::LevelsCompleted,
        StatName::HighestLevel,
        StatName::ItemsCollected,
        StatName::Deaths,
        StatName::Xp,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stat| stat.key() == value.trim())
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::GamesPlayed => "games_played",
            Self::GamesCompleted => "games_completed",
            Self::Wins => "wins",
            Self::LevelsCompleted => "levels_completed",
            Self::HighestLevel => "highest_level",
            Self::ItemsCollected => "items_collected",
            Self::Deaths => "deaths",
            Self::Xp => "xp",
        }
    }

    pub fn value(self, stats: &PlayerStats) -> u64 {
        match self {
            Self::GamesPlayed => stats.games_played,
            Self::GamesCompleted => stats.games_completed,
            Self::Wins => stats.wins,
            Self::LevelsCompleted => stats.levels_completed,
            Self::HighestLevel => stats.highest_level,
            Self::ItemsCollected => stats.items_collected,
            Self::Deaths => stats.deaths,
            Self::Xp => stats.xp,
        }
    }

    fn slot(self, stats: &mut PlayerStats) -> &mut u64 {
        match self {
            Self::GamesPlayed => &mut stats.games_played,
            Self::GamesCompleted => &mut stats.games_completed,
            Self::Wins => &mut stats.wins,
            Self::LevelsCompleted => &mut stats.levels_completed,
            Self::HighestLevel => &mut stats.highest_level,
            Self::ItemsCollected => &mut stats.items_collected,
            Self::Deaths => &mut stats.deaths,
            Self::Xp => &mut stats.xp,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub games_played: u64,
    pub games_completed: u64,
    pub wins: u64,
    pub levels_completed: u64,
    pub highest_level: u64,
    pub items_collected: u64,
    pub deaths: u64,
    pub xp: u64,
    pub achievements: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredPlayer {
    #[serde(rename = "playerId", alias = "player_id")]
    player_id: String,
    #[serde(flatten)]
    stats: PlayerStats,
}

#[derive(Clone, Debug, Serialize)]
struct ScoreFile<'a> {
    version: u8,
    players: &'a [StoredPlayer],
}

#[derive(Clone, Debug, Deserialize)]
struct ScoreFileRaw {
    version: u8,
    #[serde(default)]
    players: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AchievementUnlock {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "achievementId")]
    pub achievement_id: &'static str,
    #[serde(rename = "xpReward")]
    pub xp_reward: u64,
}

/// Per-installation player counters, one JSON file per installation.
pub struct ScoreStore {
    dir: PathBuf,
}

impl ScoreStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn stats(&self, installation: &str, player_id: &str) -> PlayerStats {
        self.load(installation)
            .into_iter()
            .find(|entry| entry.player_id == player_id)
            .map(|entry| entry.stats)
            .unwrap_or_default()
    }

    pub fn increment(&self, installation: &str, player_id: &str, stat: StatName, amount: u64) -> bool {
        let Some(mut players) = self.load_for_update(installation) else {
            return false;
        };
        let slot = stat.slot(entry_mut(&mut players, player_id));
        *slot = slot.saturating_add(amount);
        self.save(installation, &players)
    }

    pub fn set(&self, installation: &str, player_id: &str, stat: StatName, value: u64) -> bool {
        let Some(mut players) = self.load_for_update(installation) else {
            return false;
        };
        *stat.slot(entry_mut(&mut players, player_id)) = value;
        self.save(installation, &players)
    }

    /// Highest values first; equal values keep file order.
    pub fn leaderboard(&self, installation: &str, stat: StatName, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .load(installation)
            .into_iter()
            .map(|entry| LeaderboardEntry {
                value: stat.value(&entry.stats),
                player_id: entry.player_id,
            })
            .collect();
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        entries.truncate(limit);
        entries
    }

    /// 1-based position on the full leaderboard.
    pub fn rank(&self, installation: &str, player_id: &str, stat: StatName) -> Option<usize> {
        self.leaderboard(installation, stat, usize::MAX)
            .iter()
            .position(|entry| entry.player_id == player_id)
            .map(|idx| idx + 1)
    }

    pub fn unlocked_achievements(&self, installation: &str, player_id: &str) -> Vec<String> {
        self.stats(installation, player_id).achievements
    }

    pub fn record_game_started(&self, installation: &str, player_ids: &[&str]) -> bool {
        let Some(mut players) = self.load_for_update(installation) else {
            return false;
        };
        for player_id in player_ids {
            entry_mut(&mut players, player_id).games_played += 1;
        }
        let unlocks = award_achievements(&mut players, player_ids.iter().copied());
        self.save_with_unlocks(installation, &players, unlocks)
            .is_some()
    }

    /// Folds one finished level into every participant's counters and returns new unlocks.
    pub fn record_level(&self, installation: &str, summary: &LevelSummary) -> Vec<AchievementUnlock> {
        let completed = summary.outcome == LevelOutcome::Completed;
        let Some(mut players) = self.load_for_update(installation) else {
            return Vec::new();
        };
        for participant in &summary.participants {
            let stats = entry_mut(&mut players, &participant.player_id);
            stats.items_collected = stats
                .items_collected
                .saturating_add(u64::from(participant.items_collected));
            stats.highest_level = stats.highest_level.max(u64::from(summary.level));
            if participant.eliminated {
                stats.deaths += 1;
            }
            if participant.won {
                stats.wins += 1;
            }
            if completed && !participant.eliminated && !participant.left {
                stats.levels_completed += 1;
            }
        }
        let ids = summary
            .participants
            .iter()
            .map(|participant| participant.player_id.as_str());
        let unlocks = award_achievements(&mut players, ids);
        self.save_with_unlocks(installation, &players, unlocks)
            .unwrap_or_default()
    }

    /// `completed` marks a run that cleared its final level.
    pub fn record_game_finished(
        &self,
        installation: &str,
        player_ids: &[&str],
        completed: bool,
    ) -> Vec<AchievementUnlock> {
        let Some(mut players) = self.load_for_update(installation) else {
            return Vec::new();
        };
        if completed {
            for player_id in player_ids {
                entry_mut(&mut players, player_id).games_completed += 1;
            }
        }
        let unlocks = award_achievements(&mut players, player_ids.iter().copied());
        self.save_with_unlocks(installation, &players, unlocks)
            .unwrap_or_default()
    }

    fn save_with_unlocks(
        &self,
        installation: &str,
        players: &[StoredPlayer],
        unlocks: Vec<AchievementUnlock>,
    ) -> Option<Vec<AchievementUnlock>> {
        if !self.save(installation, players) {
            return None;
        }
        for unlock in &unlocks {
            info!(
                "[score-store] {} unlocked {} (+{} xp)",
                unlock.player_id, unlock.achievement_id, unlock.xp_reward
            );
        }
        Some(unlocks)
    }

    fn path(&self, installation: &str) -> PathBuf {
        installation_file(&self.dir, installation)
    }

    fn load(&self, installation: &str) -> Vec<StoredPlayer> {
        let path = self.path(installation);
        match read_players(&path) {
            Ok(players) => players,
            Err(error) => {
                warn!("[score-store] {error}");
                Vec::new()
            }
        }
    }

    /// Like `load`, but an unreadable file yields `None` so it is never overwritten.
    fn load_for_update(&self, installation: &str) -> Option<Vec<StoredPlayer>> {
        let path = self.path(installation);
        match read_players(&path) {
            Ok(players) => Some(players),
            Err(error) => {
                warn!("[score-store] refusing to update: {error}");
                None
            }
        }
    }

    fn save(&self, installation: &str, players: &[StoredPlayer]) -> bool {
        let path = self.path(installation);
        let payload = ScoreFile {
            version: SCORE_FILE_VERSION,
            players,
        };
        match write_json_atomic(&path, &payload) {
            Ok(()) => true,
            Err(error) => {
                warn!("[score-store] {error}");
                false
            }
        }
    }
}

fn read_players(path: &Path) -> Result<Vec<StoredPlayer>, StoreError> {
    let Some(raw) = read_json::<ScoreFileRaw>(path)? else {
        return Ok(Vec::new());
    };
    if raw.version != SCORE_FILE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            version: raw.version,
        });
    }

    let mut players: Vec<StoredPlayer> = Vec::new();
    for value in raw.players {
        let entry: StoredPlayer = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(error) => {
                warn!(
                    "[score-store] skipping malformed player entry in {}: {error}",
                    path.display()
                );
                continue;
            }
        };
        let player_id = entry.player_id.trim().to_string();
        if player_id.is_empty() {
            continue;
        }
        match players.iter_mut().find(|current| current.player_id == player_id) {
            Some(current) => merge_stats(&mut current.stats, entry.stats),
            None => players.push(StoredPlayer {
                player_id,
                stats: entry.stats,
            }),
        }
    }
    Ok(players)
}

fn merge_stats(current: &mut PlayerStats, other: PlayerStats) {
    for stat in StatName::ALL {
        let slot = stat.slot(current);
        *slot = (*slot).max(stat.value(&other));
    }
    for id in other.achievements {
        if !current.achievements.contains(&id) {
            current.achievements.push(id);
        }
    }
}

fn entry_mut<'a>(players: &'a mut Vec<StoredPlayer>, player_id: &str) -> &'a mut PlayerStats {
    let idx = match players.iter().position(|entry| entry.player_id == player_id) {
        Some(idx) => idx,
        None => {
            players.push(StoredPlayer {
                player_id: player_id.to_string(),
                stats: PlayerStats::default(),
            });
            players.len() - 1
        }
    };
    &mut players[idx].stats
}

fn award_achievements<'a>(
    players: &mut Vec<StoredPlayer>,
    player_ids: impl IntoIterator<Item = &'a str>,
) -> Vec<AchievementUnlock> {
    let mut unlocks = Vec::new();
    for player_id in player_ids {
        let stats = entry_mut(players, player_id);
        for found in achievements::evaluate(stats, &stats.achievements) {
            stats.achievements.push(found.id.to_string());
            stats.xp = stats.xp.saturating_add(found.xp_reward);
            unlocks.push(AchievementUnlock {
                player_id: player_id.to_string(),
                achievement_id: found.id,
                xp_reward: found.xp_reward,
            });
        }
    }
    unlocks
}
