use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Diamond,
    Wood,
    Stone,
    Coal,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Diamond,
        ItemKind::Wood,
        ItemKind::Stone,
        ItemKind::Coal,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "diamond" => Some(Self::Diamond),
            "wood" => Some(Self::Wood),
            "stone" => Some(Self::Stone),
            "coal" => Some(Self::Coal),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Diamond => "diamond",
            Self::Wood => "wood",
            Self::Stone => "stone",
            Self::Coal => "coal",
        }
    }
}

/// Grid cell, 0-indexed from the top-left corner.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    LevelComplete,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("the game is already over")]
    GameOver,
    #[error("player is not in the active roster")]
    UnknownPlayer,
    #[error("movement must be one cell along one axis")]
    InvalidDirection,
    #[error("target cell is outside the field")]
    OutOfBounds,
    #[error("target cell is blocked by an obstacle")]
    Obstacle,
    #[error("target cell is occupied by another player")]
    Occupied,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error("player has already joined")]
    AlreadyJoined,
    #[error("no free cell left to spawn on")]
    NoFreeCell,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    pub position: Vec2,
    pub collected: Option<ItemKind>,
    pub won: bool,
    pub hit: bool,
    pub eliminated: bool,
    pub zombies_moved: bool,
}

#[derive(Clone, Debug)]
pub struct StartPlayer {
    pub id: String,
    pub lives: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub lives: u32,
    pub identity: usize,
    pub wins: u32,
    pub inventory: BTreeMap<ItemKind, u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ItemView {
    pub x: i32,
    pub y: i32,
    pub kind: ItemKind,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub level: u32,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "requiredItems")]
    pub required_items: u32,
    pub obstacles: Vec<Vec2>,
    pub items: Vec<ItemView>,
    pub portal: Option<Vec2>,
    #[serde(rename = "portalActive")]
    pub portal_active: bool,
    pub zombies: Vec<Vec2>,
    pub players: Vec<PlayerView>,
    pub winner: Option<String>,
    pub state: SessionState,
    pub moves: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    ItemCollected {
        #[serde(rename = "playerId")]
        player_id: String,
        kind: ItemKind,
        x: i32,
        y: i32,
    },
    PlayerHit {
        #[serde(rename = "playerId")]
        player_id: String,
        #[serde(rename = "livesLeft")]
        lives_left: u32,
    },
    PlayerEliminated {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    PlayerLeft {
        #[serde(rename = "playerId")]
        player_id: String,
    },
    LevelCompleted {
        level: u32,
        winner: String,
    },
    ZombiesMoved {
        count: usize,
    },
    GameOver {
        level: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOutcome {
    InProgress,
    Completed,
    GameOver,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParticipantSummary {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "itemsCollected")]
    pub items_collected: u32,
    #[serde(rename = "hitsTaken")]
    pub hits_taken: u32,
    pub eliminated: bool,
    pub won: bool,
    /// Left voluntarily before the level ended.
    pub left: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct LevelSummary {
    pub level: u32,
    pub outcome: LevelOutcome,
    pub winner: Option<String>,
    pub moves: u64,
    pub participants: Vec<ParticipantSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_delta() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(dir));
        }
        assert_eq!(Direction::from_delta(1, 1), None);
        assert_eq!(Direction::from_delta(0, 0), None);
        assert_eq!(Direction::from_delta(0, 2), None);
    }

    #[test]
    fn parse_move_rejects_unknown_names() {
        assert_eq!(Direction::parse_move("up"), Some(Direction::Up));
        assert_eq!(Direction::parse_move("none"), None);
        assert_eq!(Direction::parse_move("UP"), None);
    }

    #[test]
    fn item_kind_keys_parse_back() {
        for kind in ItemKind::ALL {
            assert_eq!(ItemKind::parse(kind.key()), Some(kind));
        }
        assert_eq!(ItemKind::parse("gold"), None);
    }

    #[test]
    fn runtime_event_serializes_with_tag() {
        let value = serde_json::to_value(RuntimeEvent::PlayerHit {
            player_id: "p1".to_string(),
            lives_left: 2,
        })
        .expect("event serializes");
        assert_eq!(value["type"], "player_hit");
        assert_eq!(value["playerId"], "p1");
        assert_eq!(value["livesLeft"], 2);
    }
}
