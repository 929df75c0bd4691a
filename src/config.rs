use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PLAYER_LIVES, ITEM_ATTEMPTS, MAX_PLAYER_LIVES, MIN_PLAYER_LIVES, OBSTACLE_ATTEMPTS,
    PLACEMENT_ATTEMPTS, PORTAL_ATTEMPTS, WEIGHT_CLOSER, WEIGHT_FARTHER, WEIGHT_SAME,
    ZOMBIE_MOVE_INTERVAL,
};
use crate::store_io::{installation_file, read_json, write_json_atomic};
use crate::types::{Direction, ItemKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphTable {
    pub wall: String,
    pub obstacle: String,
    pub empty: String,
    pub player: String,
    pub portal: String,
    pub zombie: String,
    pub player1: String,
    pub player2: String,
    pub player3: String,
    pub player4: String,
    pub heart: String,
    pub skull: String,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub join: String,
}

impl Default for GlyphTable {
    fn default() -> Self {
        Self {
            wall: "⬛".to_string(),
            obstacle: "🟥".to_string(),
            empty: "🟦".to_string(),
            player: "🟢".to_string(),
            portal: "🛠️".to_string(),
            zombie: "🧟".to_string(),
            player1: "🟢".to_string(),
            player2: "🔵".to_string(),
            player3: "🟡".to_string(),
            player4: "🟣".to_string(),
            heart: "❤️".to_string(),
            skull: "💀".to_string(),
            up: "⬆️".to_string(),
            down: "⬇️".to_string(),
            left: "⬅️".to_string(),
            right: "➡️".to_string(),
            join: "✅".to_string(),
        }
    }
}

impl GlyphTable {
    pub fn identities(&self) -> [&str; 4] {
        [
            self.player1.as_str(),
            self.player2.as_str(),
            self.player3.as_str(),
            self.player4.as_str(),
        ]
    }

    /// Identity glyph for a join-order slot; wraps around the palette.
    pub fn identity(&self, slot: usize) -> &str {
        let palette = self.identities();
        palette[slot % palette.len()]
    }

    pub fn direction(&self, dir: Direction) -> &str {
        match dir {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemGlyphs {
    pub diamond: String,
    pub wood: String,
    pub stone: String,
    pub coal: String,
}

impl Default for ItemGlyphs {
    fn default() -> Self {
        Self {
            diamond: "💎".to_string(),
            wood: "🪵".to_string(),
            stone: "🪨".to_string(),
            coal: "⚫".to_string(),
        }
    }
}

impl ItemGlyphs {
    pub fn glyph(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Diamond => &self.diamond,
            ItemKind::Wood => &self.wood,
            ItemKind::Stone => &self.stone,
            ItemKind::Coal => &self.coal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphKey {
    Wall,
    Obstacle,
    Empty,
    Player,
    Portal,
    Zombie,
    Player1,
    Player2,
    Player3,
    Player4,
    Heart,
    Skull,
    Up,
    Down,
    Left,
    Right,
    Join,
    Item(ItemKind),
}

impl GlyphKey {
    pub fn parse(value: &str) -> Option<Self> {
        let key = match value.trim() {
            "wall" => Self::Wall,
            "obstacle" => Self::Obstacle,
            "empty" => Self::Empty,
            "player" => Self::Player,
            "portal" => Self::Portal,
            "zombie" => Self::Zombie,
            "player1" => Self::Player1,
            "player2" => Self::Player2,
            "player3" => Self::Player3,
            "player4" => Self::Player4,
            "heart" => Self::Heart,
            "skull" => Self::Skull,
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "join" => Self::Join,
            other => Self::Item(ItemKind::parse(other)?),
        };
        Some(key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    #[serde(flatten)]
    pub glyphs: GlyphTable,
    #[serde(flatten)]
    pub item_glyphs: ItemGlyphs,
    pub player_lives: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            glyphs: GlyphTable::default(),
            item_glyphs: ItemGlyphs::default(),
            player_lives: DEFAULT_PLAYER_LIVES,
        }
    }
}

impl GameSettings {
    /// Blank glyphs fall back to their defaults and lives are clamped to the allowed range.
    pub fn validated(mut self) -> Self {
        let defaults = GameSettings::default();
        let pairs: [(&mut String, &String); 21] = [
            (&mut self.glyphs.wall, &defaults.glyphs.wall),
            (&mut self.glyphs.obstacle, &defaults.glyphs.obstacle),
            (&mut self.glyphs.empty, &defaults.glyphs.empty),
            (&mut self.glyphs.player, &defaults.glyphs.player),
            (&mut self.glyphs.portal, &defaults.glyphs.portal),
            (&mut self.glyphs.zombie, &defaults.glyphs.zombie),
            (&mut self.glyphs.player1, &defaults.glyphs.player1),
            (&mut self.glyphs.player2, &defaults.glyphs.player2),
            (&mut self.glyphs.player3, &defaults.glyphs.player3),
            (&mut self.glyphs.player4, &defaults.glyphs.player4),
            (&mut self.glyphs.heart, &defaults.glyphs.heart),
            (&mut self.glyphs.skull, &defaults.glyphs.skull),
            (&mut self.glyphs.up, &defaults.glyphs.up),
            (&mut self.glyphs.down, &defaults.glyphs.down),
            (&mut self.glyphs.left, &defaults.glyphs.left),
            (&mut self.glyphs.right, &defaults.glyphs.right),
            (&mut self.glyphs.join, &defaults.glyphs.join),
            (&mut self.item_glyphs.diamond, &defaults.item_glyphs.diamond),
            (&mut self.item_glyphs.wood, &defaults.item_glyphs.wood),
            (&mut self.item_glyphs.stone, &defaults.item_glyphs.stone),
            (&mut self.item_glyphs.coal, &defaults.item_glyphs.coal),
        ];
        for (value, fallback) in pairs {
            let trimmed = value.trim().to_string();
            *value = if trimmed.is_empty() {
                fallback.clone()
            } else {
                trimmed
            };
        }
        self.player_lives = self.player_lives.clamp(MIN_PLAYER_LIVES, MAX_PLAYER_LIVES);
        self
    }

    pub fn set_glyph(&mut self, key: GlyphKey, value: &str) {
        let value = value.to_string();
        match key {
            GlyphKey::Wall => self.glyphs.wall = value,
            GlyphKey::Obstacle => self.glyphs.obstacle = value,
            GlyphKey::Empty => self.glyphs.empty = value,
            GlyphKey::Player => self.glyphs.player = value,
            GlyphKey::Portal => self.glyphs.portal = value,
            GlyphKey::Zombie => self.glyphs.zombie = value,
            GlyphKey::Player1 => self.glyphs.player1 = value,
            GlyphKey::Player2 => self.glyphs.player2 = value,
            GlyphKey::Player3 => self.glyphs.player3 = value,
            GlyphKey::Player4 => self.glyphs.player4 = value,
            GlyphKey::Heart => self.glyphs.heart = value,
            GlyphKey::Skull => self.glyphs.skull = value,
            GlyphKey::Up => self.glyphs.up = value,
            GlyphKey::Down => self.glyphs.down = value,
            GlyphKey::Left => self.glyphs.left = value,
            GlyphKey::Right => self.glyphs.right = value,
            GlyphKey::Join => self.glyphs.join = value,
            GlyphKey::Item(ItemKind::Diamond) => self.item_glyphs.diamond = value,
            GlyphKey::Item(ItemKind::Wood) => self.item_glyphs.wood = value,
            GlyphKey::Item(ItemKind::Stone) => self.item_glyphs.stone = value,
            GlyphKey::Item(ItemKind::Coal) => self.item_glyphs.coal = value,
        }
    }

    /// Every glyph that can appear inside the rendered field.
    pub fn field_glyphs(&self) -> Vec<&str> {
        let mut glyphs = vec![
            self.glyphs.wall.as_str(),
            self.glyphs.obstacle.as_str(),
            self.glyphs.empty.as_str(),
            self.glyphs.player.as_str(),
            self.glyphs.portal.as_str(),
            self.glyphs.zombie.as_str(),
        ];
        glyphs.extend(self.glyphs.identities());
        glyphs.extend(ItemKind::ALL.iter().map(|kind| self.item_glyphs.glyph(*kind)));
        glyphs
    }

    pub fn average_glyph_len(&self) -> f64 {
        let glyphs = self.field_glyphs();
        let total: usize = glyphs.iter().map(|glyph| glyph.chars().count()).sum();
        (total as f64 / glyphs.len().max(1) as f64).max(1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChaseWeights {
    pub closer: f32,
    pub same: f32,
    pub farther: f32,
}

impl Default for ChaseWeights {
    fn default() -> Self {
        Self {
            closer: WEIGHT_CLOSER,
            same: WEIGHT_SAME,
            farther: WEIGHT_FARTHER,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineOptions {
    pub zombie_move_interval: u32,
    pub chase_weights: ChaseWeights,
    pub obstacle_attempts: usize,
    pub item_attempts: usize,
    pub portal_attempts: usize,
    pub placement_attempts: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            zombie_move_interval: ZOMBIE_MOVE_INTERVAL,
            chase_weights: ChaseWeights::default(),
            obstacle_attempts: OBSTACLE_ATTEMPTS,
            item_attempts: ITEM_ATTEMPTS,
            portal_attempts: PORTAL_ATTEMPTS,
            placement_attempts: PLACEMENT_ATTEMPTS,
        }
    }
}

/// Per-installation settings, one JSON file each.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn load(&self, installation: &str) -> GameSettings {
        let path = installation_file(&self.dir, installation);
        match read_json::<GameSettings>(&path) {
            Ok(Some(settings)) => settings.validated(),
            Ok(None) => GameSettings::default(),
            Err(error) => {
                warn!("[config-store] {error}; using defaults");
                GameSettings::default()
            }
        }
    }

    pub fn save(&self, installation: &str, settings: &GameSettings) -> bool {
        let path = installation_file(&self.dir, installation);
        match write_json_atomic(&path, settings) {
            Ok(()) => true,
            Err(error) => {
                warn!("[config-store] {error}");
                false
            }
        }
    }

    pub fn update_glyph(&self, installation: &str, key: GlyphKey, value: &str) -> bool {
        let mut settings = self.load(installation);
        settings.set_glyph(key, value);
        self.save(installation, &settings.validated())
    }

    pub fn update_player_lives(&self, installation: &str, lives: u32) -> bool {
        let mut settings = self.load(installation);
        settings.player_lives = lives;
        self.save(installation, &settings.validated())
    }
}
