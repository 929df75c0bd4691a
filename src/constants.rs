pub const ZOMBIE_MOVE_INTERVAL: u32 = 2;

pub const WEIGHT_CLOSER: f32 = 3.0;
pub const WEIGHT_SAME: f32 = 1.0;
pub const WEIGHT_FARTHER: f32 = 0.5;

pub const OBSTACLE_ATTEMPTS: usize = 100;
pub const ITEM_ATTEMPTS: usize = 200;
pub const PORTAL_ATTEMPTS: usize = 100;
pub const PLACEMENT_ATTEMPTS: usize = 100;

pub const ITEM_SURPLUS_MIN: i32 = 2;
pub const ITEM_SURPLUS_MAX: i32 = 4;

pub const RENDER_LENGTH_CEILING: usize = 4096;
pub const MIN_FIELD_SIDE: i32 = 5;

pub const IDENTITY_PALETTE_SIZE: usize = 4;

pub const DEFAULT_PLAYER_LIVES: u32 = 3;
pub const MIN_PLAYER_LIVES: u32 = 1;
pub const MAX_PLAYER_LIVES: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelParams {
    pub min_items: i32,
    pub max_items: i32,
    pub width: i32,
    pub height: i32,
    pub obstacle_count: usize,
}

const fn level(
    min_items: i32,
    max_items: i32,
    width: i32,
    height: i32,
    obstacle_count: usize,
) -> LevelParams {
    LevelParams {
        min_items,
        max_items,
        width,
        height,
        obstacle_count,
    }
}

pub const LEVEL_CONFIGS: [LevelParams; 5] = [
    level(2, 3, 8, 5, 2),
    level(3, 4, 10, 6, 3),
    level(4, 5, 12, 7, 4),
    level(5, 6, 14, 8, 5),
    level(6, 7, 16, 9, 6),
];

pub const DEFAULT_LEVEL_CONFIG: LevelParams = level(7, 8, 18, 10, 7);

pub const ZOMBIE_COUNT_BY_LEVEL: [(i32, i32); 5] = [(0, 1), (1, 2), (1, 3), (2, 3), (2, 4)];

pub const DEFAULT_ZOMBIE_COUNT: (i32, i32) = (3, 5);

pub fn get_level_params(level: u32) -> LevelParams {
    level
        .checked_sub(1)
        .and_then(|idx| LEVEL_CONFIGS.get(idx as usize))
        .copied()
        .unwrap_or(DEFAULT_LEVEL_CONFIG)
}

pub fn get_zombie_count_range(level: u32) -> (i32, i32) {
    level
        .checked_sub(1)
        .and_then(|idx| ZOMBIE_COUNT_BY_LEVEL.get(idx as usize))
        .copied()
        .unwrap_or(DEFAULT_ZOMBIE_COUNT)
}
