use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;

use crate::config::{EngineOptions, GameSettings};
use crate::constants::{
    get_level_params, ITEM_SURPLUS_MAX, ITEM_SURPLUS_MIN, MIN_FIELD_SIDE, RENDER_LENGTH_CEILING,
};
use crate::rng::Rng;
use crate::types::{ItemKind, Vec2};

#[derive(Clone, Debug)]
pub struct GeneratedField {
    pub width: i32,
    pub height: i32,
    pub required_items: u32,
    pub obstacles: BTreeSet<Vec2>,
    pub items: BTreeMap<Vec2, ItemKind>,
    pub portal: Option<Vec2>,
}

impl GeneratedField {
    pub fn in_bounds(&self, cell: Vec2) -> bool {
        in_bounds(self.width, self.height, cell)
    }

    pub fn is_obstacle(&self, cell: Vec2) -> bool {
        self.obstacles.contains(&cell)
    }

    pub fn is_walkable(&self, cell: Vec2) -> bool {
        self.in_bounds(cell) && !self.is_obstacle(cell)
    }

    /// Cells no entity may spawn on: obstacles, items and the portal.
    pub fn blocked_cells(&self) -> HashSet<Vec2> {
        let mut blocked: HashSet<Vec2> = self.obstacles.iter().copied().collect();
        blocked.extend(self.items.keys().copied());
        if let Some(portal) = self.portal {
            blocked.insert(portal);
        }
        blocked
    }
}

pub fn in_bounds(width: i32, height: i32, cell: Vec2) -> bool {
    cell.x >= 0 && cell.y >= 0 && cell.x < width && cell.y < height
}

pub fn generate_field(
    level: u32,
    settings: &GameSettings,
    options: &EngineOptions,
    rng: &mut Rng,
) -> GeneratedField {
    let params = get_level_params(level);
    let (width, height) = cap_field_size(params.width, params.height, settings.average_glyph_len());
    let required_items = rng.int(params.min_items, params.max_items).max(0) as u32;

    let obstacles = place_obstacles(
        width,
        height,
        params.obstacle_count,
        options.obstacle_attempts,
        rng,
    );
    let item_count =
        required_items as usize + rng.int(ITEM_SURPLUS_MIN, ITEM_SURPLUS_MAX).max(0) as usize;
    let items = place_items(
        width,
        height,
        &obstacles,
        item_count,
        options.item_attempts,
        rng,
    );

    let mut excluded: HashSet<Vec2> = obstacles.iter().copied().collect();
    excluded.extend(items.keys().copied());
    let portal = find_free_cell(width, height, &excluded, options.portal_attempts, rng);
    if portal.is_none() {
        debug!("level {level}: no free cell for the portal, level cannot be completed");
    }

    GeneratedField {
        width,
        height,
        required_items,
        obstacles,
        items,
        portal,
    }
}

/// Shrinks the field until its walled rendering fits the output ceiling.
pub fn cap_field_size(width: i32, height: i32, avg_glyph_len: f64) -> (i32, i32) {
    let avg = if avg_glyph_len.is_finite() {
        avg_glyph_len.max(1.0)
    } else {
        1.0
    };
    let max_cells = (RENDER_LENGTH_CEILING as f64 / avg).floor() as i64;
    let mut width = width.max(1);
    let mut height = height.max(1);

    while ((width + 2) as i64) * ((height + 2) as i64) > max_cells {
        let can_shrink_width = width > MIN_FIELD_SIDE;
        let can_shrink_height = height > MIN_FIELD_SIDE;
        if can_shrink_width && (width >= height || !can_shrink_height) {
            width -= 1;
        } else if can_shrink_height {
            height -= 1;
        } else {
            break;
        }
    }
    (width, height)
}

fn place_obstacles(
    width: i32,
    height: i32,
    count: usize,
    max_attempts: usize,
    rng: &mut Rng,
) -> BTreeSet<Vec2> {
    let mut obstacles = BTreeSet::new();
    let mut attempts = 0;
    // Repeated picks coalesce, so fewer obstacles than requested is possible.
    while obstacles.len() < count && attempts < max_attempts {
        obstacles.insert(random_cell(width, height, rng));
        attempts += 1;
    }
    obstacles
}

fn place_items(
    width: i32,
    height: i32,
    obstacles: &BTreeSet<Vec2>,
    count: usize,
    max_attempts: usize,
    rng: &mut Rng,
) -> BTreeMap<Vec2, ItemKind> {
    let mut items = BTreeMap::new();
    let mut attempts = 0;
    while items.len() < count && attempts < max_attempts {
        attempts += 1;
        let cell = random_cell(width, height, rng);
        if obstacles.contains(&cell) || items.contains_key(&cell) {
            continue;
        }
        let kind = ItemKind::ALL[rng.pick_index(ItemKind::ALL.len())];
        items.insert(cell, kind);
    }
    items
}

/// Random probing first, then a row-major scan. `None` only when every cell is excluded.
pub fn find_free_cell(
    width: i32,
    height: i32,
    excluded: &HashSet<Vec2>,
    max_attempts: usize,
    rng: &mut Rng,
) -> Option<Vec2> {
    if width <= 0 || height <= 0 {
        return None;
    }
    for _ in 0..max_attempts {
        let cell = random_cell(width, height, rng);
        if !excluded.contains(&cell) {
            return Some(cell);
        }
    }

    debug!("random placement exhausted after {max_attempts} attempts, scanning");
    for y in 0..height {
        for x in 0..width {
            let cell = Vec2::new(x, y);
            if !excluded.contains(&cell) {
                return Some(cell);
            }
        }
    }
    None
}

fn random_cell(width: i32, height: i32, rng: &mut Rng) -> Vec2 {
    Vec2::new(rng.int(0, width - 1), rng.int(0, height - 1))
}
