use log::debug;

use super::*;
use crate::constants::get_zombie_count_range;
use crate::world::find_free_cell;

impl GameEngine {
    pub(super) fn spawn_initial_zombies(&mut self) {
        let (min_zombies, max_zombies) = get_zombie_count_range(self.level);
        let count = self.rng.int(min_zombies, max_zombies).max(0) as usize;
        for _ in 0..count {
            let mut excluded = self.field.blocked_cells();
            excluded.extend(self.occupied_by_players());
            excluded.extend(self.zombies.iter().copied());
            let Some(spawn) = self.place(&excluded) else {
                debug!("level {}: field saturated after {} zombies", self.level, self.zombies.len());
                break;
            };
            self.zombies.push(spawn);
        }
    }

    /// Spawn cell for a player. Cells holding a zombie are avoided when possible.
    pub(super) fn pick_player_spawn(&mut self) -> Option<Vec2> {
        let mut excluded = self.field.blocked_cells();
        excluded.extend(self.occupied_by_players());
        let mut strict = excluded.clone();
        strict.extend(self.zombies.iter().copied());
        self.place(&strict).or_else(|| self.place(&excluded))
    }

    fn place(&mut self, excluded: &HashSet<Vec2>) -> Option<Vec2> {
        find_free_cell(
            self.field.width,
            self.field.height,
            excluded,
            self.options.placement_attempts,
            &mut self.rng,
        )
    }
}
