use std::collections::BTreeSet;

use log::debug;

use super::utils::manhattan;
use super::GameEngine;
use crate::config::ChaseWeights;
use crate::rng::Rng;
use crate::types::{Direction, RuntimeEvent, Vec2};
use crate::world::in_bounds;

/// Moves every zombie one step toward its nearest player using a weighted draw.
/// Zombies may step onto players; obstacles and the field edge stop them.
pub fn advance_all(
    zombies: &[Vec2],
    players: &[Vec2],
    obstacles: &BTreeSet<Vec2>,
    width: i32,
    height: i32,
    weights: ChaseWeights,
    rng: &mut Rng,
) -> Vec<Vec2> {
    if players.is_empty() {
        return zombies.to_vec();
    }

    zombies
        .iter()
        .map(|zombie| {
            let Some(target) = players
                .iter()
                .copied()
                .min_by_key(|player| manhattan(*zombie, *player))
            else {
                return *zombie;
            };
            let current = manhattan(*zombie, target);

            let mut candidates = Vec::with_capacity(4);
            let mut candidate_weights = Vec::with_capacity(4);
            for dir in Direction::ALL {
                let next = zombie.step(dir);
                if !in_bounds(width, height, next) || obstacles.contains(&next) {
                    continue;
                }
                let distance = manhattan(next, target);
                let weight = if distance < current {
                    weights.closer
                } else if distance == current {
                    weights.same
                } else {
                    weights.farther
                };
                candidates.push(next);
                candidate_weights.push(weight);
            }

            if candidates.is_empty() {
                return *zombie;
            }
            let pick = rng
                .pick_weighted(&candidate_weights)
                .unwrap_or_else(|| rng.pick_index(candidates.len()));
            candidates[pick]
        })
        .collect()
}

impl GameEngine {
    pub(super) fn tick_zombies(&mut self) {
        if self.zombies.is_empty() {
            return;
        }
        let players: Vec<Vec2> = self.players.iter().map(|player| player.position).collect();
        self.zombies = advance_all(
            &self.zombies,
            &players,
            &self.field.obstacles,
            self.field.width,
            self.field.height,
            self.options.chase_weights,
            &mut self.rng,
        );
        debug!("level {}: {} zombies moved", self.level, self.zombies.len());
        self.events.push(RuntimeEvent::ZombiesMoved {
            count: self.zombies.len(),
        });
    }
}
