use log::info;

use super::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct CollisionHit {
    pub player_id: String,
    pub eliminated: bool,
}

impl GameEngine {
    /// Every player standing on a zombie loses one life and clears that cell of zombies.
    /// A player at zero lives leaves the roster; their win record stays.
    pub(super) fn resolve_zombie_collisions(&mut self) -> Vec<CollisionHit> {
        let mut hits = Vec::new();
        let mut idx = 0;
        while idx < self.players.len() {
            let position = self.players[idx].position;
            if !self.zombies.contains(&position) {
                idx += 1;
                continue;
            }

            self.zombies.retain(|zombie| *zombie != position);
            let player = &mut self.players[idx];
            player.lives = player.lives.saturating_sub(1);
            let player_id = player.id.clone();
            let lives_left = player.lives;
            if let Some(stats) = self.participant_mut(&player_id) {
                stats.hits_taken += 1;
            }
            self.events.push(RuntimeEvent::PlayerHit {
                player_id: player_id.clone(),
                lives_left,
            });

            if lives_left == 0 {
                self.players.remove(idx);
                if let Some(stats) = self.participant_mut(&player_id) {
                    stats.eliminated = true;
                }
                self.events.push(RuntimeEvent::PlayerEliminated {
                    player_id: player_id.clone(),
                });
                info!("level {}: {player_id} eliminated", self.level);
                hits.push(CollisionHit {
                    player_id,
                    eliminated: true,
                });
            } else {
                hits.push(CollisionHit {
                    player_id,
                    eliminated: false,
                });
                idx += 1;
            }
        }

        self.mark_game_over_if_roster_empty();
        hits
    }
}
