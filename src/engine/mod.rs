use std::collections::{BTreeMap, HashSet};

use log::{info, warn};

use crate::config::{EngineOptions, GameSettings};
use crate::constants::IDENTITY_PALETTE_SIZE;
use crate::rng::Rng;
use crate::types::{
    Direction, ItemKind, ItemView, JoinRejection, LevelOutcome, LevelSummary, MoveOutcome,
    MoveRejection, ParticipantSummary, PlayerView, RuntimeEvent, SessionState, Snapshot,
    StartPlayer, Vec2,
};
use crate::world::{generate_field, GeneratedField};

mod collision_system;
mod spawn_system;
mod utils;
pub mod zombie_system;

use self::utils::total_items;

#[derive(Clone, Debug)]
struct PlayerInternal {
    id: String,
    position: Vec2,
    lives: u32,
    identity: usize,
    inventory: BTreeMap<ItemKind, u32>,
}

impl PlayerInternal {
    fn total_items(&self) -> u32 {
        total_items(self.inventory.values())
    }
}

fn empty_inventory() -> BTreeMap<ItemKind, u32> {
    ItemKind::ALL.iter().map(|kind| (*kind, 0)).collect()
}

/// One level of one game: field, zombies and the active roster.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub level: u32,
    pub field: GeneratedField,
    pub settings: GameSettings,
    pub options: EngineOptions,

    rng: Rng,
    players: Vec<PlayerInternal>,
    zombies: Vec<Vec2>,
    win_records: BTreeMap<String, u32>,
    participants: Vec<ParticipantSummary>,
    events: Vec<RuntimeEvent>,

    winner: Option<String>,
    level_complete: bool,
    game_over: bool,
    zombie_move_counter: u32,
    join_count: usize,
    moves: u64,
}

impl GameEngine {
    pub fn new(
        level: u32,
        start_players: Vec<StartPlayer>,
        settings: GameSettings,
        options: EngineOptions,
        rng: Rng,
    ) -> Self {
        let mut engine = Self::with_fresh_field(level, settings, options, rng);
        for start in start_players {
            if let Err(reason) = engine.add_player(&start.id, start.lives) {
                warn!("level {level}: could not seat {}: {reason}", start.id);
            }
        }
        engine.spawn_initial_zombies();
        info!(
            "level {} created: {}x{} field, {} players, {} zombies, {} items required",
            engine.level,
            engine.field.width,
            engine.field.height,
            engine.players.len(),
            engine.zombies.len(),
            engine.field.required_items
        );
        engine
    }

    /// Builds level `previous.level + 1` for everyone still on `previous`'s roster.
    /// Lives, wins and identity carry over; inventory and positions do not.
    pub fn create_next_level(previous: &GameEngine) -> Self {
        let level = previous.level.saturating_add(1);
        let mut engine = Self::with_fresh_field(
            level,
            previous.settings.clone(),
            previous.options.clone(),
            previous.rng.clone(),
        );
        engine.join_count = previous.join_count;

        for carried in &previous.players {
            let wins = previous.win_records.get(&carried.id).copied().unwrap_or(0);
            let Some(spawn) = engine.pick_player_spawn() else {
                warn!("level {level}: no free cell for carried player {}", carried.id);
                continue;
            };
            engine.seat_player(&carried.id, carried.lives, carried.identity, wins, spawn);
        }
        engine.spawn_initial_zombies();
        info!(
            "level {} created from level {}: {} players carried over",
            engine.level,
            previous.level,
            engine.players.len()
        );
        engine
    }

    fn with_fresh_field(
        level: u32,
        settings: GameSettings,
        options: EngineOptions,
        mut rng: Rng,
    ) -> Self {
        let field = generate_field(level, &settings, &options, &mut rng);
        Self {
            level,
            field,
            settings,
            options,
            rng,
            players: Vec::new(),
            zombies: Vec::new(),
            win_records: BTreeMap::new(),
            participants: Vec::new(),
            events: Vec::new(),
            winner: None,
            level_complete: false,
            game_over: false,
            zombie_move_counter: 0,
            join_count: 0,
            moves: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.game_over {
            SessionState::GameOver
        } else if self.level_complete {
            SessionState::LevelComplete
        } else {
            SessionState::Active
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn is_level_complete(&self) -> bool {
        self.level_complete
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn roster(&self) -> Vec<&str> {
        self.players.iter().map(|player| player.id.as_str()).collect()
    }

    pub fn zombies(&self) -> &[Vec2] {
        &self.zombies
    }

    pub fn player_position(&self, player_id: &str) -> Option<Vec2> {
        self.find_player(player_id).map(|player| player.position)
    }

    pub fn player_lives(&self, player_id: &str) -> Option<u32> {
        self.find_player(player_id).map(|player| player.lives)
    }

    pub fn player_identity(&self, player_id: &str) -> Option<usize> {
        self.find_player(player_id).map(|player| player.identity)
    }

    pub fn inventory(&self, player_id: &str) -> Option<&BTreeMap<ItemKind, u32>> {
        self.find_player(player_id).map(|player| &player.inventory)
    }

    /// Kept for players who were eliminated or left.
    pub fn wins(&self, player_id: &str) -> Option<u32> {
        self.win_records.get(player_id).copied()
    }

    pub fn player_at(&self, cell: Vec2) -> Option<&str> {
        self.players
            .iter()
            .find(|player| player.position == cell)
            .map(|player| player.id.as_str())
    }

    /// The portal only works once someone holds enough items.
    pub fn portal_active(&self) -> bool {
        self.field.portal.is_some()
            && self
                .players
                .iter()
                .any(|player| player.total_items() >= self.field.required_items)
    }

    /// Seats a new player on a free cell. Lives below one are raised to one,
    /// since a player at zero lives is already eliminated.
    pub fn add_player(&mut self, player_id: &str, lives: u32) -> Result<Vec2, JoinRejection> {
        if self.find_player(player_id).is_some() {
            return Err(JoinRejection::AlreadyJoined);
        }
        let spawn = self.pick_player_spawn().ok_or(JoinRejection::NoFreeCell)?;
        let identity = self.join_count % IDENTITY_PALETTE_SIZE;
        let wins = self.win_records.get(player_id).copied().unwrap_or(0);
        self.seat_player(player_id, lives.max(1), identity, wins, spawn);
        self.join_count += 1;
        Ok(spawn)
    }

    pub fn join_player(&mut self, player_id: &str, lives: u32) -> bool {
        self.add_player(player_id, lives).is_ok()
    }

    fn seat_player(&mut self, player_id: &str, lives: u32, identity: usize, wins: u32, at: Vec2) {
        self.players.push(PlayerInternal {
            id: player_id.to_string(),
            position: at,
            lives,
            identity,
            inventory: empty_inventory(),
        });
        self.win_records.insert(player_id.to_string(), wins);
        match self.participant_mut(player_id) {
            Some(stats) => stats.left = false,
            None => self.participants.push(ParticipantSummary {
                player_id: player_id.to_string(),
                items_collected: 0,
                hits_taken: 0,
                eliminated: false,
                won: false,
                left: false,
            }),
        }
    }

    /// Voluntary leave. Same bookkeeping as elimination, without the death.
    pub fn remove_player(&mut self, player_id: &str) -> bool {
        let Some(idx) = self.player_index(player_id) else {
            return false;
        };
        self.players.remove(idx);
        if let Some(stats) = self.participant_mut(player_id) {
            stats.left = true;
        }
        self.events.push(RuntimeEvent::PlayerLeft {
            player_id: player_id.to_string(),
        });
        self.mark_game_over_if_roster_empty();
        true
    }

    /// External termination.
    pub fn end_game(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.events.push(RuntimeEvent::GameOver { level: self.level });
    }

    pub fn move_player(&mut self, player_id: &str, dx: i32, dy: i32) -> bool {
        self.try_move_delta(player_id, dx, dy).is_ok()
    }

    pub fn try_move_delta(
        &mut self,
        player_id: &str,
        dx: i32,
        dy: i32,
    ) -> Result<MoveOutcome, MoveRejection> {
        let dir = Direction::from_delta(dx, dy).ok_or(MoveRejection::InvalidDirection)?;
        self.try_move(player_id, dir)
    }

    pub fn try_move(
        &mut self,
        player_id: &str,
        dir: Direction,
    ) -> Result<MoveOutcome, MoveRejection> {
        if self.game_over {
            return Err(MoveRejection::GameOver);
        }
        let idx = self
            .player_index(player_id)
            .ok_or(MoveRejection::UnknownPlayer)?;
        let target = self.players[idx].position.step(dir);
        if !self.field.in_bounds(target) {
            return Err(MoveRejection::OutOfBounds);
        }
        if self.field.is_obstacle(target) {
            return Err(MoveRejection::Obstacle);
        }
        if self
            .players
            .iter()
            .enumerate()
            .any(|(other, player)| other != idx && player.position == target)
        {
            return Err(MoveRejection::Occupied);
        }

        self.players[idx].position = target;
        self.moves += 1;
        let mut outcome = MoveOutcome {
            position: target,
            ..MoveOutcome::default()
        };

        if let Some(kind) = self.field.items.remove(&target) {
            *self.players[idx].inventory.entry(kind).or_insert(0) += 1;
            if let Some(stats) = self.participant_mut(player_id) {
                stats.items_collected += 1;
            }
            self.events.push(RuntimeEvent::ItemCollected {
                player_id: player_id.to_string(),
                kind,
                x: target.x,
                y: target.y,
            });
            outcome.collected = Some(kind);
        }

        if self.field.portal == Some(target)
            && self.winner.is_none()
            && self.players[idx].total_items() >= self.field.required_items
        {
            self.declare_winner(player_id);
            outcome.won = true;
        }

        let mut hits = self.resolve_zombie_collisions();

        self.zombie_move_counter += 1;
        if self.zombie_move_counter >= self.options.zombie_move_interval.max(1) {
            self.tick_zombies();
            hits.extend(self.resolve_zombie_collisions());
            self.zombie_move_counter = 0;
            outcome.zombies_moved = true;
        }

        for hit in hits.iter().filter(|hit| hit.player_id == player_id) {
            outcome.hit = true;
            outcome.eliminated |= hit.eliminated;
        }
        Ok(outcome)
    }

    fn declare_winner(&mut self, player_id: &str) {
        self.winner = Some(player_id.to_string());
        self.level_complete = true;
        *self.win_records.entry(player_id.to_string()).or_insert(0) += 1;
        if let Some(stats) = self.participant_mut(player_id) {
            stats.won = true;
        }
        self.events.push(RuntimeEvent::LevelCompleted {
            level: self.level,
            winner: player_id.to_string(),
        });
        info!("level {} won by {player_id}", self.level);
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn build_snapshot(&self) -> Snapshot {
        Snapshot {
            level: self.level,
            width: self.field.width,
            height: self.field.height,
            required_items: self.field.required_items,
            obstacles: self.field.obstacles.iter().copied().collect(),
            items: self
                .field
                .items
                .iter()
                .map(|(cell, kind)| ItemView {
                    x: cell.x,
                    y: cell.y,
                    kind: *kind,
                })
                .collect(),
            portal: self.field.portal,
            portal_active: self.portal_active(),
            zombies: self.zombies.clone(),
            players: self
                .players
                .iter()
                .map(|player| PlayerView {
                    id: player.id.clone(),
                    x: player.position.x,
                    y: player.position.y,
                    lives: player.lives,
                    identity: player.identity,
                    wins: self.win_records.get(&player.id).copied().unwrap_or(0),
                    inventory: player.inventory.clone(),
                })
                .collect(),
            winner: self.winner.clone(),
            state: self.state(),
            moves: self.moves,
        }
    }

    pub fn build_summary(&self) -> LevelSummary {
        let outcome = match self.state() {
            SessionState::Active => LevelOutcome::InProgress,
            SessionState::LevelComplete => LevelOutcome::Completed,
            SessionState::GameOver if self.level_complete => LevelOutcome::Completed,
            SessionState::GameOver => LevelOutcome::GameOver,
        };
        LevelSummary {
            level: self.level,
            outcome,
            winner: self.winner.clone(),
            moves: self.moves,
            participants: self.participants.clone(),
        }
    }

    fn find_player(&self, player_id: &str) -> Option<&PlayerInternal> {
        self.players.iter().find(|player| player.id == player_id)
    }

    fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|player| player.id == player_id)
    }

    fn participant_mut(&mut self, player_id: &str) -> Option<&mut ParticipantSummary> {
        self.participants
            .iter_mut()
            .find(|participant| participant.player_id == player_id)
    }

    fn mark_game_over_if_roster_empty(&mut self) {
        if self.players.is_empty() && !self.game_over {
            self.game_over = true;
            self.events.push(RuntimeEvent::GameOver { level: self.level });
            info!("level {}: no players left, game over", self.level);
        }
    }

    #[cfg(test)]
    pub(crate) fn replace_zombies(&mut self, zombies: Vec<Vec2>) {
        self.zombies = zombies;
    }

    fn occupied_by_players(&self) -> HashSet<Vec2> {
        self.players.iter().map(|player| player.position).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::types::LevelOutcome;

    fn cell(x: i32, y: i32) -> Vec2 {
        Vec2::new(x, y)
    }

    /// 8x5 field with one obstacle at (3,0), two items and the portal at (6,2).
    fn scenario_engine() -> GameEngine {
        let mut engine = GameEngine::new(
            1,
            Vec::new(),
            GameSettings::default(),
            EngineOptions::default(),
            Rng::new(7),
        );
        let mut items = BTreeMap::new();
        items.insert(cell(1, 0), ItemKind::Diamond);
        items.insert(cell(2, 2), ItemKind::Wood);
        engine.field = GeneratedField {
            width: 8,
            height: 5,
            required_items: 2,
            obstacles: BTreeSet::from([cell(3, 0)]),
            items,
            portal: Some(cell(6, 2)),
        };
        engine.zombies.clear();
        engine.events.clear();
        engine.options.zombie_move_interval = 1_000;
        engine
    }

    fn seat(engine: &mut GameEngine, id: &str, at: Vec2, lives: u32) {
        let identity = engine.players.len();
        engine.seat_player(id, lives, identity, 0, at);
    }

    fn give_items(engine: &mut GameEngine, id: &str, diamonds: u32) {
        let idx = engine.player_index(id).expect("seated");
        engine.players[idx].inventory.insert(ItemKind::Diamond, diamonds);
    }

    fn snapshot_json(engine: &GameEngine) -> serde_json::Value {
        serde_json::to_value(engine.build_snapshot()).expect("snapshot serializes")
    }

    #[test]
    fn portal_without_enough_items_does_not_complete_level() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(5, 2), 3);
        give_items(&mut engine, "a", 1);

        let outcome = engine.try_move("a", Direction::Right).expect("move accepted");
        assert_eq!(outcome.position, cell(6, 2));
        assert!(!outcome.won);
        assert!(!engine.is_level_complete());
        assert_eq!(engine.winner(), None);
        assert_eq!(engine.state(), SessionState::Active);
        assert!(!engine.portal_active());
    }

    #[test]
    fn portal_with_enough_items_completes_level_once() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(5, 2), 3);
        give_items(&mut engine, "a", 2);
        assert!(engine.portal_active());

        let outcome = engine.try_move("a", Direction::Right).expect("move accepted");
        assert!(outcome.won);
        assert!(engine.is_level_complete());
        assert_eq!(engine.winner(), Some("a"));
        assert_eq!(engine.wins("a"), Some(1));
        assert_eq!(engine.state(), SessionState::LevelComplete);
        assert!(engine
            .drain_events()
            .contains(&RuntimeEvent::LevelCompleted {
                level: 1,
                winner: "a".to_string(),
            }));
    }

    #[test]
    fn later_qualifying_arrival_does_not_replace_winner() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(5, 2), 3);
        seat(&mut engine, "b", cell(6, 3), 3);
        give_items(&mut engine, "a", 2);
        give_items(&mut engine, "b", 5);

        assert!(engine.move_player("a", 1, 0));
        assert!(!engine.move_player("b", 0, -1), "portal cell is held by a");
        assert!(engine.move_player("a", 1, 0));
        let outcome = engine.try_move("b", Direction::Up).expect("portal now free");
        assert!(!outcome.won);

        assert_eq!(engine.winner(), Some("a"));
        assert_eq!(engine.wins("a"), Some(1));
        assert_eq!(engine.wins("b"), Some(0));
    }

    #[test]
    fn zombie_collision_costs_one_life_and_clears_the_cell() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 4), 3);
        engine.zombies = vec![cell(1, 4), cell(1, 4), cell(7, 0)];

        let outcome = engine.try_move("a", Direction::Right).expect("move accepted");
        assert!(outcome.hit);
        assert!(!outcome.eliminated);
        assert_eq!(engine.player_lives("a"), Some(2));
        assert!(!engine.zombies().contains(&cell(1, 4)));
        assert_eq!(engine.zombies(), &[cell(7, 0)]);
        assert!(engine.drain_events().contains(&RuntimeEvent::PlayerHit {
            player_id: "a".to_string(),
            lives_left: 2,
        }));
    }

    #[test]
    fn last_life_lost_eliminates_and_ends_the_game() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 4), 1);
        engine.zombies = vec![cell(1, 4)];

        let outcome = engine.try_move("a", Direction::Right).expect("move accepted");
        assert!(outcome.hit);
        assert!(outcome.eliminated);
        assert!(engine.roster().is_empty());
        assert_eq!(engine.player_position("a"), None);
        assert_eq!(engine.player_lives("a"), None);
        assert!(engine.inventory("a").is_none());
        assert_eq!(engine.wins("a"), Some(0));
        assert!(engine.is_game_over());
        assert_eq!(engine.state(), SessionState::GameOver);
        assert_eq!(
            engine.try_move("a", Direction::Left),
            Err(MoveRejection::GameOver)
        );

        let summary = engine.build_summary();
        assert_eq!(summary.outcome, LevelOutcome::GameOver);
        assert_eq!(summary.participants.len(), 1);
        assert!(summary.participants[0].eliminated);
        assert_eq!(summary.participants[0].hits_taken, 1);
    }

    #[test]
    fn elimination_with_others_left_keeps_game_running() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 4), 1);
        seat(&mut engine, "b", cell(7, 4), 3);
        engine.zombies = vec![cell(1, 4)];

        assert!(engine.move_player("a", 1, 0));
        assert_eq!(engine.roster(), vec!["b"]);
        assert!(!engine.is_game_over());
        assert_eq!(
            engine.try_move("a", Direction::Right),
            Err(MoveRejection::UnknownPlayer)
        );
    }

    #[test]
    fn second_player_cannot_enter_a_taken_cell() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(2, 3), 3);
        seat(&mut engine, "b", cell(4, 3), 3);

        assert!(engine.move_player("a", 1, 0));
        assert_eq!(
            engine.try_move("b", Direction::Left),
            Err(MoveRejection::Occupied)
        );
        assert_eq!(engine.player_position("a"), Some(cell(3, 3)));
        assert_eq!(engine.player_position("b"), Some(cell(4, 3)));
    }

    #[test]
    fn rejected_moves_change_nothing() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(2, 0), 3);
        give_items(&mut engine, "a", 1);
        let before = snapshot_json(&engine);

        assert_eq!(
            engine.try_move("a", Direction::Up),
            Err(MoveRejection::OutOfBounds)
        );
        assert_eq!(
            engine.try_move("a", Direction::Right),
            Err(MoveRejection::Obstacle)
        );
        assert_eq!(
            engine.try_move("ghost", Direction::Down),
            Err(MoveRejection::UnknownPlayer)
        );
        assert_eq!(
            engine.try_move_delta("a", 1, 1),
            Err(MoveRejection::InvalidDirection)
        );
        assert!(!engine.move_player("a", 0, 0));
        assert!(!engine.move_player("a", 2, 0));

        assert_eq!(snapshot_json(&engine), before);
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn stepping_on_an_item_collects_it() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 0), 3);

        let outcome = engine.try_move("a", Direction::Right).expect("move accepted");
        assert_eq!(outcome.collected, Some(ItemKind::Diamond));
        assert!(!engine.field.items.contains_key(&cell(1, 0)));
        assert_eq!(engine.inventory("a").and_then(|inv| inv.get(&ItemKind::Diamond)), Some(&1));
        assert_eq!(
            engine.drain_events(),
            vec![RuntimeEvent::ItemCollected {
                player_id: "a".to_string(),
                kind: ItemKind::Diamond,
                x: 1,
                y: 0,
            }]
        );
        assert_eq!(engine.build_summary().participants[0].items_collected, 1);
    }

    #[test]
    fn zombies_move_every_interval_moves() {
        let mut engine = scenario_engine();
        engine.options.zombie_move_interval = 2;
        seat(&mut engine, "a", cell(0, 4), 3);
        engine.zombies = vec![cell(7, 0)];

        let first = engine.try_move("a", Direction::Up).expect("first move");
        assert!(!first.zombies_moved);
        assert_eq!(engine.zombies(), &[cell(7, 0)]);

        let second = engine.try_move("a", Direction::Down).expect("second move");
        assert!(second.zombies_moved);
        assert_ne!(engine.zombies(), &[cell(7, 0)]);
        assert!(engine
            .drain_events()
            .contains(&RuntimeEvent::ZombiesMoved { count: 1 }));
        assert_eq!(engine.zombie_move_counter, 0);
    }

    #[test]
    fn zombie_tick_with_empty_roster_is_a_no_op() {
        let mut engine = scenario_engine();
        engine.zombies = vec![cell(1, 1), cell(5, 3)];
        engine.tick_zombies();
        engine.tick_zombies();
        assert_eq!(engine.zombies(), &[cell(1, 1), cell(5, 3)]);
    }

    #[test]
    fn join_rejections_leave_roster_unchanged() {
        let mut engine = scenario_engine();
        assert!(engine.add_player("a", 3).is_ok());
        assert_eq!(engine.add_player("a", 3), Err(JoinRejection::AlreadyJoined));

        engine.field = GeneratedField {
            width: 1,
            height: 1,
            required_items: 0,
            obstacles: BTreeSet::new(),
            items: BTreeMap::new(),
            portal: None,
        };
        engine.players.clear();
        assert!(engine.add_player("solo", 3).is_ok());
        assert_eq!(engine.add_player("late", 3), Err(JoinRejection::NoFreeCell));
        assert!(!engine.join_player("late", 3));
        assert_eq!(engine.roster(), vec!["solo"]);
    }

    #[test]
    fn identities_cycle_in_join_order() {
        let mut engine = GameEngine::new(
            3,
            Vec::new(),
            GameSettings::default(),
            EngineOptions::default(),
            Rng::new(11),
        );
        for (idx, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            engine.add_player(id, 3).expect("free cell");
            assert_eq!(engine.player_identity(id), Some(idx % IDENTITY_PALETTE_SIZE));
        }
    }

    #[test]
    fn joining_players_avoid_zombie_cells_when_possible() {
        let mut engine = scenario_engine();
        engine.field.items.clear();
        engine.field.portal = None;
        engine.field.obstacles.clear();
        engine.zombies = (0..8)
            .flat_map(|x| (0..5).map(move |y| cell(x, y)))
            .filter(|c| *c != cell(4, 4))
            .collect();
        assert_eq!(engine.add_player("a", 3), Ok(cell(4, 4)));
    }

    #[test]
    fn zero_lives_at_join_are_raised_to_one() {
        let mut engine = scenario_engine();
        engine.add_player("a", 0).expect("free cell");
        assert_eq!(engine.player_lives("a"), Some(1));
    }

    #[test]
    fn next_level_carries_lives_wins_and_identity_only() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(5, 2), 3);
        seat(&mut engine, "b", cell(0, 4), 1);
        seat(&mut engine, "c", cell(7, 4), 2);
        give_items(&mut engine, "a", 2);
        engine.zombies = vec![cell(1, 4), cell(7, 3)];

        assert!(engine.move_player("b", 1, 0));
        assert!(engine.move_player("c", 0, -1));
        assert!(engine.move_player("a", 1, 0));
        assert_eq!(engine.winner(), Some("a"));

        let next = GameEngine::create_next_level(&engine);
        assert_eq!(next.level, 2);
        assert_eq!(next.roster(), vec!["a", "c"]);
        assert_eq!(next.player_lives("a"), Some(3));
        assert_eq!(next.player_lives("c"), Some(1));
        assert_eq!(next.wins("a"), Some(1));
        assert_eq!(next.wins("c"), Some(0));
        assert_eq!(next.wins("b"), None);
        assert_eq!(next.player_identity("a"), Some(0));
        assert_eq!(next.player_identity("c"), Some(2));
        for id in ["a", "c"] {
            let inventory = next.inventory(id).expect("carried player");
            assert!(inventory.values().all(|count| *count == 0));
        }
        assert_eq!(next.state(), SessionState::Active);
        assert_eq!(next.winner(), None);
        assert_eq!(next.zombie_move_counter, 0);
        assert_eq!(next.build_summary().moves, 0);
    }

    #[test]
    fn next_level_spawns_are_disjoint() {
        for seed in 0..100u32 {
            let start = (0..4)
                .map(|idx| StartPlayer {
                    id: format!("p{idx}"),
                    lives: 3,
                })
                .collect();
            let first = GameEngine::new(
                seed % 5 + 1,
                start,
                GameSettings::default(),
                EngineOptions::default(),
                Rng::new(seed),
            );
            let next = GameEngine::create_next_level(&first);
            assert_spawns_disjoint(&next);
        }
    }

    #[test]
    fn initial_spawns_never_overlap() {
        for seed in 0..300u32 {
            let start = (0..4)
                .map(|idx| StartPlayer {
                    id: format!("p{idx}"),
                    lives: 3,
                })
                .collect();
            let engine = GameEngine::new(
                seed % 7 + 1,
                start,
                GameSettings::default(),
                EngineOptions::default(),
                Rng::new(seed),
            );
            assert_eq!(engine.roster().len(), 4);
            assert_spawns_disjoint(&engine);
        }
    }

    fn assert_spawns_disjoint(engine: &GameEngine) {
        let blocked = engine.field.blocked_cells();
        let players: Vec<Vec2> = engine.players.iter().map(|p| p.position).collect();
        let unique: HashSet<Vec2> = players.iter().copied().collect();
        assert_eq!(unique.len(), players.len());
        let zombies: HashSet<Vec2> = engine.zombies.iter().copied().collect();
        assert_eq!(zombies.len(), engine.zombies.len());
        for position in players.iter().chain(engine.zombies.iter()) {
            assert!(engine.field.in_bounds(*position));
            assert!(!blocked.contains(position));
        }
        assert!(unique.is_disjoint(&zombies));
    }

    #[test]
    fn same_seed_replays_identically() {
        let script = [
            Direction::Up,
            Direction::Left,
            Direction::Down,
            Direction::Right,
            Direction::Right,
            Direction::Up,
        ];
        let run = || {
            let mut engine = GameEngine::new(
                2,
                vec![
                    StartPlayer {
                        id: "a".to_string(),
                        lives: 3,
                    },
                    StartPlayer {
                        id: "b".to_string(),
                        lives: 3,
                    },
                ],
                GameSettings::default(),
                EngineOptions::default(),
                Rng::new(2024),
            );
            for dir in script {
                let _ = engine.try_move("a", dir);
                let _ = engine.try_move("b", dir);
            }
            snapshot_json(&engine)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn lives_never_increase_during_play() {
        for seed in 0..60u32 {
            let start = (0..3)
                .map(|idx| StartPlayer {
                    id: format!("p{idx}"),
                    lives: 2,
                })
                .collect();
            let mut engine = GameEngine::new(
                seed % 6 + 1,
                start,
                GameSettings::default(),
                EngineOptions::default(),
                Rng::new(seed),
            );
            let mut walker = Rng::new(seed ^ 0xdead_beef);
            let mut last_lives: BTreeMap<String, u32> = engine
                .players
                .iter()
                .map(|p| (p.id.clone(), p.lives))
                .collect();

            for _ in 0..400 {
                if engine.is_game_over() || engine.is_level_complete() {
                    break;
                }
                let roster: Vec<String> = engine.roster().iter().map(|id| id.to_string()).collect();
                let id = &roster[walker.pick_index(roster.len())];
                let dir = Direction::ALL[walker.pick_index(4)];
                if let Ok(outcome) = engine.try_move(id, dir) {
                    assert!(engine.field.is_walkable(outcome.position));
                }
                for (id, previous) in last_lives.iter_mut() {
                    match engine.player_lives(id) {
                        Some(lives) => {
                            assert!(lives <= *previous);
                            assert!(lives > 0);
                            *previous = lives;
                        }
                        None => *previous = 0,
                    }
                }
            }
        }
    }

    #[test]
    fn voluntary_leave_of_last_player_ends_the_game() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 0), 3);
        assert!(!engine.remove_player("ghost"));
        assert!(engine.remove_player("a"));
        assert!(engine.is_game_over());
        assert_eq!(
            engine.drain_events(),
            vec![
                RuntimeEvent::PlayerLeft {
                    player_id: "a".to_string(),
                },
                RuntimeEvent::GameOver { level: 1 },
            ]
        );
    }

    #[test]
    fn end_game_stops_further_moves() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 4), 3);
        engine.end_game();
        engine.end_game();
        assert_eq!(engine.state(), SessionState::GameOver);
        assert_eq!(
            engine.try_move("a", Direction::Up),
            Err(MoveRejection::GameOver)
        );
        assert_eq!(
            engine.drain_events(),
            vec![RuntimeEvent::GameOver { level: 1 }]
        );
    }

    #[test]
    fn level_without_portal_cannot_be_completed() {
        let mut engine = scenario_engine();
        engine.field.portal = None;
        seat(&mut engine, "a", cell(5, 2), 3);
        give_items(&mut engine, "a", 2);
        assert!(!engine.portal_active());

        for (dx, dy) in [(1, 0), (1, 0), (-1, 0), (-1, 0)] {
            assert!(engine.move_player("a", dx, dy));
            assert!(!engine.portal_active());
            assert_eq!(engine.winner(), None);
            assert_eq!(engine.state(), SessionState::Active);
        }
        assert!(!engine.is_level_complete());
        assert_eq!(engine.build_summary().outcome, LevelOutcome::InProgress);
        assert!(snapshot_json(&engine)["portal"].is_null());
    }

    #[test]
    fn leaving_marks_the_participant_until_rejoin() {
        let mut engine = scenario_engine();
        seat(&mut engine, "a", cell(0, 0), 3);
        seat(&mut engine, "b", cell(0, 4), 3);
        assert!(engine.remove_player("a"));
        assert!(!engine.is_game_over());

        let summary = engine.build_summary();
        let left: Vec<(&str, bool)> = summary
            .participants
            .iter()
            .map(|p| (p.player_id.as_str(), p.left))
            .collect();
        assert_eq!(left, vec![("a", true), ("b", false)]);
        assert!(!summary.participants[0].eliminated);

        engine.add_player("a", 3).expect("rejoin");
        assert!(engine.build_summary().participants.iter().all(|p| !p.left));
    }
}
