use std::collections::HashMap;

use log::info;

use crate::engine::GameEngine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(pub u64);

/// Explicit owner of live sessions, keyed by handle.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionHandle, GameEngine>,
    next_handle: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, engine: GameEngine) -> SessionHandle {
        self.next_handle += 1;
        let handle = SessionHandle(self.next_handle);
        self.sessions.insert(handle, engine);
        handle
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&GameEngine> {
        self.sessions.get(&handle)
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut GameEngine> {
        self.sessions.get_mut(&handle)
    }

    pub fn destroy(&mut self, handle: SessionHandle) -> Option<GameEngine> {
        self.sessions.remove(&handle)
    }

    /// Swaps a completed level for the next one under the same handle.
    pub fn advance_level(&mut self, handle: SessionHandle) -> bool {
        let Some(engine) = self.sessions.get_mut(&handle) else {
            return false;
        };
        if !engine.is_level_complete() || engine.is_game_over() {
            return false;
        }
        let next = GameEngine::create_next_level(engine);
        info!("session {}: advanced to level {}", handle.0, next.level);
        *engine = next;
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
