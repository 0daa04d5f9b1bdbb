//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Arena, ArenaHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
}

impl AppState {
    /// Build the state and the arena it talks to. The caller spawns the arena.
    pub fn new(config: Config) -> (Self, Arena) {
        let config = Arc::new(config);

        // Initialize the single authoritative arena
        let (arena, handle) = Arena::new(config.arena.clone());

        let state = Self {
            config,
            arena: handle,
        };

        (state, arena)
    }
}
