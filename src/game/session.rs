//! Session registry - one player record per live connection

use rand::Rng;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use super::collision::{ArenaGeometry, Rect};

/// Opaque, connection-scoped player identifier
pub type PlayerId = Uuid;

/// Authoritative player record
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    /// Aim angle in radians
    pub angle: f32,
    /// CSS color string
    pub color: String,
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
    /// Joined the match (false while spectating in the lobby)
    pub active: bool,
}

/// Redraws before giving up on finding free space
const MAX_SPAWN_ATTEMPTS: usize = 1_000;

/// Uniform spawn area: the arena inset by a margin on every side, minus any
/// point where a player would overlap an obstacle
#[derive(Debug, Clone)]
pub struct SpawnArea {
    pub min: f32,
    pub max: f32,
    map_size: f32,
    obstacles: Vec<Rect>,
    player_radius: f32,
}

impl SpawnArea {
    pub fn new(map_size: f32, margin: f32) -> Self {
        Self {
            min: margin,
            max: map_size - margin,
            map_size,
            obstacles: Vec::new(),
            player_radius: 0.0,
        }
    }

    /// Exclude points that collide with `obstacles` at `player_radius`
    pub fn avoiding(mut self, obstacles: Vec<Rect>, player_radius: f32) -> Self {
        self.obstacles = obstacles;
        self.player_radius = player_radius;
        self
    }

    /// Rejection-sample a free point from the inset square
    pub fn sample<R: Rng>(&self, rng: &mut R) -> (f32, f32) {
        let mut point = self.draw(rng);
        for _ in 1..MAX_SPAWN_ATTEMPTS {
            if self.is_free(point.0, point.1) {
                return point;
            }
            point = self.draw(rng);
        }

        if !self.is_free(point.0, point.1) {
            warn!(x = point.0, y = point.1, "No free spawn point found, spawning blocked");
        }
        point
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> (f32, f32) {
        (
            rng.gen_range(self.min..=self.max),
            rng.gen_range(self.min..=self.max),
        )
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (self.min..=self.max).contains(&x) && (self.min..=self.max).contains(&y)
    }

    /// Inside the inset square and clear of every obstacle
    pub fn is_free(&self, x: f32, y: f32) -> bool {
        let geometry = ArenaGeometry::new(self.map_size, &self.obstacles);
        self.contains(x, y) && !geometry.collides(x, y, self.player_radius)
    }
}

/// Truncate a display name to at most `max_chars` characters
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}

/// All connected players, active or not
pub struct SessionRegistry {
    players: HashMap<PlayerId, Player>,
    spawn: SpawnArea,
    name_max_chars: usize,
}

impl SessionRegistry {
    pub fn new(spawn: SpawnArea, name_max_chars: usize) -> Self {
        Self {
            players: HashMap::new(),
            spawn,
            name_max_chars,
        }
    }

    /// Register a new connection as an inactive spectator
    pub fn connect<R: Rng>(&mut self, rng: &mut R) -> PlayerId {
        let id = Uuid::new_v4();
        let (x, y) = self.spawn.sample(rng);
        let hue = rng.gen_range(0.0..360.0_f32);

        self.players.insert(
            id,
            Player {
                id,
                x,
                y,
                angle: 0.0,
                color: format!("hsl({:.0}, 70%, 50%)", hue),
                name: String::new(),
                kills: 0,
                deaths: 0,
                active: false,
            },
        );

        id
    }

    /// Activate a player and place it in the arena.
    ///
    /// Re-joining keeps kills and deaths. Returns false for unknown ids.
    pub fn join<R: Rng>(&mut self, id: PlayerId, name: &str, rng: &mut R) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };

        let (x, y) = self.spawn.sample(rng);
        player.name = truncate_name(name, self.name_max_chars);
        player.active = true;
        player.x = x;
        player.y = y;
        true
    }

    /// Remove a player; returns the removed record if it existed
    pub fn disconnect(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Move a player to a fresh random spawn point
    pub fn respawn<R: Rng>(&mut self, id: PlayerId, rng: &mut R) {
        if let Some(player) = self.players.get_mut(&id) {
            let (x, y) = self.spawn.sample(rng);
            player.x = x;
            player.y = y;
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Active player in the registry
    pub fn active(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id).filter(|p| p.active)
    }

    /// Ids of currently active players, copied out so callers may mutate the
    /// registry while walking them
    pub fn active_ids(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.active)
            .map(|p| p.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn active_count(&self) -> usize {
        self.players.values().filter(|p| p.active).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
