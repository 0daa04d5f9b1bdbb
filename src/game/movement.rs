//! Player movement against static geometry

use serde::{Deserialize, Serialize};

use super::collision::ArenaGeometry;
use super::session::Player;

/// Directional keys held by the client, keyed WASD on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldKeys {
    #[serde(rename = "w")]
    pub up: bool,
    #[serde(rename = "a")]
    pub left: bool,
    #[serde(rename = "s")]
    pub down: bool,
    #[serde(rename = "d")]
    pub right: bool,
}

impl HeldKeys {
    /// Unnormalized direction: each held key contributes a unit on its axis,
    /// so diagonals are faster by a factor of √2.
    pub fn direction(&self) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.up {
            dy -= 1.0;
        }
        if self.down {
            dy += 1.0;
        }
        if self.left {
            dx -= 1.0;
        }
        if self.right {
            dx += 1.0;
        }
        (dx, dy)
    }
}

/// Outcome of a movement request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Player is not in the match
    Ignored,
    /// Candidate position accepted
    Moved,
    /// Candidate collided; position unchanged, aim still applied
    Blocked,
}

/// Movement system for resolving player input
pub struct MovementSystem;

impl MovementSystem {
    /// Candidate position for the given keys, before any collision test
    pub fn propose(x: f32, y: f32, keys: &HeldKeys, speed: f32) -> (f32, f32) {
        let (dx, dy) = keys.direction();
        (x + dx * speed, y + dy * speed)
    }

    /// Apply one input to a player.
    ///
    /// The whole move is rejected on collision; there is no sliding along
    /// walls, so pushing diagonally into a wall stops the player for that input.
    pub fn resolve_move(
        player: &mut Player,
        keys: &HeldKeys,
        angle: f32,
        speed: f32,
        radius: f32,
        geometry: &ArenaGeometry<'_>,
    ) -> MoveOutcome {
        if !player.active {
            return MoveOutcome::Ignored;
        }

        player.angle = angle;

        let (new_x, new_y) = Self::propose(player.x, player.y, keys, speed);
        if geometry.collides(new_x, new_y, radius) {
            return MoveOutcome::Blocked;
        }

        player.x = new_x;
        player.y = new_y;
        MoveOutcome::Moved
    }
}
