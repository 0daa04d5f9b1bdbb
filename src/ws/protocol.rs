//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::game::collision::Rect;
use crate::game::movement::HeldKeys;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Leave the lobby and enter the match
    JoinGame {
        /// Display name, truncated server-side
        name: String,
    },

    /// Movement keys and aim for this frame
    Input {
        keys: HeldKeys,
        /// Aim direction in radians
        angle: f32,
    },

    /// Fire a bullet
    Shoot {
        /// Firing direction in radians
        angle: f32,
    },
}

impl ClientMsg {
    /// Reject intents that parse but carry unusable values
    pub fn validate(&self) -> Result<(), IntentError> {
        match self {
            ClientMsg::JoinGame { name } => {
                if name.trim().is_empty() {
                    return Err(IntentError::EmptyName);
                }
            }
            ClientMsg::Input { angle, .. } | ClientMsg::Shoot { angle } => {
                if !angle.is_finite() {
                    return Err(IntentError::NonFiniteAngle);
                }
            }
        }
        Ok(())
    }
}

/// Malformed client intents, discarded before they reach the simulation
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("Unparseable message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Angle must be a finite number")]
    NonFiniteAngle,

    #[error("Name must not be empty")]
    EmptyName,
}

/// Parse and validate one text frame
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, IntentError> {
    let msg: ClientMsg = serde_json::from_str(text)?;
    msg.validate()?;
    Ok(msg)
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once to a new connection
    Welcome {
        player_id: Uuid,
        server_time: u64,
    },

    /// Full world state, broadcast every tick
    State {
        /// Server tick number
        tick: u64,
        /// Every connected player, keyed by id
        players: BTreeMap<Uuid, PlayerView>,
        /// Live bullets
        bullets: Vec<BulletView>,
        /// Static arena layout
        obstacles: Vec<Rect>,
    },
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    /// Aim angle in radians
    pub angle: f32,
    pub color: String,
    pub name: String,
    pub kills: u32,
    pub deaths: u32,
    /// In the match rather than the lobby
    pub active: bool,
}

/// Bullet position in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletView {
    pub x: f32,
    pub y: f32,
}
