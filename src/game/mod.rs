//! Game simulation modules

pub mod arena;
pub mod collision;
pub mod combat;
pub mod movement;
pub mod session;
pub mod snapshot;

pub use arena::{Arena, ArenaHandle};
pub use session::PlayerId;

use tokio::sync::oneshot;

use crate::ws::protocol::ClientMsg;

/// Validated client intent received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub player_id: PlayerId,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Work for the arena task, applied in arrival order
#[derive(Debug)]
pub enum ArenaCommand {
    /// New connection; the arena replies with the assigned id
    Connect { reply: oneshot::Sender<PlayerId> },
    Input(PlayerInput),
    Disconnect { player_id: PlayerId },
}
