//! Snapshot building for network transmission

use std::collections::BTreeMap;

use crate::ws::protocol::{BulletView, PlayerView, ServerMsg};

use super::collision::Rect;
use super::combat::Bullet;
use super::session::SessionRegistry;

/// Builds the per-tick world snapshot.
///
/// Every client receives the same message; there is no interest management.
pub struct SnapshotBuilder {
    obstacles: Vec<Rect>,
}

impl SnapshotBuilder {
    pub fn new(obstacles: Vec<Rect>) -> Self {
        Self { obstacles }
    }

    /// Copy the current world into an owned message
    pub fn build(&self, tick: u64, registry: &SessionRegistry, bullets: &[Bullet]) -> ServerMsg {
        let players: BTreeMap<_, _> = registry
            .iter()
            .map(|p| {
                (
                    p.id,
                    PlayerView {
                        x: p.x,
                        y: p.y,
                        angle: p.angle,
                        color: p.color.clone(),
                        name: p.name.clone(),
                        kills: p.kills,
                        deaths: p.deaths,
                        active: p.active,
                    },
                )
            })
            .collect();

        let bullets = bullets
            .iter()
            .map(|b| BulletView { x: b.x, y: b.y })
            .collect();

        ServerMsg::State {
            tick,
            players,
            bullets,
            obstacles: self.obstacles.clone(),
        }
    }
}
