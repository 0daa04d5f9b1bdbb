//! Arena state and authoritative tick loop

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::util::time::{unix_millis, Timer};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::collision::ArenaGeometry;
use super::combat::{Bullet, CombatSystem, HitResult, WeaponStats};
use super::movement::{HeldKeys, MoveOutcome, MovementSystem};
use super::session::{PlayerId, SessionRegistry, SpawnArea};
use super::snapshot::SnapshotBuilder;
use super::{ArenaCommand, PlayerInput};

/// Simulation state (owned by the arena task)
pub struct ArenaState {
    pub config: ArenaConfig,
    /// Seed the RNG was created from, logged for reproducing a session
    pub seed: u64,
    pub tick: u64,
    pub registry: SessionRegistry,
    pub bullets: Vec<Bullet>,
    pub weapon: WeaponStats,
    pub rng: ChaCha8Rng,
    snapshot_builder: SnapshotBuilder,
}

impl ArenaState {
    pub fn new(config: ArenaConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let spawn = SpawnArea::new(config.map_size, config.spawn_margin)
            .avoiding(config.obstacles.clone(), config.player_radius);

        Self {
            seed,
            tick: 0,
            registry: SessionRegistry::new(spawn, config.name_max_chars),
            bullets: Vec::new(),
            weapon: WeaponStats::from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            snapshot_builder: SnapshotBuilder::new(config.obstacles.clone()),
            config,
        }
    }

    /// Register a new connection
    pub fn connect(&mut self) -> PlayerId {
        self.registry.connect(&mut self.rng)
    }

    /// Enter the match; unknown ids are ignored
    pub fn join(&mut self, player_id: PlayerId, name: &str) -> bool {
        self.registry.join(player_id, name, &mut self.rng)
    }

    /// Apply movement keys and aim immediately
    pub fn apply_input(&mut self, player_id: PlayerId, keys: &HeldKeys, angle: f32) -> MoveOutcome {
        let geometry = ArenaGeometry::new(self.config.map_size, &self.config.obstacles);
        match self.registry.get_mut(&player_id) {
            Some(player) => MovementSystem::resolve_move(
                player,
                keys,
                angle,
                self.config.move_speed,
                self.config.player_radius,
                &geometry,
            ),
            None => MoveOutcome::Ignored,
        }
    }

    /// Queue a bullet; it first moves on the next tick
    pub fn shoot(&mut self, player_id: PlayerId, angle: f32) -> bool {
        match CombatSystem::fire(&self.registry, player_id, angle, &self.weapon) {
            Some(bullet) => {
                self.bullets.push(bullet);
                true
            }
            None => false,
        }
    }

    /// Remove a player. Bullets it already fired keep flying.
    pub fn disconnect(&mut self, player_id: PlayerId) -> bool {
        self.registry.disconnect(player_id).is_some()
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) -> Vec<HitResult> {
        self.tick += 1;
        let geometry = ArenaGeometry::new(self.config.map_size, &self.config.obstacles);
        CombatSystem::step(
            &mut self.bullets,
            &mut self.registry,
            &geometry,
            &self.weapon,
            &mut self.rng,
        )
    }

    /// Owned copy of the world for broadcast
    pub fn snapshot(&self) -> ServerMsg {
        self.snapshot_builder
            .build(self.tick, &self.registry, &self.bullets)
    }
}

/// Counters readable outside the arena task
#[derive(Debug, Default)]
pub struct ArenaStats {
    pub connected_players: AtomicUsize,
    pub active_players: AtomicUsize,
    pub tick: AtomicU64,
}

/// Handle to the running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub command_tx: mpsc::Sender<ArenaCommand>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub stats: Arc<ArenaStats>,
}

impl ArenaHandle {
    /// Register a connection. The snapshot receiver is subscribed before the
    /// player exists, so no state containing the player is missed.
    /// Returns None once the arena has stopped.
    pub async fn connect(&self) -> Option<(PlayerId, broadcast::Receiver<ServerMsg>)> {
        let snapshot_rx = self.snapshot_tx.subscribe();
        let (reply, reply_rx) = oneshot::channel();
        self.command_tx
            .send(ArenaCommand::Connect { reply })
            .await
            .ok()?;
        let player_id = reply_rx.await.ok()?;
        Some((player_id, snapshot_rx))
    }

    /// Forward a validated intent; false once the arena has stopped
    pub async fn send_input(&self, input: PlayerInput) -> bool {
        self.command_tx
            .send(ArenaCommand::Input(input))
            .await
            .is_ok()
    }

    pub async fn disconnect(&self, player_id: PlayerId) {
        let _ = self
            .command_tx
            .send(ArenaCommand::Disconnect { player_id })
            .await;
    }

    pub fn connected_players(&self) -> usize {
        self.stats.connected_players.load(Ordering::Relaxed)
    }

    pub fn active_players(&self) -> usize {
        self.stats.active_players.load(Ordering::Relaxed)
    }

    pub fn tick(&self) -> u64 {
        self.stats.tick.load(Ordering::Relaxed)
    }
}

/// The authoritative arena
pub struct Arena {
    state: ArenaState,
    command_rx: mpsc::Receiver<ArenaCommand>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    stats: Arc<ArenaStats>,
}

impl Arena {
    /// Create an arena and the handle used to reach it
    pub fn new(config: ArenaConfig) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let (snapshot_tx, _) = broadcast::channel(64);
        let stats = Arc::new(ArenaStats::default());

        let handle = ArenaHandle {
            command_tx,
            snapshot_tx: snapshot_tx.clone(),
            stats: stats.clone(),
        };

        let arena = Self {
            state: ArenaState::new(config),
            command_rx,
            snapshot_tx,
            stats,
        };

        (arena, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped.
    ///
    /// Commands and ticks are handled one at a time, so an intent always runs
    /// to completion before the next tick. An overrunning tick delays the
    /// following one rather than triggering a catch-up burst.
    pub async fn run(mut self) {
        let tick_duration = self.state.config.tick_duration();
        info!(
            tick_rate = self.state.config.tick_rate,
            map_size = self.state.config.map_size,
            obstacles = self.state.config.obstacles.len(),
            seed = self.state.seed,
            "Arena started"
        );

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = tick_interval.tick() => {
                    let timer = Timer::new();
                    self.run_tick();
                    if timer.elapsed() > tick_duration {
                        warn!(
                            tick = self.state.tick,
                            elapsed_micros = timer.elapsed_micros(),
                            "Tick overran its period"
                        );
                    }
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        info!(tick = self.state.tick, "Arena stopped");
    }

    fn handle_command(&mut self, command: ArenaCommand) {
        match command {
            ArenaCommand::Connect { reply } => {
                let player_id = self.state.connect();
                info!(player_id = %player_id, "Player connected");
                if reply.send(player_id).is_err() {
                    // Connection went away before it learned its id
                    self.state.disconnect(player_id);
                }
            }
            ArenaCommand::Input(input) => self.handle_input(input),
            ArenaCommand::Disconnect { player_id } => {
                if self.state.disconnect(player_id) {
                    info!(player_id = %player_id, "Player disconnected");
                }
            }
        }
        self.update_stats();
    }

    fn handle_input(&mut self, input: PlayerInput) {
        let player_id = input.player_id;
        match input.msg {
            ClientMsg::JoinGame { name } => {
                if self.state.join(player_id, &name) {
                    info!(
                        player_id = %player_id,
                        name = %name,
                        queued_ms = unix_millis().saturating_sub(input.received_at),
                        "Player joined match"
                    );
                } else {
                    debug!(player_id = %player_id, "Join from unknown session ignored");
                }
            }
            ClientMsg::Input { keys, angle } => {
                self.state.apply_input(player_id, &keys, angle);
            }
            ClientMsg::Shoot { angle } => {
                if !self.state.shoot(player_id, angle) {
                    debug!(player_id = %player_id, "Shot from inactive session ignored");
                }
            }
        }
    }

    /// Run a single simulation tick and broadcast the result
    fn run_tick(&mut self) {
        for hit in self.state.step() {
            info!(
                shooter_id = %hit.shooter_id,
                target_id = %hit.target_id,
                x = hit.x,
                y = hit.y,
                "Player killed"
            );
        }

        // No receivers is not an error: nobody is connected
        let _ = self.snapshot_tx.send(self.state.snapshot());
        self.update_stats();
    }

    fn update_stats(&self) {
        self.stats
            .connected_players
            .store(self.state.registry.len(), Ordering::Relaxed);
        self.stats
            .active_players
            .store(self.state.registry.active_count(), Ordering::Relaxed);
        self.stats.tick.store(self.state.tick, Ordering::Relaxed);
    }
}
