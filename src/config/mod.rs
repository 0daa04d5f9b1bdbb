//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::collision::Rect;

/// Highest tick rate accepted; keeps the tick period at a whole millisecond or more
pub const MAX_TICK_RATE: u32 = 1_000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (empty = any origin)
    pub client_origins: Vec<String>,
    /// Max inbound WebSocket messages per second per connection
    pub input_rate_limit: u32,
    /// Simulation tuning and arena layout
    pub arena: ArenaConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut arena = ArenaConfig::default();
        if let Some(tick_rate) = parse_var::<u32>("TICK_RATE")? {
            arena.tick_rate = tick_rate;
        }
        if let Some(map_size) = parse_var::<f32>("MAP_SIZE")? {
            arena.map_size = map_size;
        }
        if let Ok(raw) = env::var("ARENA_OBSTACLES") {
            arena.obstacles = serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                var: "ARENA_OBSTACLES",
                reason: e.to_string(),
            })?;
        }
        arena.seed = parse_var::<u64>("ARENA_SEED")?;
        arena.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origins,

            input_rate_limit: parse_var::<u32>("INPUT_RATE_LIMIT")?
                .unwrap_or(crate::util::rate_limit::INPUT_RATE_LIMIT),

            arena,
        })
    }
}

/// Parse an optional environment variable, failing only when it is set but malformed
fn parse_var<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Arena layout and simulation tuning.
///
/// Speeds are expressed in world units per tick, not per second, so changing
/// the tick rate changes the pace of the game.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Side length of the square arena
    pub map_size: f32,
    /// Static obstacle layout
    pub obstacles: Vec<Rect>,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Player collision radius against walls and obstacles
    pub player_radius: f32,
    /// Distance under which a bullet hits a player
    pub hit_radius: f32,
    /// Bounces a bullet survives before it is retired
    pub max_bounces: u32,
    /// Player movement per held key per input
    pub move_speed: f32,
    /// Bullet displacement per tick
    pub bullet_speed: f32,
    /// Integration sub-steps per tick
    pub substeps: u32,
    /// Distance from each border excluded from spawning
    pub spawn_margin: f32,
    /// Display names are truncated to this many characters
    pub name_max_chars: usize,
    /// RNG seed; random when unset
    pub seed: Option<u64>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            map_size: 800.0,
            obstacles: vec![
                Rect::new(100.0, 100.0, 200.0, 20.0),
                Rect::new(500.0, 300.0, 20.0, 300.0),
                Rect::new(100.0, 500.0, 400.0, 20.0),
                // Center pillar
                Rect::new(400.0, 100.0, 20.0, 200.0),
            ],
            tick_rate: 60,
            player_radius: 15.0,
            hit_radius: 20.0,
            max_bounces: 3,
            move_speed: 5.0,
            bullet_speed: 10.0,
            substeps: 5,
            spawn_margin: 50.0,
            name_max_chars: 12,
            seed: None,
        }
    }
}

impl ArenaConfig {
    /// Duration of one simulation tick
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }

    /// Reject layouts the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::Invalid {
                var: "TICK_RATE",
                reason: format!("must be between 1 and {}", MAX_TICK_RATE),
            });
        }
        if !self.map_size.is_finite() || self.map_size <= self.spawn_margin * 2.0 {
            return Err(ConfigError::Invalid {
                var: "MAP_SIZE",
                reason: format!("must exceed twice the spawn margin ({})", self.spawn_margin),
            });
        }
        if self.substeps == 0 {
            return Err(ConfigError::Invalid {
                var: "substeps",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(bad) = self.obstacles.iter().find(|r| !r.is_well_formed()) {
            return Err(ConfigError::Invalid {
                var: "ARENA_OBSTACLES",
                reason: format!("obstacle {:?} has a non-positive or non-finite extent", bad),
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_arena_is_valid() {
        let arena = ArenaConfig::default();
        assert!(arena.validate().is_ok());
        assert_eq!(arena.obstacles.len(), 4);
        assert_eq!(arena.tick_duration(), Duration::from_micros(16_666));
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let arena = ArenaConfig {
            tick_rate: 0,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            arena.validate(),
            Err(ConfigError::Invalid { var: "TICK_RATE", .. })
        ));
    }

    #[test]
    fn rejects_tick_rate_with_zero_period() {
        let arena = ArenaConfig {
            tick_rate: 2_000_000,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            arena.validate(),
            Err(ConfigError::Invalid { var: "TICK_RATE", .. })
        ));

        let fastest = ArenaConfig {
            tick_rate: MAX_TICK_RATE,
            ..ArenaConfig::default()
        };
        assert!(fastest.validate().is_ok());
        assert!(!fastest.tick_duration().is_zero());
    }

    #[test]
    fn rejects_arena_smaller_than_spawn_area() {
        let arena = ArenaConfig {
            map_size: 90.0,
            ..ArenaConfig::default()
        };
        assert!(arena.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_obstacle() {
        let arena = ArenaConfig {
            obstacles: vec![Rect::new(10.0, 10.0, 0.0, 5.0)],
            ..ArenaConfig::default()
        };
        assert!(arena.validate().is_err());
    }

    #[test]
    fn obstacles_parse_from_json() {
        let obstacles: Vec<Rect> =
            serde_json::from_str(r#"[{"x":1,"y":2,"w":3,"h":4}]"#).unwrap();
        assert_eq!(obstacles, vec![Rect::new(1.0, 2.0, 3.0, 4.0)]);
    }
}
