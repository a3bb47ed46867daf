//! Centralized configuration for abrsim.
//!
//! Every tunable of the player model is defined here so the algorithm
//! code never carries bare constants.

use std::path::PathBuf;

use crate::ladder::BitrateLadder;
use crate::player::NetworkOverhead;
use crate::tracing_setup::CliLogLevel;

/// Errors from configuration validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Player count must be at least 1")]
    ZeroPlayers,

    #[error("Tick step must be non-zero")]
    ZeroStep,

    #[error("Chunk duration must be non-zero")]
    ZeroChunkDuration,

    #[error("Target buffer jitter {jitter_ms} ms exceeds target buffer {target_ms} ms")]
    JitterExceedsTarget { jitter_ms: u64, target_ms: u64 },

    #[error("Packet header of {header_bytes} bytes leaves no payload in a {mtu_bytes} byte MTU")]
    NoPacketPayload { mtu_bytes: u64, header_bytes: u64 },
}

/// Central configuration for a simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
}

/// Parameters of one simulated player and its rate-selection policy.
///
/// All durations are in milliseconds of simulated time.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Simulated time advanced by each tick
    pub step_ms: u64,
    /// Media duration of one chunk
    pub chunk_duration_ms: u64,
    /// Buffer level below which a new chunk is requested
    pub target_buffer_ms: u64,
    /// Maximum jitter applied to the target buffer, either direction
    pub target_jitter_ms: u64,
    /// Low-buffer threshold shared by starvation and sustainability checks
    pub low_buffer_ms: u64,
    /// Decisions before this time use the capacity estimate
    pub warmup_ms: u64,
    /// Length of the hysteresis window after a downswitch
    pub hysteresis_window_ms: u64,
    /// Minimum time between two accepted upswitches
    pub upswitch_dwell_ms: u64,
    /// Buffer that must be rebuilt before playback resumes after a stall
    pub rebuffer_threshold_ms: u64,
    /// How far ahead the sustainability check projects the buffer
    pub sustainability_horizon_ms: u64,
    /// Gain applied to the square root of the buffer level
    pub buffer_gain: f64,
    /// Packet header overhead model
    pub overhead: NetworkOverhead,
    /// Available encoding rates
    pub ladder: BitrateLadder,
    /// Players sharing the bottleneck link
    pub players: u32,
    /// Seed for the target buffer jitter
    pub seed: u64,
    /// Keep the per-tick and per-decision logs in the run report
    pub record_ticks: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            step_ms: 200,
            chunk_duration_ms: 2000,
            target_buffer_ms: 30_000,
            target_jitter_ms: 500,
            low_buffer_ms: 5000,
            warmup_ms: 1000,
            hysteresis_window_ms: 5000,
            upswitch_dwell_ms: 5000,
            rebuffer_threshold_ms: 1000,
            sustainability_horizon_ms: 5000,
            buffer_gain: 8.0,
            overhead: NetworkOverhead::default(),
            ladder: BitrateLadder::default(),
            players: 1,
            seed: 42,
            record_ticks: true,
        }
    }
}

impl PlayerConfig {
    /// Checks the configuration for values the tick loop cannot run with.
    ///
    /// # Errors
    /// - `ConfigError::ZeroPlayers` - No players sharing the link
    /// - `ConfigError::ZeroStep` - Tick step of zero
    /// - `ConfigError::ZeroChunkDuration` - Chunks of zero duration
    /// - `ConfigError::JitterExceedsTarget` - Jitter could drive the target negative
    /// - `ConfigError::NoPacketPayload` - Headers fill the whole MTU
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 {
            return Err(ConfigError::ZeroPlayers);
        }
        if self.step_ms == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.chunk_duration_ms == 0 {
            return Err(ConfigError::ZeroChunkDuration);
        }
        if self.target_jitter_ms > self.target_buffer_ms {
            return Err(ConfigError::JitterExceedsTarget {
                jitter_ms: self.target_jitter_ms,
                target_ms: self.target_buffer_ms,
            });
        }
        if self.overhead.payload_bits_per_packet() == 0 {
            return Err(ConfigError::NoPacketPayload {
                mtu_bytes: self.overhead.mtu_bytes,
                header_bytes: self.overhead.header_bytes,
            });
        }
        Ok(())
    }

    /// Same configuration with a different player count.
    pub fn with_players(mut self, players: u32) -> Self {
        self.players = players;
        self
    }

    /// Same configuration with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Console and file logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level shown on the console
    pub console_level: CliLogLevel,
    /// Directory for the full trace-level log, `None` disables the file
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: CliLogLevel::Info,
            log_dir: None,
        }
    }
}

impl SimConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparsable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(seed) = env_value::<u64>("ABRSIM_SEED") {
            config.player.seed = seed;
        }

        if let Some(players) = env_value::<u32>("ABRSIM_PLAYERS") {
            config.player.players = players;
        }

        if let Some(target) = env_value::<u64>("ABRSIM_TARGET_BUFFER_MS") {
            config.player.target_buffer_ms = target;
        }

        if let Some(low) = env_value::<u64>("ABRSIM_LOW_BUFFER_MS") {
            config.player.low_buffer_ms = low;
        }

        if let Ok(dir) = std::env::var("ABRSIM_LOG_DIR") {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        config
    }

    /// Creates a configuration for fast, reproducible tests.
    pub fn for_testing() -> Self {
        Self {
            player: PlayerConfig {
                seed: 7,
                record_ticks: true,
                ..Default::default()
            },
            logging: LoggingConfig {
                console_level: CliLogLevel::Warn,
                log_dir: None,
            },
        }
    }
}

fn env_value<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}
