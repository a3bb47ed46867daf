//! Abrsim Core - Adaptive-bitrate player simulation over bandwidth traces
//!
//! A player advances in fixed ticks of simulated time against a recorded
//! mobile-link bandwidth trace, downloading fixed-duration chunks at a
//! rung of a bitrate ladder and playing them back from a buffer. The
//! rate-selection policy is the object under evaluation: warm-up follows
//! a geometric-mean capacity estimate, a low buffer forces the floor
//! rung, and steady state is buffer-driven with single-step upswitches,
//! a downswitch cooldown window, a sustainability projection and a
//! minimum dwell between upswitches.
//!
//! # Example
//!
//! ```rust
//! use abrsim_core::config::PlayerConfig;
//! use abrsim_core::player::Player;
//! use abrsim_core::trace::{BandwidthTrace, TraceSample};
//!
//! let samples = (0..60).map(|_| TraceSample::with_bandwidth(1000, 1000)).collect();
//! let trace = BandwidthTrace::from_samples("constant", samples);
//!
//! let mut player = Player::new(&trace, PlayerConfig::default()).unwrap();
//! let report = player.run();
//! assert!(report.utilization_percent().is_some());
//! ```

pub mod config;
pub mod ladder;
pub mod player;
pub mod trace;
pub mod tracing_setup;

pub use config::{ConfigError, PlayerConfig, SimConfig};
pub use ladder::{BitrateLadder, LadderError, Rung};
pub use player::{Player, RunReport, TickOutcome, TickRecord};
pub use trace::{BandwidthTrace, TraceCursor, TraceError, TraceSample};

/// Errors that can bubble up from any abrsim subsystem.
#[derive(Debug, thiserror::Error)]
pub enum AbrError {
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Ladder error: {0}")]
    Ladder(#[from] LadderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AbrError {
    /// Returns a short message suitable for display to a user.
    pub fn user_message(&self) -> String {
        match self {
            AbrError::Trace(TraceError::Io { path, .. }) => {
                format!("Could not read trace {}", path.display())
            }
            AbrError::Trace(e) => format!("Malformed trace: {e}"),
            AbrError::Ladder(e) => format!("Invalid bitrate ladder: {e}"),
            AbrError::Config(e) => format!("Invalid configuration: {e}"),
            AbrError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AbrError::Config(_) | AbrError::Ladder(_) | AbrError::Trace(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AbrError>;
