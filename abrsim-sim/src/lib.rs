//! Abrsim Simulation Framework - Reproducible experiments over the player model.

#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! This crate runs the single-player model of `abrsim-core` under
//! controlled conditions: many players sharing one link, synthetic traces
//! with known shape, and post-run invariant checks.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same seed always produces identical results
//! - **Shared Links**: A fleet of players divides one trace evenly
//! - **Invariant Checking**: Validate selection behavior after every run
//! - **Scenario Library**: Constant, step-drop and bursty synthetic traces
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use abrsim_core::config::PlayerConfig;
//! use abrsim_sim::{Fleet, check_all, scenarios::constant_trace};
//!
//! # fn main() -> Result<(), abrsim_sim::SimError> {
//! let trace = Arc::new(constant_trace(3000, 30_000));
//! let config = PlayerConfig::default().with_players(3);
//!
//! let fleet = Fleet::new(trace, config.clone())?;
//! let report = fleet.run()?;
//! for player in &report.players {
//!     assert!(check_all(player, &config).is_empty());
//! }
//! # Ok(())
//! # }
//! ```

pub mod fleet;
pub mod invariants;
pub mod rng;
pub mod scenarios;

use abrsim_core::config::ConfigError;
pub use fleet::{Fleet, FleetReport};
pub use invariants::{
    BufferCeilingInvariant, Invariant, InvariantSet, InvariantViolation, LadderBoundsInvariant,
    SingleStepUpswitchInvariant, UpswitchDwellInvariant, check_all,
};
pub use rng::DeterministicRng;
pub use scenarios::{Scenario, bursty_trace, constant_trace, step_drop_trace};

/// Errors that can occur while running simulations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid player configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Player {index} task failed: {reason}")]
    PlayerTask { index: usize, reason: String },
}

/// Common simulation result type for convenience.
pub type Result<T> = std::result::Result<T, SimError>;
