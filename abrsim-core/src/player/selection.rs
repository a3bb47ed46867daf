//! Rate selection policy invoked whenever a new chunk is scheduled.
//!
//! Three phases, checked in order:
//! - warm-up: follow the geometric-mean capacity estimate,
//! - starvation: force the floor rung while the buffer is low,
//! - steady state: derive a target from the buffer level, then apply
//!   single-step upswitches, the downswitch cooldown window, the
//!   sustainability projection and the upswitch dwell time.

use serde::{Deserialize, Serialize};

use super::estimator::GeometricMeanEstimator;
use crate::config::PlayerConfig;
use crate::ladder::{BitrateLadder, Rung};

/// Which branch of the policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    WarmUp,
    Starvation,
    SteadyState,
}

/// Player state the policy looks at.
#[derive(Debug, Clone, Copy)]
pub struct SelectionInput {
    pub time_ms: u64,
    pub buffer_ms: u64,
    /// Effective bandwidth of the current tick
    pub bandwidth_kbps: u64,
    /// Rung selected for the previous chunk
    pub current: Rung,
}

/// Outcome of one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub time_ms: u64,
    pub phase: Phase,
    pub previous: Rung,
    pub rung: Rung,
}

impl Decision {
    pub fn is_upswitch(&self) -> bool {
        self.rung.rank > self.previous.rank
    }

    pub fn is_downswitch(&self) -> bool {
        self.rung.rank < self.previous.rank
    }
}

/// Counters describing how the policy behaved over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionStats {
    pub decisions: u64,
    pub upswitches: u64,
    pub downswitches: u64,
    /// Upswitches blocked by a recent downswitch
    pub vetoed_upswitches: u64,
    /// Upswitches blocked by the dwell time
    pub held_upswitches: u64,
    /// Candidates lowered by the sustainability projection
    pub sustainability_downgrades: u64,
}

/// Hysteretic rate selector. Owns all per-player selection state.
#[derive(Debug, Clone)]
pub struct RateSelector {
    ladder: BitrateLadder,
    warmup_ms: u64,
    low_buffer_ms: u64,
    hysteresis_window_ms: u64,
    upswitch_dwell_ms: u64,
    horizon_ms: u64,
    buffer_gain: f64,
    estimator: GeometricMeanEstimator,
    /// Downswitches in the current hysteresis window
    transitions: u32,
    /// Time elapsed in the current hysteresis window
    timer_ms: u64,
    last_increment_ms: u64,
    stats: SelectionStats,
}

impl RateSelector {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            ladder: config.ladder.clone(),
            warmup_ms: config.warmup_ms,
            low_buffer_ms: config.low_buffer_ms,
            hysteresis_window_ms: config.hysteresis_window_ms,
            upswitch_dwell_ms: config.upswitch_dwell_ms,
            horizon_ms: config.sustainability_horizon_ms,
            buffer_gain: config.buffer_gain,
            estimator: GeometricMeanEstimator::new(),
            transitions: 0,
            timer_ms: 0,
            last_increment_ms: 0,
            stats: SelectionStats::default(),
        }
    }

    pub fn ladder(&self) -> &BitrateLadder {
        &self.ladder
    }

    pub fn stats(&self) -> SelectionStats {
        self.stats
    }

    /// Downswitches recorded in the current hysteresis window.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Time elapsed in the current hysteresis window.
    pub fn window_elapsed_ms(&self) -> u64 {
        self.timer_ms
    }

    /// Clock value of the last accepted upswitch.
    pub fn last_increment_ms(&self) -> u64 {
        self.last_increment_ms
    }

    pub fn estimator(&self) -> &GeometricMeanEstimator {
        &self.estimator
    }

    /// Advances the hysteresis window by one tick. The window and its
    /// downswitch counter reset whenever the timer reaches its length.
    pub fn advance_window(&mut self, step_ms: u64) {
        self.timer_ms += step_ms;
        if self.timer_ms >= self.hysteresis_window_ms {
            self.timer_ms = 0;
            self.transitions = 0;
        }
    }

    /// Chooses the rung for the next chunk.
    pub fn select(&mut self, input: &SelectionInput) -> Decision {
        let (phase, rung) = if input.time_ms < self.warmup_ms {
            (Phase::WarmUp, self.select_warmup(input))
        } else if input.buffer_ms < self.low_buffer_ms {
            (Phase::Starvation, self.ladder.floor())
        } else {
            (Phase::SteadyState, self.select_steady(input))
        };

        if rung.rank < input.current.rank {
            self.record_downswitch();
        }

        let decision = Decision {
            time_ms: input.time_ms,
            phase,
            previous: input.current,
            rung,
        };

        self.stats.decisions += 1;
        if decision.is_upswitch() {
            self.stats.upswitches += 1;
        } else if decision.is_downswitch() {
            self.stats.downswitches += 1;
        }

        tracing::debug!(
            time_ms = input.time_ms,
            buffer_ms = input.buffer_ms,
            bandwidth_kbps = input.bandwidth_kbps,
            phase = ?phase,
            from = input.current.rank,
            to = rung.rank,
            "Selected bitrate"
        );

        decision
    }

    fn select_warmup(&mut self, input: &SelectionInput) -> Rung {
        let estimate = self.estimator.observe_and_estimate(input.bandwidth_kbps);
        self.ladder.rung_at_or_below(estimate)
    }

    fn select_steady(&mut self, input: &SelectionInput) -> Rung {
        let current = input.current;
        let mut candidate = self.ladder.rung_at_or_below(self.buffer_target_kbps(input.buffer_ms));

        if candidate.rank > current.rank {
            candidate = self.ladder.step_up(current);
        }

        if self.transitions >= 1 && candidate.rank > current.rank {
            self.stats.vetoed_upswitches += 1;
            candidate = current;
        }

        if !self.is_sustainable(input, candidate) {
            self.stats.sustainability_downgrades += 1;
            candidate = self.ladder.step_down(candidate);
        }

        if candidate.rank > current.rank {
            if input.time_ms.saturating_sub(self.last_increment_ms) >= self.upswitch_dwell_ms {
                self.last_increment_ms = input.time_ms;
                candidate
            } else {
                self.stats.held_upswitches += 1;
                current
            }
        } else {
            candidate
        }
    }

    /// Floor rate plus `gain * sqrt(buffer)`, rounded to the nearest kbps.
    fn buffer_target_kbps(&self, buffer_ms: u64) -> u64 {
        let floor = self.ladder.floor().rate_kbps as f64;
        (floor + self.buffer_gain * (buffer_ms as f64).sqrt()).round() as u64
    }

    /// Projects the buffer over the horizon assuming `candidate` is kept.
    fn is_sustainable(&self, input: &SelectionInput, candidate: Rung) -> bool {
        let horizon = self.horizon_ms as f64;
        let ratio = input.bandwidth_kbps as f64 / candidate.rate_kbps as f64;
        let projected = input.buffer_ms as f64 + ratio * horizon - horizon;
        projected > self.low_buffer_ms as f64
    }

    /// Opens a fresh cooldown window. Applies to every downswitch,
    /// whichever phase or check produced it.
    fn record_downswitch(&mut self) {
        self.transitions = 1;
        self.timer_ms = 0;
    }
}
