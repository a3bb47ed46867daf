//! Invariant checking over completed runs.
//!
//! Invariants inspect the decision and tick logs of a [`RunReport`], so
//! the run must have been made with `record_ticks` enabled.

use std::fmt;

use abrsim_core::config::PlayerConfig;
use abrsim_core::ladder::BitrateLadder;
use abrsim_core::player::{Phase, RunReport};

/// Violation of a run invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulated time at which the violation was observed
    pub time_ms: u64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at {} ms: {}",
            self.invariant, self.time_ms, self.description
        )
    }
}

/// Trait for checking run invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for the run.
    ///
    /// # Errors
    /// Returns `InvariantViolation` describing the first offending record.
    fn check(&self, report: &RunReport) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    fn violation(&self, time_ms: u64, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            time_ms,
        }
    }
}

/// Every decision and every played tick uses a rung of the ladder.
pub struct LadderBoundsInvariant {
    ladder: BitrateLadder,
}

impl LadderBoundsInvariant {
    pub fn new(ladder: BitrateLadder) -> Self {
        Self { ladder }
    }
}

impl Invariant for LadderBoundsInvariant {
    fn check(&self, report: &RunReport) -> Result<(), InvariantViolation> {
        if let Some(decision) = report
            .decisions
            .iter()
            .find(|d| !self.ladder.contains(d.rung))
        {
            return Err(self.violation(
                decision.time_ms,
                format!("Selected {} which is not on the ladder", decision.rung),
            ));
        }
        if let Some(tick) = report
            .tick_log
            .iter()
            .find(|t| usize::from(t.played_rank) > self.ladder.len())
        {
            return Err(self.violation(
                tick.time_ms,
                format!("Played rank {} above the ceiling", tick.played_rank),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LadderBounds"
    }
}

/// Steady-state upswitches move exactly one rung.
pub struct SingleStepUpswitchInvariant;

impl Invariant for SingleStepUpswitchInvariant {
    fn check(&self, report: &RunReport) -> Result<(), InvariantViolation> {
        let skipped = report.decisions.iter().find(|d| {
            d.phase == Phase::SteadyState && d.rung.rank > d.previous.rank.saturating_add(1)
        });
        match skipped {
            Some(decision) => Err(self.violation(
                decision.time_ms,
                format!("Jumped from {} to {}", decision.previous, decision.rung),
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "SingleStepUpswitch"
    }
}

/// Accepted steady-state upswitches are at least the dwell time apart.
pub struct UpswitchDwellInvariant {
    dwell_ms: u64,
}

impl UpswitchDwellInvariant {
    pub fn new(dwell_ms: u64) -> Self {
        Self { dwell_ms }
    }
}

impl Invariant for UpswitchDwellInvariant {
    fn check(&self, report: &RunReport) -> Result<(), InvariantViolation> {
        let mut previous: Option<u64> = None;
        for decision in report
            .decisions
            .iter()
            .filter(|d| d.phase == Phase::SteadyState && d.is_upswitch())
        {
            if let Some(last) = previous {
                let gap = decision.time_ms - last;
                if gap < self.dwell_ms {
                    return Err(self.violation(
                        decision.time_ms,
                        format!("Upswitch {gap} ms after the previous one"),
                    ));
                }
            }
            previous = Some(decision.time_ms);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "UpswitchDwell"
    }
}

/// The buffer never grows past the highest jittered target plus one chunk.
///
/// Chunks are only requested below the target, so a completed chunk can
/// overshoot it by at most one chunk duration.
pub struct BufferCeilingInvariant {
    ceiling_ms: u64,
}

impl BufferCeilingInvariant {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            ceiling_ms: config.target_buffer_ms + config.target_jitter_ms + config.chunk_duration_ms,
        }
    }
}

impl Invariant for BufferCeilingInvariant {
    fn check(&self, report: &RunReport) -> Result<(), InvariantViolation> {
        match report.tick_log.iter().find(|t| t.buffer_ms > self.ceiling_ms) {
            Some(tick) => Err(self.violation(
                tick.time_ms,
                format!(
                    "Buffer {} ms exceeds ceiling {} ms",
                    tick.buffer_ms, self.ceiling_ms
                ),
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "BufferCeiling"
    }
}

/// Collection of invariants checked together.
pub struct InvariantSet {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Standard invariants for runs made with `config`.
    pub fn for_config(config: &PlayerConfig) -> Self {
        let mut set = Self::new();
        set.add(Box::new(LadderBoundsInvariant::new(config.ladder.clone())));
        set.add(Box::new(SingleStepUpswitchInvariant));
        set.add(Box::new(UpswitchDwellInvariant::new(config.upswitch_dwell_ms)));
        set.add(Box::new(BufferCeilingInvariant::new(config)));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Checks every invariant, returning all violations.
    pub fn check(&self, report: &RunReport) -> Vec<InvariantViolation> {
        let violations: Vec<_> = self
            .invariants
            .iter()
            .filter_map(|invariant| invariant.check(report).err())
            .collect();
        for violation in &violations {
            tracing::warn!("{violation}");
        }
        violations
    }
}

impl Default for InvariantSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks a run against the standard invariants of `config`.
pub fn check_all(report: &RunReport, config: &PlayerConfig) -> Vec<InvariantViolation> {
    InvariantSet::for_config(config).check(report)
}
