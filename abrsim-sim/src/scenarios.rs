//! Synthetic traces for reproducible experiments.

use std::fmt;

use abrsim_core::trace::{BandwidthTrace, TraceSample};
use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

/// Length of every synthetic sample.
const SAMPLE_MS: u64 = 1000;

/// Probability of a one-second outage in a bursty trace.
const OUTAGE_PROBABILITY: f64 = 0.05;

/// Steady link at `kbps` for `duration_ms`, rounded down to whole samples.
pub fn constant_trace(kbps: u64, duration_ms: u64) -> BandwidthTrace {
    let samples = repeat_sample(kbps, duration_ms);
    BandwidthTrace::from_samples(format!("constant-{kbps}kbps"), samples)
}

/// High bandwidth, a drop to `low_kbps`, then recovery to `high_kbps`.
///
/// The recovery lasts as long as the initial high period.
pub fn step_drop_trace(high_kbps: u64, low_kbps: u64, high_ms: u64, low_ms: u64) -> BandwidthTrace {
    let mut samples = repeat_sample(high_kbps, high_ms);
    samples.extend(repeat_sample(low_kbps, low_ms));
    samples.extend(repeat_sample(high_kbps, high_ms));
    BandwidthTrace::from_samples(format!("step-drop-{high_kbps}-{low_kbps}kbps"), samples)
}

/// Mobile-like link: each second draws a whole percentage of `mean_kbps`
/// in [20%, 180%), with occasional complete outages.
pub fn bursty_trace(seed: u64, mean_kbps: u64, duration_ms: u64) -> BandwidthTrace {
    let mut rng = DeterministicRng::from_seed(seed);
    let samples = (0..duration_ms / SAMPLE_MS)
        .map(|_| {
            if rng.random_bool(OUTAGE_PROBABILITY) {
                return TraceSample::with_bandwidth(0, SAMPLE_MS);
            }
            let percent = rng.random_range(20, 180);
            TraceSample::with_bandwidth(mean_kbps * percent / 100, SAMPLE_MS)
        })
        .collect();
    BandwidthTrace::from_samples(format!("bursty-{mean_kbps}kbps-{seed}"), samples)
}

fn repeat_sample(kbps: u64, duration_ms: u64) -> Vec<TraceSample> {
    (0..duration_ms / SAMPLE_MS)
        .map(|_| TraceSample::with_bandwidth(kbps, SAMPLE_MS))
        .collect()
}

/// Named scenarios with fixed parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// 1000 kbps for one minute
    Constant,
    /// One minute at 3000 kbps, 40 s at 100 kbps, one minute at 3000 kbps
    StepDrop,
    /// Five minutes of bursty link averaging 1500 kbps
    Bursty,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::Constant, Scenario::StepDrop, Scenario::Bursty];

    /// Builds the trace. Only `Bursty` depends on `seed`.
    pub fn build(self, seed: u64) -> BandwidthTrace {
        match self {
            Scenario::Constant => constant_trace(1000, 60_000),
            Scenario::StepDrop => step_drop_trace(3000, 100, 60_000, 40_000),
            Scenario::Bursty => bursty_trace(seed, 1500, 300_000),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Constant => write!(f, "constant"),
            Scenario::StepDrop => write!(f, "step-drop"),
            Scenario::Bursty => write!(f, "bursty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_trace_shape() {
        let trace = constant_trace(1000, 60_500);
        assert_eq!(trace.len(), 60);
        assert_eq!(trace.duration_ms(), 60_000);
        assert_eq!(trace.mean_bandwidth_kbps(), Some(1000));
    }

    #[test]
    fn test_step_drop_trace_segments() {
        let trace = step_drop_trace(3000, 100, 10_000, 5000);
        assert_eq!(trace.duration_ms(), 25_000);
        assert_eq!(trace.bandwidth_at(10_000), Some(3000));
        assert_eq!(trace.bandwidth_at(10_001), Some(100));
        assert_eq!(trace.bandwidth_at(15_000), Some(100));
        assert_eq!(trace.bandwidth_at(15_001), Some(3000));
    }

    #[test]
    fn test_bursty_trace_is_seeded() {
        let first = bursty_trace(5, 1500, 120_000);
        let second = bursty_trace(5, 1500, 120_000);
        let other = bursty_trace(6, 1500, 120_000);

        assert_eq!(first, second);
        assert_ne!(first.samples(), other.samples());
        assert!(
            first
                .samples()
                .iter()
                .all(|s| s.bandwidth_kbps() < 2700)
        );
    }

    #[test]
    fn test_named_scenarios_build() {
        for scenario in Scenario::ALL {
            let trace = scenario.build(1);
            assert!(!trace.is_empty(), "{scenario} produced an empty trace");
        }
        assert_eq!(Scenario::StepDrop.to_string(), "step-drop");
    }
}
