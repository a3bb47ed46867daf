//! Per-tick records and run summaries.

use serde::{Deserialize, Serialize};

use super::selection::{Decision, SelectionStats};
use crate::ladder::Rung;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Simulated time at the start of the tick
    pub time_ms: u64,
    /// Rank of the rung played, 0 when stalled
    pub played_rank: u8,
    /// Buffer level after playback
    pub buffer_ms: u64,
    /// Effective bandwidth of the tick
    pub bandwidth_kbps: u64,
}

impl TickRecord {
    pub fn is_stalled(&self) -> bool {
        self.played_rank == 0
    }
}

/// Ticks spent playing one rung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RungUsage {
    pub rung: Rung,
    pub played_ticks: u64,
}

/// Result of a complete player run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub trace_label: String,
    pub players: u32,
    pub seed: u64,
    /// Simulated time covered by the run
    pub duration_ms: u64,
    pub ticks: u64,
    pub played_ticks: u64,
    pub stalled_ticks: u64,
    /// Stalled ticks before playback first started
    pub startup_ticks: u64,
    /// Stalls after playback had started
    pub rebuffer_events: u64,
    pub chunks_downloaded: u64,
    pub rung_usage: Vec<RungUsage>,
    pub selection: SelectionStats,
    /// Sum of effective bandwidth over all ticks, kbps
    pub bandwidth_sum: u64,
    /// Sum of selected rung rates over all ticks, kbps
    pub bitrate_sum: u64,
    pub tick_log: Vec<TickRecord>,
    pub decisions: Vec<Decision>,
}

impl RunReport {
    /// Selected bitrate over available bandwidth, in percent.
    ///
    /// `None` when no bandwidth was observed, e.g. an empty trace.
    pub fn utilization_percent(&self) -> Option<f64> {
        if self.bandwidth_sum == 0 {
            return None;
        }
        Some(self.bitrate_sum as f64 * 100.0 / self.bandwidth_sum as f64)
    }

    /// Mean rate of the rungs actually played, ignoring stalled ticks.
    pub fn mean_played_bitrate_kbps(&self) -> Option<f64> {
        if self.played_ticks == 0 {
            return None;
        }
        let total: u64 = self
            .rung_usage
            .iter()
            .map(|usage| usage.rung.rate_kbps * usage.played_ticks)
            .sum();
        Some(total as f64 / self.played_ticks as f64)
    }

    /// Time spent rebuffering after playback started.
    pub fn rebuffer_ms(&self, step_ms: u64) -> u64 {
        (self.stalled_ticks - self.startup_ticks) * step_ms
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!(
            "Run report: {} (players: {}, seed: {})\n",
            self.trace_label, self.players, self.seed
        ));
        summary.push_str(&format!("Simulated time: {} ms\n", self.duration_ms));
        summary.push_str(&format!(
            "Ticks: {} played, {} stalled ({} during startup)\n",
            self.played_ticks, self.stalled_ticks, self.startup_ticks
        ));
        summary.push_str(&format!("Rebuffer events: {}\n", self.rebuffer_events));
        summary.push_str(&format!("Chunks downloaded: {}\n", self.chunks_downloaded));
        summary.push_str(&format!(
            "Switches: {} up, {} down ({} vetoed, {} held, {} downgraded)\n",
            self.selection.upswitches,
            self.selection.downswitches,
            self.selection.vetoed_upswitches,
            self.selection.held_upswitches,
            self.selection.sustainability_downgrades
        ));

        summary.push_str("\nPlayed rungs:\n");
        for usage in &self.rung_usage {
            summary.push_str(&format!("  {}: {} ticks\n", usage.rung, usage.played_ticks));
        }

        match self.mean_played_bitrate_kbps() {
            Some(mean) => summary.push_str(&format!("\nMean played bitrate: {mean:.1} kbps\n")),
            None => summary.push_str("\nMean played bitrate: n/a\n"),
        }
        match self.utilization_percent() {
            Some(utilization) => {
                summary.push_str(&format!("Bandwidth utilization: {utilization:.2}%\n"))
            }
            None => summary.push_str("Bandwidth utilization: n/a\n"),
        }

        summary
    }
}
