//! Several players sharing one bottleneck link.
//!
//! Each player divides the trace bandwidth by the same fixed player count
//! and otherwise runs independently with its own jitter seed. Because
//! players never interact, running them one after another or on separate
//! blocking tasks gives identical reports.

use std::sync::Arc;

use abrsim_core::config::PlayerConfig;
use abrsim_core::player::{Player, RunReport};
use abrsim_core::trace::BandwidthTrace;
use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::rng::DeterministicRng;

/// A group of players over one shared trace.
#[derive(Debug, Clone)]
pub struct Fleet {
    trace: Arc<BandwidthTrace>,
    config: PlayerConfig,
    seeds: Vec<u64>,
}

impl Fleet {
    /// Creates `config.players` players, seeding each from `config.seed`.
    ///
    /// # Errors
    /// - `SimError::Config` - If the player configuration is invalid
    pub fn new(trace: Arc<BandwidthTrace>, config: PlayerConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut rng = DeterministicRng::from_seed(config.seed);
        let seeds = (0..config.players).map(|_| rng.derive_seed()).collect();

        Ok(Self {
            trace,
            config,
            seeds,
        })
    }

    pub fn player_count(&self) -> usize {
        self.seeds.len()
    }

    /// Jitter seed of each player, in player order.
    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    pub fn trace(&self) -> &BandwidthTrace {
        &self.trace
    }

    /// Runs every player to completion, one after another.
    ///
    /// # Errors
    /// - `SimError::Config` - If a player cannot be constructed
    pub fn run(&self) -> Result<FleetReport, SimError> {
        let mut reports = Vec::with_capacity(self.seeds.len());
        for (index, &seed) in self.seeds.iter().enumerate() {
            tracing::debug!(player = index, seed, "Running player");
            let config = self.config.clone().with_seed(seed);
            reports.push(Player::new(&self.trace, config)?.run());
        }
        Ok(self.build_report(reports))
    }

    /// Runs every player on its own blocking task.
    ///
    /// # Errors
    /// - `SimError::Config` - If a player cannot be constructed
    /// - `SimError::PlayerTask` - If a player task panicked or was cancelled
    pub async fn run_concurrent(&self) -> Result<FleetReport, SimError> {
        let handles: Vec<_> = self
            .seeds
            .iter()
            .map(|&seed| {
                let trace = Arc::clone(&self.trace);
                let config = self.config.clone().with_seed(seed);
                tokio::task::spawn_blocking(move || {
                    Player::new(&trace, config).map(|mut player| player.run())
                })
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (index, joined) in futures::future::join_all(handles).await.into_iter().enumerate() {
            let report = joined.map_err(|e| SimError::PlayerTask {
                index,
                reason: e.to_string(),
            })??;
            reports.push(report);
        }
        Ok(self.build_report(reports))
    }

    fn build_report(&self, players: Vec<RunReport>) -> FleetReport {
        let report = FleetReport {
            trace_label: self.trace.label().to_string(),
            seed: self.config.seed,
            players,
        };
        match report.utilization_percent() {
            Some(utilization) => tracing::info!(
                trace = %report.trace_label,
                players = report.players.len(),
                rebuffer_events = report.total_rebuffer_events(),
                "Fleet finished, aggregate utilization {utilization:.2}%"
            ),
            None => tracing::info!(
                trace = %report.trace_label,
                "Fleet finished without bandwidth"
            ),
        }
        report
    }
}

/// Reports of all players in a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub trace_label: String,
    /// Master seed the player seeds were derived from
    pub seed: u64,
    pub players: Vec<RunReport>,
}

impl FleetReport {
    /// Aggregate selected bitrate over aggregate effective bandwidth, in percent.
    pub fn utilization_percent(&self) -> Option<f64> {
        let bandwidth: u64 = self.players.iter().map(|r| r.bandwidth_sum).sum();
        if bandwidth == 0 {
            return None;
        }
        let bitrate: u64 = self.players.iter().map(|r| r.bitrate_sum).sum();
        Some(bitrate as f64 * 100.0 / bandwidth as f64)
    }

    pub fn total_rebuffer_events(&self) -> u64 {
        self.players.iter().map(|r| r.rebuffer_events).sum()
    }

    pub fn total_stalled_ticks(&self) -> u64 {
        self.players.iter().map(|r| r.stalled_ticks).sum()
    }

    /// Generates human-readable summary, one line per player.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Fleet report: {} ({} players, seed: {})\n",
            self.trace_label,
            self.players.len(),
            self.seed
        );
        for (index, report) in self.players.iter().enumerate() {
            let utilization = report
                .utilization_percent()
                .map_or_else(|| "n/a".to_string(), |u| format!("{u:.2}%"));
            let mean = report
                .mean_played_bitrate_kbps()
                .map_or_else(|| "n/a".to_string(), |m| format!("{m:.0} kbps"));
            summary.push_str(&format!(
                "  player {index}: utilization {utilization}, mean bitrate {mean}, {} rebuffer events\n",
                report.rebuffer_events
            ));
        }
        match self.utilization_percent() {
            Some(utilization) => {
                summary.push_str(&format!("Aggregate utilization: {utilization:.2}%\n"))
            }
            None => summary.push_str("Aggregate utilization: n/a\n"),
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use abrsim_core::config::ConfigError;

    use super::*;
    use crate::scenarios::constant_trace;

    #[test]
    fn test_fleet_rejects_zero_players() {
        let trace = Arc::new(constant_trace(1000, 10_000));
        let result = Fleet::new(trace, PlayerConfig::default().with_players(0));
        assert!(matches!(
            result,
            Err(SimError::Config(ConfigError::ZeroPlayers))
        ));
    }

    #[test]
    fn test_fleet_seeds_are_reproducible() {
        let trace = Arc::new(constant_trace(1000, 10_000));
        let config = PlayerConfig::default().with_players(3).with_seed(11);

        let first = Fleet::new(Arc::clone(&trace), config.clone()).unwrap();
        let second = Fleet::new(trace, config).unwrap();
        assert_eq!(first.player_count(), 3);
        assert_eq!(first.seeds(), second.seeds());
    }

    #[test]
    fn test_every_player_sees_divided_bandwidth() {
        let trace = Arc::new(constant_trace(2000, 20_000));
        let fleet = Fleet::new(trace, PlayerConfig::default().with_players(4)).unwrap();
        let report = fleet.run().unwrap();

        assert_eq!(report.players.len(), 4);
        for player in &report.players {
            assert_eq!(player.players, 4);
            assert!(player.tick_log.iter().all(|t| t.bandwidth_kbps == 500));
        }
    }

    #[test]
    fn test_empty_fleet_report_has_no_utilization() {
        let report = FleetReport {
            trace_label: "none".to_string(),
            seed: 0,
            players: Vec::new(),
        };
        assert_eq!(report.utilization_percent(), None);
        assert!(report.summary().contains("Aggregate utilization: n/a"));
    }
}
