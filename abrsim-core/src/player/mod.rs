//! Simulated adaptive-bitrate player.
//!
//! The player advances in fixed ticks of simulated time. Each tick it
//! reads the available bandwidth from the trace, schedules a new chunk
//! when idle and below its target buffer, drains the in-flight download,
//! plays or stalls, and accumulates utilization totals. The run ends when
//! the trace is exhausted.

mod estimator;
mod overhead;
mod report;
mod selection;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use estimator::GeometricMeanEstimator;
pub use overhead::NetworkOverhead;
pub use report::{RunReport, RungUsage, TickRecord};
pub use selection::{Decision, Phase, RateSelector, SelectionInput, SelectionStats};

use crate::config::{ConfigError, PlayerConfig};
use crate::ladder::Rung;
use crate::trace::{BandwidthTrace, TraceCursor};

/// Transfer state of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Downloading {
        /// Bits left to transfer, headers included
        remaining_bits: u64,
    },
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Playback consumed buffer at this rung
    Played(Rung),
    /// Buffer starved, nothing played
    Stalled,
    /// Trace ended, nothing changed
    Exhausted,
}

/// One player consuming a bandwidth trace.
#[derive(Debug)]
pub struct Player<'a> {
    config: PlayerConfig,
    trace_label: String,
    cursor: TraceCursor<'a>,
    rng: ChaCha8Rng,
    selector: RateSelector,
    time_ms: u64,
    buffer_ms: u64,
    download: DownloadState,
    selected: Rung,
    target_buffer_ms: u64,
    rebuffer_threshold_ms: u64,
    bandwidth_sum: u64,
    bitrate_sum: u64,
    ticks: u64,
    stalled_ticks: u64,
    startup_ticks: u64,
    rebuffer_events: u64,
    chunks_downloaded: u64,
    playback_started: bool,
    stalled: bool,
    played_per_rank: Vec<u64>,
    tick_log: Vec<TickRecord>,
    decisions: Vec<Decision>,
}

impl<'a> Player<'a> {
    /// Creates a player at simulated time zero with an empty buffer.
    ///
    /// # Errors
    /// - `ConfigError` - If the configuration fails validation
    pub fn new(trace: &'a BandwidthTrace, config: PlayerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let selector = RateSelector::new(&config);
        let selected = config.ladder.floor();
        let played_per_rank = vec![0; config.ladder.len()];

        Ok(Self {
            trace_label: trace.label().to_string(),
            cursor: trace.cursor(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            selector,
            time_ms: 0,
            buffer_ms: 0,
            download: DownloadState::Idle,
            selected,
            target_buffer_ms: config.target_buffer_ms,
            rebuffer_threshold_ms: 0,
            bandwidth_sum: 0,
            bitrate_sum: 0,
            ticks: 0,
            stalled_ticks: 0,
            startup_ticks: 0,
            rebuffer_events: 0,
            chunks_downloaded: 0,
            playback_started: false,
            stalled: false,
            played_per_rank,
            tick_log: Vec::new(),
            decisions: Vec::new(),
            config,
        })
    }

    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    pub fn buffer_ms(&self) -> u64 {
        self.buffer_ms
    }

    pub fn download_state(&self) -> DownloadState {
        self.download
    }

    pub fn is_downloading(&self) -> bool {
        matches!(self.download, DownloadState::Downloading { .. })
    }

    /// Rung of the chunk currently downloading or playing.
    pub fn selected(&self) -> Rung {
        self.selected
    }

    /// Jittered buffer level below which the next chunk is scheduled.
    pub fn target_buffer_ms(&self) -> u64 {
        self.target_buffer_ms
    }

    /// Buffer that must be exceeded before playback continues.
    pub fn rebuffer_threshold_ms(&self) -> u64 {
        self.rebuffer_threshold_ms
    }

    pub fn selector(&self) -> &RateSelector {
        &self.selector
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Advances the simulation by one step.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(trace_kbps) = self.cursor.bandwidth_at(self.time_ms) else {
            return TickOutcome::Exhausted;
        };
        let bandwidth = trace_kbps / u64::from(self.config.players);

        if self.download == DownloadState::Idle && self.buffer_ms < self.target_buffer_ms {
            self.start_chunk(bandwidth);
        }

        self.advance_download(bandwidth);
        let outcome = self.play();

        self.bandwidth_sum += bandwidth;
        self.bitrate_sum += self.selected.rate_kbps;
        self.ticks += 1;

        let record = TickRecord {
            time_ms: self.time_ms,
            played_rank: match outcome {
                TickOutcome::Played(rung) => rung.rank,
                _ => 0,
            },
            buffer_ms: self.buffer_ms,
            bandwidth_kbps: bandwidth,
        };
        tracing::trace!(
            time_ms = record.time_ms,
            played = record.played_rank,
            buffer_ms = record.buffer_ms,
            bandwidth_kbps = record.bandwidth_kbps,
            "Tick"
        );
        if self.config.record_ticks {
            self.tick_log.push(record);
        }

        self.time_ms += self.config.step_ms;
        self.selector.advance_window(self.config.step_ms);

        outcome
    }

    /// Runs until the trace is exhausted and returns the report.
    pub fn run(&mut self) -> RunReport {
        while self.tick() != TickOutcome::Exhausted {}

        let report = self.report();
        match report.utilization_percent() {
            Some(utilization) => tracing::info!(
                trace = %report.trace_label,
                seed = report.seed,
                ticks = report.ticks,
                rebuffer_events = report.rebuffer_events,
                "Run finished, bandwidth utilization {utilization:.2}%"
            ),
            None => tracing::info!(
                trace = %report.trace_label,
                "Run finished without bandwidth, utilization undefined"
            ),
        }
        report
    }

    /// Snapshot of the statistics collected so far.
    pub fn report(&self) -> RunReport {
        let rung_usage = self
            .config
            .ladder
            .iter()
            .zip(&self.played_per_rank)
            .map(|(&rung, &played_ticks)| RungUsage { rung, played_ticks })
            .collect();

        RunReport {
            trace_label: self.trace_label.clone(),
            players: self.config.players,
            seed: self.config.seed,
            duration_ms: self.time_ms,
            ticks: self.ticks,
            played_ticks: self.ticks - self.stalled_ticks,
            stalled_ticks: self.stalled_ticks,
            startup_ticks: self.startup_ticks,
            rebuffer_events: self.rebuffer_events,
            chunks_downloaded: self.chunks_downloaded,
            rung_usage,
            selection: self.selector.stats(),
            bandwidth_sum: self.bandwidth_sum,
            bitrate_sum: self.bitrate_sum,
            tick_log: self.tick_log.clone(),
            decisions: self.decisions.clone(),
        }
    }

    fn start_chunk(&mut self, bandwidth: u64) {
        let decision = self.selector.select(&SelectionInput {
            time_ms: self.time_ms,
            buffer_ms: self.buffer_ms,
            bandwidth_kbps: bandwidth,
            current: self.selected,
        });
        self.selected = decision.rung;
        if self.config.record_ticks {
            self.decisions.push(decision);
        }

        let payload_bits = self.config.chunk_duration_ms * self.selected.rate_kbps;
        let remaining_bits = self.config.overhead.inflate(payload_bits);
        self.download = DownloadState::Downloading { remaining_bits };

        let jitter = self.config.target_jitter_ms;
        let target = self.config.target_buffer_ms;
        self.target_buffer_ms = self.rng.random_range(target - jitter..=target + jitter);
    }

    fn advance_download(&mut self, bandwidth: u64) {
        let DownloadState::Downloading { remaining_bits } = self.download else {
            return;
        };

        let drained = self.config.step_ms * bandwidth;
        if drained >= remaining_bits {
            self.buffer_ms += self.config.chunk_duration_ms;
            self.download = DownloadState::Idle;
            self.chunks_downloaded += 1;
            tracing::debug!(
                time_ms = self.time_ms,
                buffer_ms = self.buffer_ms,
                rung = self.selected.rank,
                "Chunk downloaded"
            );
        } else {
            self.download = DownloadState::Downloading {
                remaining_bits: remaining_bits - drained,
            };
        }
    }

    fn play(&mut self) -> TickOutcome {
        if self.buffer_ms > self.rebuffer_threshold_ms {
            self.buffer_ms = self.buffer_ms.saturating_sub(self.config.step_ms);
            self.rebuffer_threshold_ms = 0;
            self.playback_started = true;
            self.stalled = false;
            self.played_per_rank[usize::from(self.selected.rank) - 1] += 1;
            return TickOutcome::Played(self.selected);
        }

        self.buffer_ms = 0;
        self.rebuffer_threshold_ms = self.config.rebuffer_threshold_ms;
        self.stalled_ticks += 1;
        if !self.playback_started {
            self.startup_ticks += 1;
        } else if !self.stalled {
            self.rebuffer_events += 1;
            tracing::warn!(
                time_ms = self.time_ms,
                rung = self.selected.rank,
                buffer_ms = self.buffer_ms,
                "Playback stalled"
            );
        }
        self.stalled = true;
        TickOutcome::Stalled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceSample;

    fn constant_trace(kbps: u64, duration_ms: u64) -> BandwidthTrace {
        let samples = (0..duration_ms / 1000)
            .map(|_| TraceSample::with_bandwidth(kbps, 1000))
            .collect();
        BandwidthTrace::from_samples("constant", samples)
    }

    #[test]
    fn test_zero_players_rejected() {
        let trace = constant_trace(1000, 1000);
        let result = Player::new(&trace, PlayerConfig::default().with_players(0));
        assert!(matches!(result, Err(ConfigError::ZeroPlayers)));
    }

    #[test]
    fn test_first_tick_schedules_warmup_chunk_and_stalls() {
        let trace = constant_trace(1000, 10_000);
        let mut player = Player::new(&trace, PlayerConfig::default()).unwrap();

        assert_eq!(player.tick(), TickOutcome::Stalled);
        assert!(player.is_downloading());
        assert_eq!(player.selected().rate_kbps, 1000);
        assert_eq!(player.rebuffer_threshold_ms(), 1000);
        assert_eq!(player.time_ms(), 200);

        // 2_000_000 payload bits + 174 packets of headers, minus one tick at 1000 kbps.
        assert_eq!(
            player.download_state(),
            DownloadState::Downloading {
                remaining_bits: 2_083_520 - 200_000
            }
        );

        let target = player.target_buffer_ms();
        assert!((29_500..=30_500).contains(&target));
    }

    #[test]
    fn test_chunk_completion_resumes_playback() {
        let trace = constant_trace(1000, 10_000);
        let mut player = Player::new(&trace, PlayerConfig::default()).unwrap();

        // The warm-up chunk needs 11 ticks at 1000 kbps.
        for _ in 0..10 {
            assert_eq!(player.tick(), TickOutcome::Stalled);
        }
        let outcome = player.tick();
        assert_eq!(outcome, TickOutcome::Played(player.selected()));
        assert_eq!(player.buffer_ms(), 1800);
        assert_eq!(player.rebuffer_threshold_ms(), 0);
    }

    #[test]
    fn test_stall_empties_buffer_below_rebuffer_threshold() {
        let trace = constant_trace(5000, 10_000);
        let config = PlayerConfig {
            chunk_duration_ms: 600,
            ..Default::default()
        };
        let mut player = Player::new(&trace, config).unwrap();

        assert_eq!(player.tick(), TickOutcome::Stalled);
        // The 600 ms chunk lands but does not clear the 1000 ms threshold.
        assert_eq!(player.tick(), TickOutcome::Stalled);
        assert_eq!(player.report().chunks_downloaded, 1);
        assert_eq!(player.buffer_ms(), 0);

        loop {
            match player.tick() {
                TickOutcome::Exhausted => break,
                TickOutcome::Stalled => assert_eq!(player.buffer_ms(), 0),
                TickOutcome::Played(_) => {}
            }
        }
    }

    #[test]
    fn test_bandwidth_is_divided_among_players() {
        let trace = constant_trace(1000, 2000);
        let mut player = Player::new(&trace, PlayerConfig::default().with_players(3)).unwrap();
        let report = player.run();
        assert!(report.tick_log.iter().all(|t| t.bandwidth_kbps == 333));
    }

    #[test]
    fn test_run_stops_at_trace_exhaustion() {
        let trace = constant_trace(1000, 5000);
        let mut player = Player::new(&trace, PlayerConfig::default()).unwrap();
        let report = player.run();

        // Queries at 0..=5000 ms fall inside the trace.
        assert_eq!(report.ticks, 26);
        assert_eq!(report.duration_ms, 5200);
        assert_eq!(player.tick(), TickOutcome::Exhausted);
        assert_eq!(player.time_ms(), 5200);
    }

    #[test]
    fn test_empty_trace_has_undefined_utilization() {
        let trace = BandwidthTrace::from_samples("empty", Vec::new());
        let mut player = Player::new(&trace, PlayerConfig::default()).unwrap();
        let report = player.run();
        assert_eq!(report.ticks, 0);
        assert_eq!(report.utilization_percent(), None);
    }

    #[test]
    fn test_same_seed_reproduces_run() {
        let trace = constant_trace(1500, 60_000);
        let first = Player::new(&trace, PlayerConfig::default().with_seed(9))
            .unwrap()
            .run();
        let second = Player::new(&trace, PlayerConfig::default().with_seed(9))
            .unwrap()
            .run();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tick_log_can_be_disabled() {
        let trace = constant_trace(1000, 3000);
        let config = PlayerConfig {
            record_ticks: false,
            ..Default::default()
        };
        let report = Player::new(&trace, config).unwrap().run();
        assert!(report.tick_log.is_empty());
        assert!(report.decisions.is_empty());
        assert!(report.ticks > 0);
    }
}
