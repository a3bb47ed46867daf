//! CLI command implementations

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use abrsim_core::config::{PlayerConfig, SimConfig};
use abrsim_core::trace::BandwidthTrace;
use abrsim_sim::{Fleet, FleetReport, Scenario, check_all};
use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate players over one trace file
    Run {
        /// Path to the trace file
        trace: PathBuf,
        /// Players sharing the link
        #[arg(short, long)]
        players: Option<u32>,
        /// Master seed for target-buffer jitter
        #[arg(short, long)]
        seed: Option<u64>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print every tick as `time_ms played_rank`
        #[arg(long)]
        ticks: bool,
        /// Check selection invariants and fail on violations
        #[arg(long)]
        check: bool,
    },
    /// Simulate every trace file in a directory
    Batch {
        /// Directory containing trace files
        dir: PathBuf,
        /// Players sharing the link
        #[arg(short, long)]
        players: Option<u32>,
        /// Master seed for target-buffer jitter
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Show trace statistics without simulating
    Inspect {
        /// Path to the trace file
        trace: PathBuf,
    },
    /// Simulate a built-in synthetic trace
    Scenario {
        /// Scenario to run
        #[arg(value_enum)]
        name: ScenarioName,
        /// Players sharing the link
        #[arg(short, long)]
        players: Option<u32>,
        /// Master seed for jitter and bursty trace generation
        #[arg(short, long)]
        seed: Option<u64>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Report rendering for `run` and `scenario`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Built-in synthetic traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioName {
    Constant,
    StepDrop,
    Bursty,
}

impl From<ScenarioName> for Scenario {
    fn from(name: ScenarioName) -> Self {
        match name {
            ScenarioName::Constant => Scenario::Constant,
            ScenarioName::StepDrop => Scenario::StepDrop,
            ScenarioName::Bursty => Scenario::Bursty,
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands, config: SimConfig) -> Result<()> {
    match command {
        Commands::Run {
            trace,
            players,
            seed,
            format,
            ticks,
            check,
        } => {
            let player = player_config(config.player, players, seed, ticks || check);
            run_trace(&trace, player, format, ticks, check).await
        }
        Commands::Batch { dir, players, seed } => {
            let player = player_config(config.player, players, seed, false);
            run_batch(&dir, player).await
        }
        Commands::Inspect { trace } => inspect_trace(&trace).await,
        Commands::Scenario {
            name,
            players,
            seed,
            format,
        } => {
            let player = player_config(config.player, players, seed, false);
            run_scenario(name.into(), player, format).await
        }
    }
}

fn player_config(
    base: PlayerConfig,
    players: Option<u32>,
    seed: Option<u64>,
    record_ticks: bool,
) -> PlayerConfig {
    let mut config = base;
    if let Some(players) = players {
        config.players = players;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    config.record_ticks = record_ticks;
    config
}

/// Simulate a single trace file
///
/// # Errors
/// - Trace file unreadable or malformed
/// - Invalid player configuration
/// - Invariant violations when `check` is set
pub async fn run_trace(
    path: &Path,
    config: PlayerConfig,
    format: OutputFormat,
    ticks: bool,
    check: bool,
) -> Result<()> {
    let trace = BandwidthTrace::load(path)
        .await
        .with_context(|| format!("Failed to load trace {}", path.display()))?;

    let report = simulate(trace, config.clone()).await?;
    print!("{}", render_report(&report, format, ticks)?);

    if check {
        let violations: Vec<String> = report
            .players
            .iter()
            .flat_map(|player| check_all(player, &config))
            .map(|violation| violation.to_string())
            .collect();
        if !violations.is_empty() {
            bail!(
                "{} invariant violations:\n{}",
                violations.len(),
                violations.join("\n")
            );
        }
        println!("All invariants hold");
    }

    Ok(())
}

/// Simulate every trace in a directory, one summary line each
///
/// Malformed traces are reported and skipped.
///
/// # Errors
/// - Directory unreadable
/// - Invalid player configuration
pub async fn run_batch(dir: &Path, config: PlayerConfig) -> Result<()> {
    let files = trace_files(dir).await?;
    if files.is_empty() {
        println!("No trace files found in {}", dir.display());
        return Ok(());
    }

    let mut skipped = 0;
    for path in &files {
        match BandwidthTrace::load(path).await {
            Ok(trace) => {
                let report = simulate(trace, config.clone()).await?;
                println!("{}", batch_line(&report));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Skipping trace: {e}");
                println!("{}: skipped ({e})", path.display());
                skipped += 1;
            }
        }
    }

    println!(
        "Processed {} traces, {skipped} skipped",
        files.len() - skipped
    );
    Ok(())
}

/// Print trace statistics
///
/// # Errors
/// - Trace file unreadable or malformed
pub async fn inspect_trace(path: &Path) -> Result<()> {
    let trace = BandwidthTrace::load(path)
        .await
        .with_context(|| format!("Failed to load trace {}", path.display()))?;
    print!("{}", describe_trace(&trace));
    Ok(())
}

/// Simulate a built-in scenario
///
/// # Errors
/// - Invalid player configuration
pub async fn run_scenario(
    scenario: Scenario,
    config: PlayerConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!(%scenario, seed = config.seed, "Running scenario");
    let trace = scenario.build(config.seed);
    let report = simulate(trace, config).await?;
    print!("{}", render_report(&report, format, false)?);
    Ok(())
}

async fn simulate(trace: BandwidthTrace, config: PlayerConfig) -> Result<FleetReport> {
    let fleet = Fleet::new(Arc::new(trace), config)?;
    Ok(fleet.run_concurrent().await?)
}

/// Regular files of `dir`, sorted by path.
async fn trace_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn render_report(report: &FleetReport, format: OutputFormat, ticks: bool) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Text => {
            let mut output = String::new();
            if ticks {
                for (index, player) in report.players.iter().enumerate() {
                    writeln!(output, "# player {index}")?;
                    for tick in &player.tick_log {
                        writeln!(output, "{} {}", tick.time_ms, tick.played_rank)?;
                    }
                }
            }
            output.push_str(&report.summary());
            Ok(output)
        }
    }
}

fn batch_line(report: &FleetReport) -> String {
    let utilization = report
        .utilization_percent()
        .map_or_else(|| "n/a".to_string(), |u| format!("{u:.2}%"));
    format!(
        "{}: utilization {utilization}, {} rebuffer events, {} stalled ticks",
        report.trace_label,
        report.total_rebuffer_events(),
        report.total_stalled_ticks()
    )
}

fn describe_trace(trace: &BandwidthTrace) -> String {
    let mean = trace
        .mean_bandwidth_kbps()
        .map_or_else(|| "n/a".to_string(), |kbps| format!("{kbps} kbps"));
    format!(
        "Trace: {}\n  Category: {}\n  Samples: {}\n  Duration: {:.1} s\n  Mean bandwidth: {mean}\n",
        trace.label(),
        trace.category(),
        trace.len(),
        trace.duration_ms() as f64 / 1000.0
    )
}
