//! Abrsim CLI - Command-line interface
//!
//! Runs the adaptive-bitrate player model over bandwidth trace files.

mod commands;

use std::path::PathBuf;

use abrsim_core::config::SimConfig;
use abrsim_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::Parser;

#[derive(Parser)]
#[command(name = "abrsim")]
#[command(about = "Adaptive-bitrate player simulation over bandwidth traces")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level (RUST_LOG takes precedence)
    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Directory for a full trace-level log of the run
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SimConfig::from_env();
    if let Some(level) = cli.log_level {
        config.logging.console_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.logging.log_dir = Some(dir);
    }

    init_tracing(
        config.logging.console_level.as_tracing_level(),
        config.logging.log_dir.as_deref(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    commands::handle_command(cli.command, config).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "abrsim",
            "inspect",
            "trace.log",
            "--log-level",
            "debug",
            "--log-dir",
            "logs",
        ])
        .unwrap();

        assert_eq!(cli.log_level, Some(CliLogLevel::Debug));
        assert_eq!(cli.log_dir, Some(PathBuf::from("logs")));
    }
}
