//! Portal CLI - client session lifecycle and edge server

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use portal_core::StateDir;
use std::{path::PathBuf, time::Duration};
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Sign in, keep the session fresh, guard and proxy the web app")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for config, persisted session and logs
    #[arg(short = 'd', long, global = true, env = "PORTAL_STATE_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to <data_dir>/config/portal.json if present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for one-shot commands in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let state_dir = cli
        .data_dir
        .clone()
        .map_or_else(StateDir::new, StateDir::with_override);

    logging::init_logging(
        cli.log_level.into(),
        &state_dir,
        cli.command.component(),
        cli.no_file_log,
    )?;

    info!("Starting Portal CLI");

    // Long-running commands stop on ctrl-c, never on the timeout
    let timeout = (cli.timeout > 0 && !cli.command.is_long_running())
        .then(|| Duration::from_secs(cli.timeout));

    let run = cli.command.execute(cli.config, state_dir);

    let outcome = match timeout {
        None => run.await,
        Some(duration) => match tokio::time::timeout(duration, run).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        },
    };

    match outcome {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
