//! Stock replay - main entry point
//!
//! This binary provides two subcommands:
//! - replay: Replay a candle file bar by bar, executing scripted paper trades
//! - stats: Recompute trading statistics from an exported trade log

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "stock-replay")]
#[command(
    about = "Replay historical stock candles and paper-trade against them",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay candles with scripted orders
    Replay(commands::replay::ReplayArgs),

    /// Trading statistics for an exported trade log
    Stats {
        /// Trade log CSV written by `replay`
        #[arg(short, long)]
        trades: String,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Replay(_) => "replay",
        Commands::Stats { .. } => "stats",
    };
    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Stats { trades, json } => commands::stats::run(trades, json),
    }
}
