//! Vigil CLI: offline tools for the liveness engine.
//!
//! Usage:
//!   vigil replay <TRACE>            Run the engine over a recorded landmark trace
//!   vigil simulate --scenario <S>   Write a synthetic landmark trace
//!   vigil config                    Print the default engine configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vigil_core::ChallengeType;

mod commands;

use commands::simulate::Scenario;

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Face liveness challenge-response engine tools",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the liveness engine over a JSON-lines landmark trace
    Replay {
        /// Trace file, one frame per line
        trace: PathBuf,

        /// TOML file overriding engine defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for challenge selection
        #[arg(long)]
        seed: Option<u64>,

        /// Always issue this challenge: smile|surprise|blink
        #[arg(long, conflicts_with = "seed")]
        challenge: Option<ChallengeType>,

        /// Print status records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Generate a synthetic landmark trace
    Simulate {
        #[arg(long, value_enum)]
        scenario: Scenario,

        /// Number of frames
        #[arg(long, default_value = "300")]
        frames: usize,

        /// Frame rate of the generated timestamps
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Seed for motion jitter
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default engine configuration as TOML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay {
            trace,
            config,
            seed,
            challenge,
            json,
        } => commands::replay::run(trace, config, seed, challenge, json),
        Commands::Simulate {
            scenario,
            frames,
            fps,
            seed,
            output,
        } => commands::simulate::run(scenario, frames, fps, seed, output),
        Commands::Config => commands::config::run(),
    }
}
