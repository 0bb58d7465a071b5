//! Headless cyclone hazard runner
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release --package demo-headless -- run config.json
//! ```
//!
//! Stages read and write under the configured output path:
//! `process/` (statistics), `tracks/` (track files), `windfield/` (gusts).

use clap::{Parser, Subcommand};
use cyclone_sim_core::pipeline::{run_all, run_statistics, run_track_generation, run_windfield};
use cyclone_sim_core::{Result, SimulationConfig};
use std::path::PathBuf;
use std::time::Instant;

/// Synthetic tropical cyclone tracks and wind hazard
#[derive(Parser, Debug)]
#[command(name = "cyclone-sim")]
#[command(about = "Synthetic tropical cyclone track and wind hazard simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build statistics from historical tracks
    Stats(StageArgs),
    /// Generate synthetic track files
    Generate(StageArgs),
    /// Compute gust files from existing track files
    Windfield(StageArgs),
    /// Run every stage
    Run(StageArgs),
    /// Write a configuration file with every default filled in
    DefaultConfig {
        /// Where to write the configuration
        path: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct StageArgs {
    /// JSON configuration file
    config: PathBuf,

    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the worker count (0 = all cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override the track seed
    #[arg(long)]
    seed: Option<u64>,
}

impl StageArgs {
    fn load(&self) -> Result<SimulationConfig> {
        let mut config = SimulationConfig::load(&self.config)?;
        if let Some(output) = &self.output {
            config.output.path.clone_from(output);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(seed) = self.seed {
            config.track_generator.track_seed = seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Command::Stats(args) => {
            let config = args.load()?;
            run_statistics(&config)?;
            println!("Statistics written to {}", config.process_path().display());
        }
        Command::Generate(args) => {
            let config = args.load()?;
            let files = run_track_generation(&config)?;
            println!("{} track files written to {}", files.len(), config.track_path().display());
        }
        Command::Windfield(args) => {
            let config = args.load()?;
            let files = run_windfield(&config)?;
            println!("{} gust files written to {}", files.len(), config.windfield_path().display());
        }
        Command::Run(args) => {
            let config = args.load()?;
            run_all(&config)?;
            println!("Simulation complete, results in {}", config.output.path.display());
        }
        Command::DefaultConfig { path } => {
            SimulationConfig::default().save(&path)?;
            println!("Default configuration written to {}", path.display());
            return Ok(());
        }
    }

    println!("Finished in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
