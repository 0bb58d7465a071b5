//! Run drivers for the three stages: statistics, track generation and wind
//! fields
//!
//! Work units are split across workers with [`partition`], which depends only
//! on the unit list, so any worker count produces the same files. Every
//! simulation unit owns a random substream placed after the draws reserved
//! by all units before it.

use crate::config::SimulationConfig;
use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::CellGrid;
use crate::core_types::rng::TrackRng;
use crate::core_types::track::Track;
use crate::environment::{Environment, GenesisPdf};
use crate::stats::DistributionStore;
use crate::track::{
    interpolate_track, list_track_files, read_tracks, track_file_name, write_tracks, GenesisPoint, TrackGenerator,
};
use crate::wind::WindfieldGenerator;
use rand_distr::Poisson;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the genesis density written by the statistics stage
pub const GENESIS_PDF_FILE: &str = "genesis_pdf.json";

/// Items `index`, `index + total`, `index + 2·total`, ...
pub fn partition<I: IntoIterator>(items: I, total: usize, index: usize) -> impl Iterator<Item = I::Item> {
    items.into_iter().skip(index).step_by(total.max(1))
}

/// One track file's worth of simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationUnit {
    pub index: usize,
    /// Cyclones to simulate
    pub tracks: usize,
    /// Position of the unit's substream in the track stream
    pub offset: u64,
}

fn worker_count(config: &SimulationConfig) -> usize {
    if config.workers == 0 {
        rayon::current_num_threads()
    } else {
        config.workers
    }
}

fn cell_grid(config: &SimulationConfig) -> CellGrid {
    let tg = &config.track_generator;
    CellGrid::new(tg.grid_limit, tg.grid_space)
}

fn store(config: &SimulationConfig) -> DistributionStore {
    let tg = &config.track_generator;
    DistributionStore::new(config.process_path(), cell_grid(config), tg.grid_inc)
        .with_size_fallback(tg.size_mean, tg.size_std_dev)
}

/// Historical tracks resampled to the model time step; tracks that cannot
/// be resampled are skipped
pub fn load_history(config: &SimulationConfig) -> Result<Option<Vec<Track>>> {
    let Some(path) = &config.input.historical_tracks else {
        return Ok(None);
    };
    let tg = &config.track_generator;
    let raw = read_tracks(path)?;
    let n_raw = raw.len();
    let history: Vec<Track> = raw
        .iter()
        .filter_map(|t| match interpolate_track(t, tg.time_step, tg.interpolation) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Skipping historical track {}: {e}", t.cyclone_number);
                None
            }
        })
        .collect();
    info!("Loaded {} of {n_raw} historical tracks from {}", history.len(), path.display());
    Ok(Some(history))
}

/// Build and persist the initial-condition CDFs, the per-cell coefficient
/// sets and the genesis density from the historical tracks
pub fn run_statistics(config: &SimulationConfig) -> Result<()> {
    let history = load_history(config)?
        .ok_or_else(|| CycloneError::InvalidConfig("input.historical_tracks is required for statistics".into()))?;
    let store = store(config);
    let env = Environment::from_config(&config.input)?;

    info!("Calculating initial-condition distributions");
    let initial = store.compute_initial_cdfs(&history)?;
    info!("Calculating cell statistics");
    let stats = store.load_or_compute_cell_statistics(
        Some(history.as_slice()),
        env.landfall.as_ref(),
        config.track_generator.min_sample,
    )?;
    store.save(&initial, &stats)?;

    let tg = &config.track_generator;
    let genesis = GenesisPdf::from_points(
        history.iter().filter_map(Track::first).map(|p| (p.lon, p.lat)),
        tg.grid_limit,
        tg.grid_space,
    )?;
    genesis.save(&config.process_path().join(GENESIS_PDF_FILE))?;
    Ok(())
}

/// Cyclone counts and stream offsets of every simulation unit.
///
/// Counts are Poisson with mean `floor(years_per_simulation) × frequency`,
/// drawn from the genesis seed so every worker sees the same plan.
pub fn plan_simulations(config: &SimulationConfig, draws_per_track: u64) -> Result<Vec<SimulationUnit>> {
    let tg = &config.track_generator;
    let mean = tg.years_per_simulation.floor() * tg.frequency;
    let mut rng = TrackRng::new(tg.genesis_seed);
    let poisson = if mean > 0.0 {
        Some(Poisson::new(mean).map_err(|e| CycloneError::InvalidConfig(format!("genesis frequency {mean}: {e}")))?)
    } else {
        None
    };

    let mut units = Vec::with_capacity(tg.num_simulations);
    let mut blocks = 0u64;
    for index in 0..tg.num_simulations {
        let tracks = poisson.as_ref().map_or(0, |p| {
            let n: f64 = rng.sample(p);
            n as usize
        });
        units.push(SimulationUnit {
            index,
            tracks,
            offset: blocks * draws_per_track,
        });
        // One block of initial-condition draws per unit plus one per track
        blocks += tracks as u64 + 1;
    }
    debug!(
        "Generating {} total tracks from {} simulations",
        units.iter().map(|u| u.tracks).sum::<usize>(),
        units.len()
    );
    Ok(units)
}

fn genesis_origin(config: &SimulationConfig) -> Result<GenesisPdf> {
    let path = config.process_path().join(GENESIS_PDF_FILE);
    if !path.exists() {
        return Err(CycloneError::MissingDistribution(path));
    }
    GenesisPdf::load(&path)
}

/// Load distributions, statistics and environment into a generator
pub fn track_generator(config: &SimulationConfig) -> Result<TrackGenerator> {
    let tg = &config.track_generator;
    let store = store(config);
    let env = Environment::from_config(&config.input)?;
    let initial = store.load()?;
    let history = load_history(config)?;
    let stats = store.load_or_compute_cell_statistics(history.as_deref(), env.landfall.as_ref(), tg.min_sample)?;
    let origin = genesis_origin(config)?;

    Ok(
        TrackGenerator::new(cell_grid(config), tg.time_step, tg.num_time_steps, initial, stats, env)
            .with_inner_limit(tg.inner_grid_limit)
            .with_origin(Box::new(origin)),
    )
}

fn run_unit(generator: &TrackGenerator, unit: SimulationUnit, seed: u64, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(track_file_name(unit.index));
    let tracks = if unit.tracks == 0 {
        Vec::new()
    } else {
        let mut rng = TrackRng::new(seed).substream(unit.offset);
        debug!("seed {seed} jump ahead {}", unit.offset);
        generator.generate_tracks(unit.tracks, GenesisPoint::default(), &mut rng)?
    };
    write_tracks(&path, &tracks)?;
    Ok(path)
}

/// Simulate every unit and write one `tracks.NNNN.csv` per unit.
///
/// Returns the files written, sorted.
pub fn run_track_generation(config: &SimulationConfig) -> Result<Vec<PathBuf>> {
    info!("Loading track generation settings");
    let generator = track_generator(config)?;
    let units = plan_simulations(config, generator.max_draws_per_track())?;
    let dir = config.track_path();
    std::fs::create_dir_all(&dir)?;

    let workers = worker_count(config);
    let seed = config.track_generator.track_seed;
    let per_worker: Vec<Vec<PathBuf>> = (0..workers)
        .into_par_iter()
        .map(|w| {
            partition(&units, workers, w)
                .map(|unit| run_unit(&generator, *unit, seed, &dir))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<_>>()?;

    let mut files: Vec<PathBuf> = per_worker.into_iter().flatten().collect();
    files.sort();
    info!("Wrote {} track files to {}", files.len(), dir.display());
    Ok(files)
}

/// Write one gust file per track file in the track directory
pub fn run_windfield(config: &SimulationConfig) -> Result<Vec<PathBuf>> {
    info!("Loading wind field settings");
    let files = list_track_files(&config.track_path())?;
    let generator = WindfieldGenerator::new(config.windfield.clone()).with_region(config.windfield_region());
    let out = config.windfield_path();

    let workers = worker_count(config);
    let per_worker: Vec<Vec<PathBuf>> = (0..workers)
        .into_par_iter()
        .map(|w| {
            let mine: Vec<PathBuf> = partition(&files, workers, w).cloned().collect();
            generator.dump_gusts_from_trackfiles(&mine, &out)
        })
        .collect::<Result<_>>()?;

    let mut written: Vec<PathBuf> = per_worker.into_iter().flatten().collect();
    written.sort();
    info!("Wrote {} gust files to {}", written.len(), out.display());
    Ok(written)
}

/// Every stage; statistics only when historical tracks are configured
pub fn run_all(config: &SimulationConfig) -> Result<()> {
    if config.input.historical_tracks.is_some() {
        run_statistics(config)?;
    }
    run_track_generation(config)?;
    run_windfield(config)?;
    Ok(())
}
