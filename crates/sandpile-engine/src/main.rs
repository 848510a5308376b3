//! Engine binary for the Sandpile simulation.
//!
//! Loads configuration, runs the simulation with progress logging, and
//! logs the avalanche analysis. Nothing is written to disk; results go to
//! the log only.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `sandpile-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build the sandpile from the lattice section
//! 4. Run the configured number of steps
//! 5. Analyse history and durations
//! 6. Log the summary, also as a single JSON line

mod error;

use std::path::Path;

use sandpile_core::Sandpile;
use sandpile_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use sandpile_core::runner::{self, ProgressLogger};
use sandpile_stats::{AvalancheAnalysis, analyze};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "sandpile-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the simulation or its
/// analysis fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration; logging depends on it.
    let config_path = Path::new(CONFIG_FILE);
    let config = load_config(config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    init_tracing(&config.logging);

    info!("sandpile-engine starting");
    if config_path.exists() {
        info!(path = CONFIG_FILE, "Configuration loaded");
    } else {
        info!("Config file not found, using defaults");
    }
    info!(
        size = config.lattice.size,
        seed = ?config.lattice.seed,
        prebuilt_grid = config.lattice.initial_grid.is_some(),
        steps = config.simulation.steps,
        "Run parameters"
    );

    run(&config)?;

    info!("sandpile-engine shutdown complete");
    Ok(())
}

/// Install the global subscriber in the configured format.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Build, run, and analyse one simulation.
fn run(config: &SimulationConfig) -> Result<(), EngineError> {
    // 3. Build the sandpile.
    let mut sandpile = Sandpile::from_config(&config.lattice)?;

    // 4. Run the simulation.
    let steps = config.simulation.steps;
    let mut progress = ProgressLogger::new(config.logging.progress_interval, steps);
    let result = runner::run_simulation(&mut sandpile, steps, &mut progress)?;
    runner::log_simulation_end(&result);

    // 5. Analyse.
    let analysis = analyze(sandpile.history(), sandpile.durations(), &config.analysis)?;

    // 6. Log the summary.
    log_analysis(&analysis);
    info!(summary = %serde_json::to_string(&analysis)?, "Analysis summary");
    Ok(())
}

/// Load the configuration at `path`, or defaults if it does not exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}

/// Log the headline numbers of an analysis.
fn log_analysis(analysis: &AvalancheAnalysis) {
    info!(
        transitions = analysis.transitions,
        avalanches = analysis.avalanches,
        mean_size = analysis.mean_size,
        max_size = analysis.max_size,
        mean_duration = analysis.mean_duration,
        max_duration = analysis.max_duration,
        "Avalanche statistics"
    );
    info!(
        size_exponent = analysis.sizes.fit.map(|fit| fit.exponent),
        duration_exponent = analysis.durations.fit.map(|fit| fit.exponent),
        waiting_exponent = analysis.waiting_times.fit.map(|fit| fit.exponent),
        "Power-law fits"
    );
    info!(
        recent_peak = analysis.recent_activity_peak,
        recent_active_cells = analysis.recent_active_cells,
        sliding_frames = analysis.sliding_frames,
        sliding_peak = analysis.sliding_activity_peak,
        "Activity maps"
    );
}
