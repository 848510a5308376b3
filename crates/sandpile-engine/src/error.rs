//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of a run so `main` can
//! propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sandpile_core::config::ConfigError,
    },

    /// The sandpile could not be built from configuration.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: sandpile_core::SimulationError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: sandpile_core::runner::RunnerError,
    },

    /// Avalanche analysis failed.
    #[error("analysis error: {source}")]
    Stats {
        /// The underlying analysis error.
        #[from]
        source: sandpile_stats::StatsError,
    },

    /// The analysis summary could not be encoded as JSON.
    #[error("summary encoding error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
