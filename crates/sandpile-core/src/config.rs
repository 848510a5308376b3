//! Configuration loading and typed config structures for the Sandpile
//! simulation.
//!
//! The canonical configuration lives in `sandpile-config.yaml` in the
//! working directory. This module defines strongly-typed structs that mirror
//! the YAML structure, and provides a loader that reads and validates the
//! file. Every field has a default, so an empty file (or no file at all) is
//! a valid configuration.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for env var {name}")]
    EnvOverride {
        /// The environment variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `sandpile-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Lattice construction parameters.
    #[serde(default)]
    pub lattice: LatticeConfig,

    /// Run length.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Post-hoc avalanche analysis parameters.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SANDPILE_SEED` overrides `lattice.seed`
    /// - `SANDPILE_STEPS` overrides `simulation.steps`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML,
    /// [`ConfigError::EnvOverride`] for an unparseable override, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SANDPILE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvOverride`] if a set variable does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SANDPILE_SEED") {
            let seed = val.parse().map_err(|_parse| ConfigError::EnvOverride {
                name: "SANDPILE_SEED",
                value: val,
            })?;
            self.lattice.seed = Some(seed);
        }
        if let Ok(val) = std::env::var("SANDPILE_STEPS") {
            self.simulation.steps = val.parse().map_err(|_parse| ConfigError::EnvOverride {
                name: "SANDPILE_STEPS",
                value: val,
            })?;
        }
        Ok(())
    }

    /// Check ranges that serde cannot express.
    ///
    /// Lattice size and initial-grid domain are checked when the sandpile
    /// is built, so they report the same errors as the programmatic API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if analysis.histogram_edges < 2 {
            return Err(invalid("analysis.histogram_edges must be at least 2"));
        }
        if !analysis.histogram_min.is_finite() || analysis.histogram_min <= 0.0 {
            return Err(invalid("analysis.histogram_min must be a positive number"));
        }
        if analysis.activity_window == 0 {
            return Err(invalid("analysis.activity_window must be at least 1"));
        }
        if analysis.sliding_window == 0 {
            return Err(invalid("analysis.sliding_window must be at least 1"));
        }
        if self.logging.progress_interval == 0 {
            return Err(invalid("logging.progress_interval must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Lattice construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LatticeConfig {
    /// Side length `n` of the square lattice.
    #[serde(default = "default_size")]
    pub size: usize,

    /// Random seed for reproducibility. Omit for OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Optional explicit starting grid (`n` rows of `n` values in `[0, 4)`).
    /// When present, `size` is ignored.
    #[serde(default)]
    pub initial_grid: Option<Vec<Vec<u32>>>,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            seed: None,
            initial_grid: None,
        }
    }
}

/// Run-length configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of deposition steps to simulate.
    #[serde(default = "default_steps")]
    pub steps: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
        }
    }
}

/// Avalanche analysis parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    /// History transitions discarded as pre-critical burn-in.
    #[serde(default = "default_transient_transitions")]
    pub transient_transitions: usize,

    /// Smallest changed-cell count that counts as an avalanche.
    #[serde(default = "default_min_avalanche_size")]
    pub min_avalanche_size: usize,

    /// Number of logarithmically spaced histogram edges.
    #[serde(default = "default_histogram_edges")]
    pub histogram_edges: usize,

    /// Lower edge of every histogram.
    #[serde(default = "default_histogram_min")]
    pub histogram_min: f64,

    /// Number of most recent avalanches folded into the activity map.
    #[serde(default = "default_activity_window")]
    pub activity_window: usize,

    /// Avalanches per frame of the sliding activity sequence.
    #[serde(default = "default_sliding_window")]
    pub sliding_window: usize,

    /// Most recent sliding activity frames kept.
    #[serde(default = "default_sliding_frames")]
    pub sliding_frames: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            transient_transitions: default_transient_transitions(),
            min_avalanche_size: default_min_avalanche_size(),
            histogram_edges: default_histogram_edges(),
            histogram_min: default_histogram_min(),
            activity_window: default_activity_window(),
            sliding_window: default_sliding_window(),
            sliding_frames: default_sliding_frames(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format of log lines.
    #[serde(default)]
    pub format: LogFormat,

    /// Steps between progress log lines.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

const fn default_size() -> usize {
    100
}

const fn default_steps() -> u64 {
    10_000
}

const fn default_transient_transitions() -> usize {
    1_000
}

const fn default_min_avalanche_size() -> usize {
    2
}

const fn default_histogram_edges() -> usize {
    50
}

const fn default_histogram_min() -> f64 {
    2.0
}

const fn default_activity_window() -> usize {
    100
}

const fn default_sliding_window() -> usize {
    50
}

const fn default_sliding_frames() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_progress_interval() -> u64 {
    1_000
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lattice.size, 100);
        assert_eq!(config.lattice.seed, None);
        assert_eq!(config.simulation.steps, 10_000);
        assert_eq!(config.analysis.transient_transitions, 1_000);
        assert_eq!(config.analysis.histogram_edges, 50);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let result = SimulationConfig::parse("logging:\n  format: xml\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
lattice:
  size: 3
  seed: 17
  initial_grid:
    - [0, 1, 2]
    - [3, 0, 1]
    - [2, 3, 0]

simulation:
  steps: 250

analysis:
  transient_transitions: 10
  min_avalanche_size: 3
  histogram_edges: 20
  histogram_min: 1.5
  activity_window: 40
  sliding_window: 5
  sliding_frames: 12

logging:
  level: debug
  format: json
  progress_interval: 25
";

        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.lattice.size, 3);
        assert_eq!(config.lattice.seed, Some(17));
        assert_eq!(
            config.lattice.initial_grid,
            Some(vec![vec![0, 1, 2], vec![3, 0, 1], vec![2, 3, 0]])
        );
        assert_eq!(config.simulation.steps, 250);
        assert_eq!(config.analysis.min_avalanche_size, 3);
        assert_eq!(config.analysis.histogram_min, 1.5);
        assert_eq!(config.analysis.sliding_window, 5);
        assert_eq!(config.analysis.sliding_frames, 12);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.progress_interval, 25);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("lattice:\n  seed: 7\n").unwrap();

        // Seed is overridden
        assert_eq!(config.lattice.seed, Some(7));
        // Everything else uses defaults
        assert_eq!(config.lattice.size, 100);
        assert_eq!(config.simulation.steps, 10_000);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn negative_size_is_a_parse_error() {
        let result = SimulationConfig::parse("lattice:\n  size: -5\n");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn rejects_degenerate_histogram() {
        let result = SimulationConfig::parse("analysis:\n  histogram_edges: 1\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = SimulationConfig::parse("analysis:\n  histogram_min: 0.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn rejects_zero_windows() {
        let result = SimulationConfig::parse("analysis:\n  activity_window: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        let result = SimulationConfig::parse("logging:\n  progress_interval: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SimulationConfig::from_file(Path::new("does-not-exist.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("sandpile-config.yaml");
        if path.exists() {
            let config = SimulationConfig::parse(&std::fs::read_to_string(&path).unwrap());
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
