//! Bounded simulation loop with per-step callbacks.
//!
//! [`run_simulation`] drives a [`Sandpile`] for a fixed number of steps,
//! hands every [`StepSummary`] to a [`StepCallback`], and aggregates the
//! run into a [`SimulationResult`]. [`ProgressLogger`] is the callback the
//! engine binary uses to report progress through `tracing`.

use serde::Serialize;
use tracing::{info, warn};

use crate::simulation::{Sandpile, SimulationError, StepSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    /// Steps executed in this run.
    pub total_steps: u64,
    /// Steps whose deposition caused at least one topple.
    pub avalanches: u64,
    /// Longest relaxation observed, in iterations.
    pub max_duration: u64,
    /// Most topples in a single step.
    pub max_topples: u64,
    /// Grains lost across the boundary during the run.
    pub boundary_losses: u64,
    /// Snapshots appended to history during the run.
    pub snapshots_recorded: u64,
    /// Grains on the lattice when the run ended.
    pub final_grains: u64,
}

impl SimulationResult {
    fn absorb(&mut self, summary: &StepSummary) {
        let relaxation = &summary.relaxation;
        self.total_steps = self.total_steps.saturating_add(1);
        if !relaxation.is_quiescent() {
            self.avalanches = self.avalanches.saturating_add(1);
        }
        self.max_duration = self.max_duration.max(relaxation.iterations);
        self.max_topples = self.max_topples.max(relaxation.topples);
        self.boundary_losses = self
            .boundary_losses
            .saturating_add(relaxation.boundary_losses);
        if summary.recorded {
            self.snapshots_recorded = self.snapshots_recorded.saturating_add(1);
        }
    }
}

/// Callback invoked after each step completes.
pub trait StepCallback {
    /// Called after a step completes successfully.
    fn on_step(&mut self, summary: &StepSummary, sandpile: &Sandpile);
}

/// A no-op step callback for testing.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _sandpile: &Sandpile) {}
}

/// Logs a progress line every `interval` steps.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    /// Steps between log lines.
    interval: u64,
    /// Total steps planned, for the log line.
    planned: u64,
}

impl ProgressLogger {
    /// Log every `interval` steps out of `planned`. An interval of 0 is
    /// treated as 1.
    pub fn new(interval: u64, planned: u64) -> Self {
        Self {
            interval: interval.max(1),
            planned,
        }
    }
}

impl StepCallback for ProgressLogger {
    fn on_step(&mut self, summary: &StepSummary, sandpile: &Sandpile) {
        if summary.step.checked_rem(self.interval) == Some(0) {
            info!(
                step = summary.step,
                planned = self.planned,
                grains = sandpile.lattice().total_grains(),
                snapshots = sandpile.history().len(),
                "progress"
            );
        }
    }
}

/// Run `steps` random steps, invoking `callback` after each.
///
/// # Errors
///
/// Returns [`RunnerError`] on the first failing step.
pub fn run_simulation(
    sandpile: &mut Sandpile,
    steps: u64,
    callback: &mut dyn StepCallback,
) -> Result<SimulationResult, RunnerError> {
    info!(
        steps,
        size = sandpile.lattice().size(),
        grains = sandpile.lattice().total_grains(),
        "Simulation starting"
    );

    let mut result = SimulationResult::default();
    for _ in 0..steps {
        let summary = sandpile.step()?;
        result.absorb(&summary);
        callback.on_step(&summary, sandpile);
    }
    result.final_grains = sandpile.lattice().total_grains();
    Ok(result)
}

/// Log the outcome of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        total_steps = result.total_steps,
        avalanches = result.avalanches,
        max_duration = result.max_duration,
        max_topples = result.max_topples,
        boundary_losses = result.boundary_losses,
        snapshots_recorded = result.snapshots_recorded,
        final_grains = result.final_grains,
        "Simulation ended"
    );

    if result.total_steps == 0 {
        warn!("Simulation ended with no steps executed");
    }
}
