//! The simulation instance: one lattice, its history, its durations, and its
//! random generator.
//!
//! A [`Sandpile`] exclusively owns everything it mutates. Its generator is a
//! seedable [`StdRng`] created at construction, so two instances built with
//! the same size and seed and driven through the same calls produce
//! identical lattices, histories, and duration sequences.
//!
//! Per step:
//!
//! 1. Deposit one grain (random site, or an explicit one via
//!    [`Sandpile::step_at`]).
//! 2. Stabilize, counting synchronous iterations.
//! 3. Append the iteration count to the duration sequence.
//! 4. Append a snapshot to history if the stable grid changed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

use sandpile_world::{Grid, Lattice, RelaxationReport, Site, WorldError};

use crate::config::LatticeConfig;
use crate::history::History;

/// Errors that can occur while building or stepping a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// Lattice construction, deposition, or relaxation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// The step counter would overflow.
    #[error("step counter overflow: cannot advance beyond u64::MAX")]
    StepOverflow,
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// 1-based step number.
    pub step: u64,
    /// Where the grain landed.
    pub site: Site,
    /// Iterations, topples, and boundary losses of the resulting avalanche.
    pub relaxation: RelaxationReport,
    /// Whether the stable grid differed from the last snapshot.
    pub recorded: bool,
}

/// A self-organized-critical sandpile simulation.
#[derive(Debug, Clone)]
pub struct Sandpile {
    /// The live lattice.
    lattice: Lattice,
    /// Snapshots at every observable change.
    history: History,
    /// Relaxation iterations per step, one entry per step.
    durations: Vec<u64>,
    /// Per-instance generator for initial cells and deposition sites.
    rng: StdRng,
    /// Steps taken so far.
    steps: u64,
}

impl Sandpile {
    /// Create an `n x n` sandpile with every cell drawn uniformly from
    /// `[0, threshold)`.
    ///
    /// With `seed = None` the generator is seeded from OS entropy and the
    /// run is not reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSize`] if `size` is 0.
    pub fn new(size: usize, seed: Option<u64>) -> Result<Self, SimulationError> {
        let mut rng = seeded_rng(seed);
        let lattice = Lattice::random(size, &mut rng)?;
        Ok(Self::assemble(lattice, rng))
    }

    /// Create a sandpile from explicit rows.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSize`] for no rows,
    /// [`WorldError::NotSquare`] for a ragged or rectangular grid, and
    /// [`WorldError::CellOutOfDomain`] if any cell is at or above the
    /// threshold.
    pub fn with_grid(rows: Vec<Vec<u32>>, seed: Option<u64>) -> Result<Self, SimulationError> {
        let lattice = Lattice::new(Grid::from_rows(rows)?)?;
        Ok(Self::assemble(lattice, seeded_rng(seed)))
    }

    /// Create a sandpile from a [`LatticeConfig`].
    ///
    /// An explicit `initial_grid` takes precedence over `size`.
    ///
    /// # Errors
    ///
    /// Same as [`Sandpile::new`] and [`Sandpile::with_grid`].
    pub fn from_config(config: &LatticeConfig) -> Result<Self, SimulationError> {
        match &config.initial_grid {
            Some(rows) => Self::with_grid(rows.clone(), config.seed),
            None => Self::new(config.size, config.seed),
        }
    }

    fn assemble(lattice: Lattice, rng: StdRng) -> Self {
        info!(
            size = lattice.size(),
            threshold = lattice.threshold(),
            grains = lattice.total_grains(),
            "sandpile created"
        );
        let history = History::new(lattice.grid());
        Self {
            lattice,
            history,
            durations: Vec::new(),
            rng,
            steps: 0,
        }
    }

    /// Deposit one grain on a random site and stabilize.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::World`] if relaxation reports an internal
    /// defect, or [`SimulationError::StepOverflow`] if the step counter
    /// overflows.
    pub fn step(&mut self) -> Result<StepSummary, SimulationError> {
        let site = self.lattice.deposit(&mut self.rng)?;
        self.settle(site)
    }

    /// Deposit one grain on `(row, col)` and stabilize.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::SiteOutOfBounds`] (leaving every piece of
    /// state untouched) if the site is off the lattice, plus the errors of
    /// [`Sandpile::step`].
    pub fn step_at(&mut self, row: usize, col: usize) -> Result<StepSummary, SimulationError> {
        let site = self.lattice.deposit_at(row, col)?;
        self.settle(site)
    }

    /// Run `step_count` random steps and return the final lattice.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first step error.
    pub fn simulate(&mut self, step_count: u64) -> Result<&Grid, SimulationError> {
        for _ in 0..step_count {
            self.step()?;
        }
        Ok(self.lattice.grid())
    }

    /// Stabilize after a deposit and update durations and history.
    fn settle(&mut self, site: Site) -> Result<StepSummary, SimulationError> {
        let step = self
            .steps
            .checked_add(1)
            .ok_or(SimulationError::StepOverflow)?;
        let relaxation = self.lattice.stabilize()?;
        self.steps = step;
        self.durations.push(relaxation.iterations);
        let recorded = self.history.record(step, self.lattice.grid());

        if !relaxation.is_quiescent() {
            debug!(
                step,
                row = site.row,
                col = site.col,
                duration = relaxation.iterations,
                topples = relaxation.topples,
                boundary_losses = relaxation.boundary_losses,
                "avalanche"
            );
        }

        Ok(StepSummary {
            step,
            site,
            relaxation,
            recorded,
        })
    }

    /// The live lattice.
    pub const fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Current grain counts.
    pub const fn grid(&self) -> &Grid {
        self.lattice.grid()
    }

    /// Recorded snapshots.
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Relaxation iterations per step, in step order.
    pub fn durations(&self) -> &[u64] {
        &self.durations
    }

    /// Number of steps taken.
    pub const fn steps(&self) -> u64 {
        self.steps
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}
