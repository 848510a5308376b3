//! Relaxation engine: drives a lattice from possibly-critical to stable.
//!
//! Each iteration is a synchronous wavefront. The engine first freezes the
//! set of critical sites, then builds a full delta buffer from that frozen
//! read, and only then writes the buffer back in one pass:
//!
//! 1. **Snapshot** -- collect every site at or above the threshold.
//! 2. **Read** -- for each source, queue one grain for each in-bounds
//!    orthogonal neighbor; grains that would leave the lattice are counted
//!    as boundary losses (absorbing boundary).
//! 3. **Write** -- subtract the threshold from every source, then add the
//!    queued grains. A site can be both a source and a recipient; the two
//!    effects combine because both were derived from the frozen read.
//!
//! # Termination
//!
//! Total topples needed to stabilize are bounded by total mass times the
//! expected exit time of a random walk from the lattice, which never
//! exceeds the lattice area. Each iteration performs at least one topple,
//! so [`iteration_limit`] is a hard upper bound. Hitting it means the
//! update itself is broken and is reported as
//! [`WorldError::RelaxationDiverged`].

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::WorldError;
use crate::grid::Grid;
use crate::lattice::Lattice;

/// Outcome of one full stabilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaxationReport {
    /// Synchronous iterations executed (the avalanche duration).
    pub iterations: u64,
    /// Total individual site topples across all iterations.
    pub topples: u64,
    /// Grains discarded across the absorbing boundary.
    pub boundary_losses: u64,
}

impl RelaxationReport {
    /// Whether the lattice was already stable (nothing toppled).
    pub const fn is_quiescent(&self) -> bool {
        self.iterations == 0
    }
}

/// Upper bound on relaxation iterations for a grid: `(mass + 1) * area`.
pub fn iteration_limit(grid: &Grid) -> u64 {
    let area = u64::try_from(grid.area()).unwrap_or(u64::MAX);
    grid.total().saturating_add(1).saturating_mul(area)
}

impl Lattice {
    /// Topple every critical site, wave by wave, until the lattice is stable.
    ///
    /// Returns a [`RelaxationReport`] with the iteration count (0 if the
    /// lattice was already stable), the number of topples, and the grains
    /// lost across the boundary.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::RelaxationDiverged`] if the iteration bound is
    /// exceeded, or [`WorldError::ArithmeticOverflow`] if a cell or counter
    /// overflows. Both indicate a defect, not a recoverable condition.
    pub fn stabilize(&mut self) -> Result<RelaxationReport, WorldError> {
        let limit = iteration_limit(self.grid());
        self.relax_with_limit(limit)
    }

    /// Relax with an explicit iteration bound instead of [`iteration_limit`].
    pub(crate) fn relax_with_limit(
        &mut self,
        limit: u64,
    ) -> Result<RelaxationReport, WorldError> {
        let threshold = self.threshold();
        let mut report = RelaxationReport::default();
        let mut incoming = vec![0_u32; self.grid().area()];

        loop {
            let sources = self.critical_indices();
            if sources.is_empty() {
                break;
            }
            if report.iterations >= limit {
                error!(
                    iterations = report.iterations,
                    limit,
                    critical_sites = sources.len(),
                    "relaxation exceeded its iteration bound"
                );
                return Err(WorldError::RelaxationDiverged {
                    iterations: report.iterations,
                    limit,
                });
            }

            // Read phase: every delta comes from the frozen pre-iteration grid.
            incoming.fill(0);
            let mut lost: u64 = 0;
            for &source in &sources {
                for neighbor in self.grid().orthogonal_neighbors(source) {
                    match neighbor {
                        Some(index) => {
                            if let Some(slot) = incoming.get_mut(index) {
                                *slot = slot.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                            }
                        }
                        None => {
                            lost = lost.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
                        }
                    }
                }
            }

            // Write phase.
            let cells = self.grid_mut().cells_mut();
            for &source in &sources {
                if let Some(cell) = cells.get_mut(source) {
                    *cell = cell
                        .checked_sub(threshold)
                        .ok_or(WorldError::ArithmeticOverflow)?;
                }
            }
            for (cell, &grains) in cells.iter_mut().zip(&incoming) {
                *cell = cell.checked_add(grains).ok_or(WorldError::ArithmeticOverflow)?;
            }

            let toppled = u64::try_from(sources.len()).unwrap_or(u64::MAX);
            report.topples = report
                .topples
                .checked_add(toppled)
                .ok_or(WorldError::ArithmeticOverflow)?;
            report.boundary_losses = report
                .boundary_losses
                .checked_add(lost)
                .ok_or(WorldError::ArithmeticOverflow)?;
            report.iterations = report
                .iterations
                .checked_add(1)
                .ok_or(WorldError::ArithmeticOverflow)?;
        }

        if !report.is_quiescent() {
            debug!(
                iterations = report.iterations,
                topples = report.topples,
                boundary_losses = report.boundary_losses,
                "lattice stabilized"
            );
        }
        Ok(report)
    }
}
