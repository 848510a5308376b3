//! Lattice state and grain deposition.
//!
//! A [`Lattice`] owns the live [`Grid`] together with the toppling threshold.
//! Deposition adds exactly one grain and never relaxes; stabilizing is the
//! job of [`Lattice::stabilize`] in the [`relaxation`] module.
//!
//! Randomness is always passed in explicitly. The lattice never touches a
//! global generator, so two lattices driven by identically seeded
//! generators evolve identically.
//!
//! [`relaxation`]: crate::relaxation

use rand::Rng;

use crate::error::WorldError;
use crate::grid::{Grid, Site};

/// Grain count at which a site topples. Equal to the number of orthogonal
/// neighbors, so an interior topple conserves mass.
pub const TOPPLE_THRESHOLD: u32 = 4;

/// The live sandpile: a grid of grain counts plus its toppling threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    /// Current grain counts.
    grid: Grid,
    /// Sites holding at least this many grains are critical.
    threshold: u32,
}

impl Lattice {
    /// Wrap a stable grid.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellOutOfDomain`] if any cell holds
    /// [`TOPPLE_THRESHOLD`] or more grains.
    pub fn new(grid: Grid) -> Result<Self, WorldError> {
        let out_of_domain = grid.rows().enumerate().find_map(|(row, values)| {
            values
                .iter()
                .enumerate()
                .find(|&(_, &value)| value >= TOPPLE_THRESHOLD)
                .map(|(col, &value)| (row, col, value))
        });
        if let Some((row, col, value)) = out_of_domain {
            return Err(WorldError::CellOutOfDomain {
                row,
                col,
                value,
                threshold: TOPPLE_THRESHOLD,
            });
        }
        Ok(Self::from_raw(grid))
    }

    /// Wrap any grid, including one with critical sites.
    ///
    /// The result may be unstable; call [`Lattice::stabilize`] before
    /// relying on the stability invariant.
    pub const fn from_raw(grid: Grid) -> Self {
        Self {
            grid,
            threshold: TOPPLE_THRESHOLD,
        }
    }

    /// Create an `n x n` lattice with every cell drawn uniformly from
    /// `[0, threshold)`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSize`] if `size` is 0.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Result<Self, WorldError> {
        let mut grid = Grid::zeros(size)?;
        for cell in grid.cells_mut() {
            *cell = rng.random_range(0..TOPPLE_THRESHOLD);
        }
        Ok(Self::from_raw(grid))
    }

    /// Side length `n`.
    pub const fn size(&self) -> usize {
        self.grid.size()
    }

    /// The toppling threshold.
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Read-only view of the current grain counts.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable access for the relaxation engine.
    pub(crate) const fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Grain count at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.grid.get(row, col)
    }

    /// Total number of grains on the lattice.
    pub fn total_grains(&self) -> u64 {
        self.grid.total()
    }

    /// Whether every site is below the threshold.
    pub fn is_stable(&self) -> bool {
        self.grid.cells().iter().all(|&value| value < self.threshold)
    }

    /// All sites currently at or above the threshold, in row-major order.
    pub fn critical_sites(&self) -> Vec<Site> {
        self.critical_indices()
            .into_iter()
            .filter_map(|index| self.grid.site_of(index))
            .collect()
    }

    /// Row-major indices of every critical site.
    pub(crate) fn critical_indices(&self) -> Vec<usize> {
        self.grid
            .cells()
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value >= self.threshold)
            .map(|(index, _)| index)
            .collect()
    }

    /// Drop one grain on a uniformly random site. Row and column are drawn
    /// independently from `[0, n)`. Does not stabilize.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ArithmeticOverflow`] only if the chosen cell
    /// already holds `u32::MAX` grains, which a stabilized lattice never does.
    pub fn deposit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Site, WorldError> {
        let size = self.size();
        let row = rng.random_range(0..size);
        let col = rng.random_range(0..size);
        self.deposit_at(row, col)
    }

    /// Drop one grain on `(row, col)`. Does not stabilize.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::SiteOutOfBounds`] if the site is off the lattice
    /// (the lattice is left untouched), or [`WorldError::ArithmeticOverflow`]
    /// if the cell cannot hold another grain.
    pub fn deposit_at(&mut self, row: usize, col: usize) -> Result<Site, WorldError> {
        let size = self.size();
        let cell = self
            .grid
            .get_mut(row, col)
            .ok_or(WorldError::SiteOutOfBounds { row, col, size })?;
        *cell = cell.checked_add(1).ok_or(WorldError::ArithmeticOverflow)?;
        Ok(Site::new(row, col))
    }
}
