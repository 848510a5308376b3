//! The square grain-count array underlying every lattice and snapshot.
//!
//! A [`Grid`] is a plain value: cloning it produces an independent copy, and
//! nothing else ever aliases its storage. Cells are stored row-major in a
//! flat vector. All coordinate math is checked so that no lookup can panic.
//!
//! Grids serialize as a list of rows (`[[u32; n]; n]`) so external consumers
//! such as plotting scripts receive plain arrays.

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// A lattice coordinate: `row` and `col` both in `[0, n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    /// Row index (north is row 0).
    pub row: usize,
    /// Column index (west is column 0).
    pub col: usize,
}

impl Site {
    /// Create a site from a row and column.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// An `n x n` array of grain counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct Grid {
    /// Side length `n` (always at least 1).
    size: usize,
    /// Row-major cell values, `size * size` entries.
    cells: Vec<u32>,
}

impl Grid {
    /// Create an empty (all-zero) grid of the given side length.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSize`] if `size` is 0, or
    /// [`WorldError::ArithmeticOverflow`] if `size * size` overflows.
    pub fn zeros(size: usize) -> Result<Self, WorldError> {
        let area = checked_area(size)?;
        Ok(Self {
            size,
            cells: vec![0; area],
        })
    }

    /// Build a grid from explicit rows.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidSize`] for an empty row list and
    /// [`WorldError::NotSquare`] if any row length differs from the number
    /// of rows.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, WorldError> {
        let size = rows.len();
        let area = checked_area(size)?;
        let mut cells = Vec::with_capacity(area);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != size {
                return Err(WorldError::NotSquare {
                    row,
                    len: values.len(),
                    expected: size,
                });
            }
            cells.extend(values);
        }
        Ok(Self { size, cells })
    }

    /// Side length `n`.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Number of cells (`n * n`).
    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// Row-major view of every cell.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Mutable row-major view of every cell.
    pub(crate) fn cells_mut(&mut self) -> &mut [u32] {
        &mut self.cells
    }

    /// Grain count at `(row, col)`, or `None` if the site is out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.index_of(row, col)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Mutable grain count at `(row, col)`.
    pub(crate) fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut u32> {
        let index = self.index_of(row, col)?;
        self.cells.get_mut(index)
    }

    /// Iterate over the rows of the grid, north to south.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.size.max(1))
    }

    /// Copy the grid out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }

    /// Total number of grains on the grid.
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .fold(0_u64, |sum, &value| sum.saturating_add(u64::from(value)))
    }

    /// Number of cells that differ between `self` and `other`.
    ///
    /// Grids of different sizes differ everywhere; the larger area is
    /// returned.
    pub fn count_differences(&self, other: &Self) -> usize {
        if self.size != other.size {
            return self.area().max(other.area());
        }
        self.cells
            .iter()
            .zip(&other.cells)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Row-major index of `(row, col)`, or `None` if out of bounds.
    pub(crate) fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.size || col >= self.size {
            return None;
        }
        row.checked_mul(self.size)?.checked_add(col)
    }

    /// Coordinates of a row-major index.
    pub(crate) fn site_of(&self, index: usize) -> Option<Site> {
        if index >= self.cells.len() {
            return None;
        }
        Some(Site {
            row: index.checked_div(self.size)?,
            col: index.checked_rem(self.size)?,
        })
    }

    /// Row-major indices of the north, south, west, and east neighbors of
    /// `index`. Neighbors that would fall off the lattice are `None`.
    pub(crate) fn orthogonal_neighbors(&self, index: usize) -> [Option<usize>; 4] {
        let Some(Site { row, col }) = self.site_of(index) else {
            return [None; 4];
        };
        let north = row
            .checked_sub(1)
            .and_then(|r| self.index_of(r, col));
        let south = row
            .checked_add(1)
            .and_then(|r| self.index_of(r, col));
        let west = col
            .checked_sub(1)
            .and_then(|c| self.index_of(row, c));
        let east = col
            .checked_add(1)
            .and_then(|c| self.index_of(row, c));
        [north, south, west, east]
    }
}

impl TryFrom<Vec<Vec<u32>>> for Grid {
    type Error = WorldError;

    fn try_from(rows: Vec<Vec<u32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<u32>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

/// Validate a side length and return `size * size`.
fn checked_area(size: usize) -> Result<usize, WorldError> {
    if size == 0 {
        return Err(WorldError::InvalidSize { size });
    }
    size.checked_mul(size).ok_or(WorldError::ArithmeticOverflow)
}
