//! Spatial activity maps over recorded history.
//!
//! A map holds one counter per lattice cell. [`recent_activity`] counts how
//! many of the latest avalanches touched each cell, and [`sliding_activity`]
//! sums the magnitude of change per cell over a moving window of
//! avalanches, producing one map per window position.

use std::collections::VecDeque;

use serde::Serialize;

use sandpile_core::{History, Snapshot};

/// Per-cell counters over a square lattice, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityMap {
    size: usize,
    cells: Vec<u64>,
}

impl ActivityMap {
    /// An all-zero map for a `size` x `size` lattice.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size.saturating_mul(size)],
        }
    }

    /// Side length.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Counter at `(row, col)`, or `None` outside the lattice.
    pub fn get(&self, row: usize, col: usize) -> Option<u64> {
        if row >= self.size || col >= self.size {
            return None;
        }
        let index = row.checked_mul(self.size)?.checked_add(col)?;
        self.cells.get(index).copied()
    }

    /// Rows as slices, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u64]> {
        self.cells.chunks(self.size.max(1))
    }

    /// Sum over all cells.
    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .fold(0_u64, |sum, &value| sum.saturating_add(value))
    }

    /// Largest counter, 0 for an empty map.
    pub fn max(&self) -> u64 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Cells with a non-zero counter.
    pub fn active_cells(&self) -> usize {
        self.cells.iter().filter(|&&value| value > 0).count()
    }

    fn add_changed(&mut self, earlier: &Snapshot, later: &Snapshot) {
        let pairs = earlier.grid.cells().iter().zip(later.grid.cells());
        for (slot, (before, after)) in self.cells.iter_mut().zip(pairs) {
            if before != after {
                *slot = slot.saturating_add(1);
            }
        }
    }

    fn add_magnitude(&mut self, earlier: &Snapshot, later: &Snapshot) {
        let pairs = earlier.grid.cells().iter().zip(later.grid.cells());
        for (slot, (before, after)) in self.cells.iter_mut().zip(pairs) {
            *slot = slot.saturating_add(u64::from(before.abs_diff(*after)));
        }
    }

    fn remove_magnitude(&mut self, earlier: &Snapshot, later: &Snapshot) {
        let pairs = earlier.grid.cells().iter().zip(later.grid.cells());
        for (slot, (before, after)) in self.cells.iter_mut().zip(pairs) {
            *slot = slot.saturating_sub(u64::from(before.abs_diff(*after)));
        }
    }
}

/// Transitions that changed at least `min_size` cells, oldest first.
fn large_transitions(
    history: &History,
    min_size: usize,
) -> impl Iterator<Item = (&Snapshot, &Snapshot)> {
    history
        .transitions()
        .filter(move |(earlier, later)| earlier.grid.count_differences(&later.grid) >= min_size)
}

/// How many of the last `window` avalanches changed each cell.
///
/// Only transitions that changed at least `min_size` cells count as
/// avalanches. A `window` of 0 gives an all-zero map.
pub fn recent_activity(history: &History, window: usize, min_size: usize) -> ActivityMap {
    let mut map = ActivityMap::zeros(history.initial().size());
    let large: Vec<(&Snapshot, &Snapshot)> = large_transitions(history, min_size).collect();
    let skip = large.len().saturating_sub(window);
    for (earlier, later) in large.into_iter().skip(skip) {
        map.add_changed(earlier, later);
    }
    map
}

/// Summed per-cell change magnitude over each run of `window` consecutive
/// avalanches.
///
/// Frame `k` covers avalanches `k .. k + window`, starting with the window
/// at the first avalanche, so `n` avalanches give `n - window + 1` frames.
/// Only the last `frames` frames are returned, oldest first. Returns nothing when `window` is 0
/// or fewer than `window` avalanches exist.
pub fn sliding_activity(
    history: &History,
    window: usize,
    min_size: usize,
    frames: usize,
) -> Vec<ActivityMap> {
    if window == 0 || frames == 0 {
        return Vec::new();
    }

    let mut running = ActivityMap::zeros(history.initial().size());
    let mut in_window: VecDeque<(&Snapshot, &Snapshot)> = VecDeque::with_capacity(window);
    let mut output: VecDeque<ActivityMap> = VecDeque::new();

    for (earlier, later) in large_transitions(history, min_size) {
        running.add_magnitude(earlier, later);
        in_window.push_back((earlier, later));
        if in_window.len() > window {
            if let Some((old_earlier, old_later)) = in_window.pop_front() {
                running.remove_magnitude(old_earlier, old_later);
            }
        }
        if in_window.len() == window {
            if output.len() == frames {
                output.pop_front();
            }
            output.push_back(running.clone());
        }
    }
    output.into()
}
