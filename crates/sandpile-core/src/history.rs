//! History recorder: snapshots of the lattice at every observable change.
//!
//! History always starts with the initial configuration. After each step the
//! stabilized grid is compared cell-by-cell with the most recent snapshot and
//! appended only if something differs. Snapshots are deep copies; the live
//! lattice never aliases recorded history.
//!
//! Each snapshot remembers the step that produced it, so a transition
//! between two snapshots can be joined with the duration recorded for that
//! step.

use serde::{Serialize, Serializer};
use tracing::trace;

use sandpile_world::Grid;

/// One recorded lattice configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Step that produced this configuration (0 for the initial one).
    pub step: u64,
    /// Independent copy of the stabilized grid.
    pub grid: Grid,
}

/// Append-only sequence of distinct consecutive lattice snapshots.
///
/// Serializes as a plain list of snapshots, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    /// The initial configuration (step 0).
    initial: Snapshot,
    /// Snapshots recorded after the initial one, oldest first.
    recorded: Vec<Snapshot>,
}

impl History {
    /// Start a history with the initial configuration as step 0.
    pub fn new(initial: &Grid) -> Self {
        Self {
            initial: Snapshot {
                step: 0,
                grid: initial.clone(),
            },
            recorded: Vec::new(),
        }
    }

    /// Append a copy of `grid` if it differs from the latest snapshot.
    ///
    /// Returns whether a snapshot was appended.
    pub fn record(&mut self, step: u64, grid: &Grid) -> bool {
        let changed = self.latest().count_differences(grid);
        if changed == 0 {
            return false;
        }
        trace!(step, changed, "recording snapshot");
        self.recorded.push(Snapshot {
            step,
            grid: grid.clone(),
        });
        true
    }

    /// The initial configuration.
    pub const fn initial(&self) -> &Grid {
        &self.initial.grid
    }

    /// Most recently recorded grid.
    pub fn latest(&self) -> &Grid {
        self.recorded
            .last()
            .map_or(&self.initial.grid, |snapshot| &snapshot.grid)
    }

    /// Number of recorded snapshots, including the initial one.
    pub fn len(&self) -> usize {
        self.recorded.len().saturating_add(1)
    }

    /// Always `false`: history holds at least the initial configuration.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Snapshot at `index` (0 is the initial configuration).
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        match index.checked_sub(1) {
            None => Some(&self.initial),
            Some(offset) => self.recorded.get(offset),
        }
    }

    /// All snapshots, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        std::iter::once(&self.initial).chain(&self.recorded)
    }

    /// Consecutive `(earlier, later)` snapshot pairs, oldest first.
    pub fn transitions(&self) -> impl Iterator<Item = (&Snapshot, &Snapshot)> {
        self.snapshots().zip(&self.recorded)
    }
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.snapshots())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<u32>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn starts_with_initial_configuration() {
        let initial = grid(vec![vec![1, 2], vec![3, 0]]);
        let history = History::new(&initial);
        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
        assert_eq!(history.initial(), &initial);
        assert_eq!(history.latest(), &initial);
        assert_eq!(history.get(0).map(|snapshot| snapshot.step), Some(0));
    }

    #[test]
    fn unchanged_grid_is_not_recorded() {
        let initial = grid(vec![vec![1, 2], vec![3, 0]]);
        let mut history = History::new(&initial);
        assert!(!history.record(1, &initial));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn changed_grid_is_recorded_with_step() {
        let initial = grid(vec![vec![1, 2], vec![3, 0]]);
        let next = grid(vec![vec![1, 2], vec![3, 1]]);
        let mut history = History::new(&initial);
        assert!(history.record(4, &next));
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest(), &next);
        assert_eq!(history.get(1).map(|snapshot| snapshot.step), Some(4));
        assert!(history.get(2).is_none());
    }

    #[test]
    fn snapshots_do_not_alias_source() {
        let mut live = grid(vec![vec![0, 0], vec![0, 0]]);
        let history = History::new(&live);
        live = grid(vec![vec![3, 3], vec![3, 3]]);
        assert_eq!(history.initial().total(), 0);
        assert_eq!(live.total(), 12);
    }

    #[test]
    fn transitions_pair_consecutive_snapshots() {
        let a = grid(vec![vec![0]]);
        let b = grid(vec![vec![1]]);
        let c = grid(vec![vec![2]]);
        let mut history = History::new(&a);
        history.record(1, &b);
        history.record(2, &b);
        history.record(3, &c);

        let steps: Vec<(u64, u64)> = history
            .transitions()
            .map(|(earlier, later)| (earlier.step, later.step))
            .collect();
        assert_eq!(steps, vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn serializes_as_snapshot_list() {
        let mut history = History::new(&grid(vec![vec![0]]));
        history.record(3, &grid(vec![vec![2]]));
        let json = serde_json::to_string(&history).unwrap();
        assert_eq!(json, r#"[{"step":0,"grid":[[0]]},{"step":3,"grid":[[2]]}]"#);
    }

    #[test]
    fn single_snapshot_has_no_transitions() {
        let history = History::new(&grid(vec![vec![0]]));
        assert_eq!(history.transitions().count(), 0);
    }
}
