//! Integration tests for whole-simulation behavior: the worked toppling
//! examples, mass balance, history growth, and seeded determinism.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use sandpile_core::config::SimulationConfig;
use sandpile_core::runner::{NoOpCallback, run_simulation};
use sandpile_core::{Sandpile, SimulationError};
use sandpile_world::WorldError;

fn single_grain(row: usize, col: usize) -> Vec<Vec<u32>> {
    let mut rows = vec![vec![0; 3]; 3];
    rows[row][col] = 3;
    rows
}

#[test]
fn center_deposit_topples_into_four_neighbors() {
    let mut pile = Sandpile::with_grid(single_grain(1, 1), Some(0)).unwrap();
    let summary = pile.step_at(1, 1).unwrap();

    assert_eq!(summary.relaxation.iterations, 1);
    assert_eq!(summary.relaxation.boundary_losses, 0);
    assert_eq!(pile.durations(), &[1]);
    assert_eq!(
        pile.grid().to_rows(),
        vec![vec![0, 1, 0], vec![1, 0, 1], vec![0, 1, 0]]
    );
}

#[test]
fn corner_deposit_loses_two_grains() {
    let mut pile = Sandpile::with_grid(single_grain(0, 0), Some(0)).unwrap();
    let summary = pile.step_at(0, 0).unwrap();

    assert_eq!(summary.relaxation.iterations, 1);
    assert_eq!(summary.relaxation.boundary_losses, 2);
    assert_eq!(pile.lattice().total_grains(), 2);
    assert_eq!(
        pile.grid().to_rows(),
        vec![vec![0, 1, 0], vec![1, 0, 0], vec![0, 0, 0]]
    );
}

#[test]
fn every_corner_and_edge_loses_the_right_amount() {
    // Corners shed 2 grains off-lattice, edge midpoints 1, the center 0.
    let cases = [
        ((0, 0), 2),
        ((0, 2), 2),
        ((2, 0), 2),
        ((2, 2), 2),
        ((0, 1), 1),
        ((1, 0), 1),
        ((1, 2), 1),
        ((2, 1), 1),
        ((1, 1), 0),
    ];
    for ((row, col), lost) in cases {
        let mut pile = Sandpile::with_grid(single_grain(row, col), None).unwrap();
        let summary = pile.step_at(row, col).unwrap();
        assert_eq!(summary.relaxation.boundary_losses, lost, "site ({row}, {col})");
        assert_eq!(pile.grid().get(row, col), Some(0));
    }
}

#[test]
fn stability_and_mass_balance_hold_every_step() {
    for size in [1_usize, 2, 5, 13] {
        let mut pile = Sandpile::new(size, Some(size as u64)).unwrap();
        for _ in 0..400 {
            let before = pile.lattice().total_grains();
            let summary = pile.step().unwrap();
            assert!(pile.lattice().is_stable(), "size {size} step {}", summary.step);
            assert_eq!(
                pile.lattice().total_grains(),
                before + 1 - summary.relaxation.boundary_losses
            );
        }
    }
}

#[test]
fn history_grows_only_on_change() {
    let mut pile = Sandpile::new(10, Some(77)).unwrap();
    for step in 1..=600_u64 {
        let before = pile.history().len();
        let previous = pile.history().latest().clone();
        let summary = pile.step().unwrap();
        let after = pile.history().len();

        let changed = previous.count_differences(pile.grid()) > 0;
        assert_eq!(summary.recorded, changed);
        assert_eq!(after, before + usize::from(changed));
        assert!(after as u64 <= step + 1);
    }
}

#[test]
fn history_snapshots_survive_later_steps() {
    let mut pile = Sandpile::new(6, Some(4)).unwrap();
    let initial = pile.grid().clone();
    pile.simulate(100).unwrap();
    assert_eq!(pile.history().initial(), &initial);

    // Every consecutive pair differs, and the latest matches the live grid.
    for (earlier, later) in pile.history().transitions() {
        assert!(earlier.grid.count_differences(&later.grid) > 0);
        assert!(later.step > earlier.step);
    }
    assert_eq!(pile.history().latest(), pile.grid());
}

#[test]
fn history_steps_index_into_durations() {
    let mut pile = Sandpile::new(12, Some(8)).unwrap();
    pile.simulate(300).unwrap();
    for snapshot in pile.history().snapshots().skip(1) {
        let index = usize::try_from(snapshot.step - 1).unwrap();
        assert!(index < pile.durations().len());
    }
}

#[test]
fn same_seed_gives_identical_runs() {
    let mut a = Sandpile::new(15, Some(1234)).unwrap();
    let mut b = Sandpile::new(15, Some(1234)).unwrap();
    a.simulate(1_000).unwrap();
    b.simulate(1_000).unwrap();

    assert_eq!(a.grid(), b.grid());
    assert_eq!(a.durations(), b.durations());
    assert_eq!(a.history(), b.history());
}

#[test]
fn different_seeds_diverge() {
    let mut a = Sandpile::new(15, Some(1)).unwrap();
    let mut b = Sandpile::new(15, Some(2)).unwrap();
    a.simulate(200).unwrap();
    b.simulate(200).unwrap();
    assert_ne!(a.history(), b.history());
}

#[test]
fn seeded_prebuilt_grids_are_deterministic() {
    let rows = vec![vec![3, 3, 3], vec![3, 3, 3], vec![3, 3, 3]];
    let mut a = Sandpile::with_grid(rows.clone(), Some(5)).unwrap();
    let mut b = Sandpile::with_grid(rows, Some(5)).unwrap();
    a.simulate(50).unwrap();
    b.simulate(50).unwrap();
    assert_eq!(a.durations(), b.durations());
    assert_eq!(a.grid(), b.grid());
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = SimulationConfig::parse("lattice:\n  size: 0\n").unwrap();
    let result = Sandpile::from_config(&config.lattice);
    assert!(matches!(
        result,
        Err(SimulationError::World {
            source: WorldError::InvalidSize { size: 0 }
        })
    ));

    let config =
        SimulationConfig::parse("lattice:\n  initial_grid:\n    - [0, 4]\n    - [0, 0]\n").unwrap();
    assert!(Sandpile::from_config(&config.lattice).is_err());
}

#[test]
fn run_loop_matches_simulate() {
    let mut looped = Sandpile::new(9, Some(31)).unwrap();
    let mut direct = Sandpile::new(9, Some(31)).unwrap();
    run_simulation(&mut looped, 250, &mut NoOpCallback).unwrap();
    direct.simulate(250).unwrap();
    assert_eq!(looped.history(), direct.history());
    assert_eq!(looped.durations(), direct.durations());
}
