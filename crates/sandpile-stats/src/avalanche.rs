//! Avalanche events derived from history and per-step durations.
//!
//! Every transition between two consecutive history snapshots is one
//! event. Its size is the number of cells that differ, and its duration is
//! the relaxation iteration count of the step that produced the later
//! snapshot.
//!
//! Analysis usually discards an initial burn-in window, while the pile is
//! still filling up toward the critical state, and ignores events that
//! changed at most one cell (the deposit landed without toppling).

use serde::Serialize;

use sandpile_core::History;
use sandpile_core::config::AnalysisConfig;

use crate::error::StatsError;

/// One history transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvalancheEvent {
    /// 0-based index of the transition within history.
    pub transition: usize,
    /// Step that produced the later snapshot.
    pub step: u64,
    /// Number of cells that changed.
    pub size: usize,
    /// Relaxation iterations of the producing step.
    pub duration: u64,
}

/// Build one [`AvalancheEvent`] per history transition.
///
/// # Errors
///
/// Returns [`StatsError::DurationMissing`] if a snapshot's step has no
/// matching entry in `durations`.
pub fn avalanche_events(
    history: &History,
    durations: &[u64],
) -> Result<Vec<AvalancheEvent>, StatsError> {
    history
        .transitions()
        .enumerate()
        .map(|(transition, (earlier, later))| {
            let duration = later
                .step
                .checked_sub(1)
                .and_then(|index| usize::try_from(index).ok())
                .and_then(|index| durations.get(index))
                .copied()
                .ok_or(StatsError::DurationMissing { step: later.step })?;
            Ok(AvalancheEvent {
                transition,
                step: later.step,
                size: earlier.grid.count_differences(&later.grid),
                duration,
            })
        })
        .collect()
}

/// Burn-in and size cut applied before computing distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvalancheFilter {
    /// Transitions with an index below this are discarded.
    pub transient_transitions: usize,
    /// Events smaller than this are not avalanches.
    pub min_size: usize,
}

impl AvalancheFilter {
    /// Take the filter settings from the analysis configuration.
    pub const fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            transient_transitions: config.transient_transitions,
            min_size: config.min_avalanche_size,
        }
    }

    /// Whether `event` survives the filter.
    pub const fn accepts(&self, event: &AvalancheEvent) -> bool {
        event.transition >= self.transient_transitions && event.size >= self.min_size
    }

    /// Keep the events that survive the filter, preserving order.
    pub fn apply(&self, events: &[AvalancheEvent]) -> Vec<AvalancheEvent> {
        events
            .iter()
            .filter(|event| self.accepts(event))
            .copied()
            .collect()
    }
}

impl Default for AvalancheFilter {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Gaps, in history transitions, between consecutive events.
///
/// Applied to filtered events this gives the quiet interval between
/// avalanches.
pub fn waiting_times(events: &[AvalancheEvent]) -> Vec<u64> {
    events
        .windows(2)
        .filter_map(|pair| match pair {
            [earlier, later] => later.transition.checked_sub(earlier.transition),
            _ => None,
        })
        .filter_map(|gap| u64::try_from(gap).ok())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use sandpile_world::Grid;

    use super::*;

    fn grid(rows: Vec<Vec<u32>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn event(transition: usize, size: usize) -> AvalancheEvent {
        AvalancheEvent {
            transition,
            step: u64::try_from(transition).unwrap() + 1,
            size,
            duration: 1,
        }
    }

    #[test]
    fn events_pair_sizes_with_durations() {
        let mut history = History::new(&grid(vec![vec![0, 0], vec![0, 0]]));
        history.record(1, &grid(vec![vec![1, 0], vec![0, 0]]));
        history.record(3, &grid(vec![vec![0, 1], vec![1, 1]]));
        let durations = [0, 0, 2];

        let events = avalanche_events(&history, &durations).unwrap();
        assert_eq!(
            events,
            vec![
                AvalancheEvent {
                    transition: 0,
                    step: 1,
                    size: 1,
                    duration: 0
                },
                AvalancheEvent {
                    transition: 1,
                    step: 3,
                    size: 4,
                    duration: 2
                },
            ]
        );
    }

    #[test]
    fn missing_duration_is_reported() {
        let mut history = History::new(&grid(vec![vec![0]]));
        history.record(5, &grid(vec![vec![1]]));
        let result = avalanche_events(&history, &[0, 0]);
        assert_eq!(result, Err(StatsError::DurationMissing { step: 5 }));
    }

    #[test]
    fn fresh_history_has_no_events() {
        let history = History::new(&grid(vec![vec![0]]));
        assert!(avalanche_events(&history, &[]).unwrap().is_empty());
    }

    #[test]
    fn filter_drops_transients_and_small_events() {
        let events = vec![event(0, 9), event(1, 1), event(2, 5), event(3, 1), event(4, 2)];
        let filter = AvalancheFilter {
            transient_transitions: 1,
            min_size: 2,
        };
        let kept: Vec<usize> = filter.apply(&events).iter().map(|e| e.transition).collect();
        assert_eq!(kept, vec![2, 4]);
    }

    #[test]
    fn default_filter_matches_config_defaults() {
        let filter = AvalancheFilter::default();
        assert_eq!(filter.transient_transitions, 1_000);
        assert_eq!(filter.min_size, 2);
    }

    #[test]
    fn waiting_times_measure_gaps() {
        let events = vec![event(2, 3), event(3, 4), event(7, 2), event(20, 8)];
        assert_eq!(waiting_times(&events), vec![1, 4, 13]);
        assert!(waiting_times(&events[..1]).is_empty());
        assert!(waiting_times(&[]).is_empty());
    }
}
