//! One-shot analysis of a finished run.
//!
//! [`analyze`] turns a history and its durations into an
//! [`AvalancheAnalysis`]: filtered avalanche counts, size and duration
//! extremes, log-binned distributions with power-law fits, and activity
//! map peaks.

use serde::Serialize;
use tracing::{debug, warn};

use sandpile_core::History;
use sandpile_core::config::AnalysisConfig;

use crate::activity::{ActivityMap, recent_activity, sliding_activity};
use crate::avalanche::{AvalancheFilter, avalanche_events, waiting_times};
use crate::error::StatsError;
use crate::histogram::{LogHistogram, PowerLawFit};

/// A distribution and its log-log fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    /// Logarithmically binned counts.
    pub histogram: LogHistogram,
    /// Power-law fit, if enough bins are populated.
    pub fit: Option<PowerLawFit>,
}

impl Distribution {
    fn of(values: &[u64], config: &AnalysisConfig) -> Result<Self, StatsError> {
        let histogram =
            LogHistogram::build(values, config.histogram_edges, config.histogram_min)?;
        let fit = histogram.power_law_fit();
        Ok(Self { histogram, fit })
    }
}

/// Summary statistics of the avalanches in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvalancheAnalysis {
    /// History transitions before filtering.
    pub transitions: usize,
    /// Events that survived the burn-in and size filter.
    pub avalanches: usize,
    /// Mean avalanche size over surviving events.
    pub mean_size: f64,
    /// Largest avalanche size.
    pub max_size: u64,
    /// Mean avalanche duration over surviving events.
    pub mean_duration: f64,
    /// Longest avalanche duration.
    pub max_duration: u64,
    /// Avalanche size distribution.
    pub sizes: Distribution,
    /// Avalanche duration distribution.
    pub durations: Distribution,
    /// Distribution of gaps between consecutive avalanches.
    pub waiting_times: Distribution,
    /// Highest per-cell count in the recent activity map.
    pub recent_activity_peak: u64,
    /// Cells touched by at least one recent avalanche.
    pub recent_active_cells: usize,
    /// Sliding activity frames computed.
    pub sliding_frames: usize,
    /// Highest per-cell magnitude in any sliding frame.
    pub sliding_activity_peak: u64,
}

/// Analyse `history` and the matching per-step `durations`.
///
/// # Errors
///
/// Returns [`StatsError`] if a snapshot has no matching duration or the
/// histogram settings are invalid.
pub fn analyze(
    history: &History,
    durations: &[u64],
    config: &AnalysisConfig,
) -> Result<AvalancheAnalysis, StatsError> {
    let events = avalanche_events(history, durations)?;
    let filter = AvalancheFilter::from_config(config);
    let kept = filter.apply(&events);

    if events.len() <= filter.transient_transitions {
        warn!(
            transitions = events.len(),
            transient = filter.transient_transitions,
            "history is shorter than the transient window"
        );
    } else if kept.is_empty() {
        warn!(
            transitions = events.len(),
            min_size = filter.min_size,
            "no avalanches survived filtering"
        );
    }

    let sizes: Vec<u64> = kept
        .iter()
        .filter_map(|event| u64::try_from(event.size).ok())
        .collect();
    let event_durations: Vec<u64> = kept.iter().map(|event| event.duration).collect();
    let gaps = waiting_times(&kept);

    let recent = recent_activity(history, config.activity_window, filter.min_size);
    let frames = sliding_activity(
        history,
        config.sliding_window,
        filter.min_size,
        config.sliding_frames,
    );

    let analysis = AvalancheAnalysis {
        transitions: events.len(),
        avalanches: kept.len(),
        mean_size: mean(&sizes),
        max_size: sizes.iter().copied().max().unwrap_or(0),
        mean_duration: mean(&event_durations),
        max_duration: event_durations.iter().copied().max().unwrap_or(0),
        sizes: Distribution::of(&sizes, config)?,
        durations: Distribution::of(&event_durations, config)?,
        waiting_times: Distribution::of(&gaps, config)?,
        recent_activity_peak: recent.max(),
        recent_active_cells: recent.active_cells(),
        sliding_frames: frames.len(),
        sliding_activity_peak: frames.iter().map(ActivityMap::max).max().unwrap_or(0),
    };
    debug!(
        transitions = analysis.transitions,
        avalanches = analysis.avalanches,
        "analysis complete"
    );
    Ok(analysis)
}

/// Arithmetic mean, 0 for an empty slice.
#[allow(clippy::cast_precision_loss)]
fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum = values
        .iter()
        .fold(0_u128, |sum, &value| sum.saturating_add(u128::from(value)));
    sum as f64 / values.len() as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use sandpile_world::Grid;

    use super::*;

    fn config(transient: usize) -> AnalysisConfig {
        AnalysisConfig {
            transient_transitions: transient,
            histogram_edges: 3,
            histogram_min: 1.0,
            ..AnalysisConfig::default()
        }
    }

    fn grid(rows: Vec<Vec<u32>>) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn mean_handles_empty_and_values() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2, 4, 6]), 4.0);
    }

    #[test]
    fn summarizes_filtered_events() {
        let mut history = History::new(&grid(vec![vec![0, 0], vec![0, 0]]));
        history.record(1, &grid(vec![vec![1, 0], vec![0, 0]]));
        history.record(2, &grid(vec![vec![0, 1], vec![1, 1]]));
        history.record(3, &grid(vec![vec![1, 0], vec![0, 1]]));
        let durations = [0, 3, 1];

        let analysis = analyze(&history, &durations, &config(0)).unwrap();
        assert_eq!(analysis.transitions, 3);
        // The first transition changes a single cell.
        assert_eq!(analysis.avalanches, 2);
        assert_eq!(analysis.max_size, 4);
        assert_eq!(analysis.mean_size, 3.5);
        assert_eq!(analysis.max_duration, 3);
        assert_eq!(analysis.mean_duration, 2.0);
        assert_eq!(analysis.sizes.histogram.total(), 2);
        assert_eq!(analysis.waiting_times.histogram.total(), 1);
        assert_eq!(analysis.recent_active_cells, 4);
    }

    #[test]
    fn short_history_gives_empty_analysis() {
        let history = History::new(&grid(vec![vec![0]]));
        let analysis = analyze(&history, &[], &config(1_000)).unwrap();
        assert_eq!(analysis.avalanches, 0);
        assert_eq!(analysis.mean_size, 0.0);
        assert!(analysis.sizes.histogram.is_empty());
        assert!(analysis.sizes.fit.is_none());
        assert_eq!(analysis.sliding_frames, 0);
    }

    #[test]
    fn invalid_histogram_settings_are_errors() {
        let history = History::new(&grid(vec![vec![0]]));
        let bad = AnalysisConfig {
            histogram_edges: 1,
            ..AnalysisConfig::default()
        };
        assert_eq!(
            analyze(&history, &[], &bad),
            Err(StatsError::InvalidBinCount { count: 1 })
        );
    }
}
