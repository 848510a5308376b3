//! Logarithmically binned histograms and power-law fits.
//!
//! Avalanche sizes and durations in the critical state follow power laws,
//! which show up as straight lines on log-log axes only if the bins widen
//! geometrically. Edges are `edge_count` points spaced evenly in `log10`
//! between `min` and the largest observed value, giving `edge_count - 1`
//! bins. Every bin is half-open `[lo, hi)` except the last, which also
//! includes its right edge. Values outside `[min, max]` are ignored.

use serde::Serialize;
use tracing::warn;

use crate::error::StatsError;

/// A histogram over logarithmically spaced bins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogHistogram {
    /// Bin edges, ascending. Empty when no value reached `min`.
    pub edges: Vec<f64>,
    /// Counts per bin; one fewer than `edges` (or empty).
    pub counts: Vec<u64>,
}

/// Least-squares line through a histogram on log-log axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerLawFit {
    /// Negated slope: counts fall off as `value^-exponent`.
    pub exponent: f64,
    /// `log10` of the count at value 1.
    pub intercept: f64,
    /// Non-empty bins used for the fit.
    pub points: usize,
}

/// `count` edges evenly spaced in `log10` from `min` to `max` inclusive.
///
/// The first and last edges are exactly `min` and `max`.
///
/// # Errors
///
/// Returns [`StatsError::InvalidBinCount`] if `count < 2`, or
/// [`StatsError::InvalidRange`] if `min` is not finite and positive or
/// `max < min`.
pub fn log_spaced_edges(min: f64, max: f64, count: usize) -> Result<Vec<f64>, StatsError> {
    if count < 2 {
        return Err(StatsError::InvalidBinCount { count });
    }
    if !min.is_finite() || min <= 0.0 || !max.is_finite() || max < min {
        return Err(StatsError::InvalidRange { min });
    }
    let divisions = count
        .checked_sub(1)
        .and_then(|d| u32::try_from(d).ok())
        .ok_or(StatsError::InvalidBinCount { count })?;

    let lo = min.log10();
    let step = (max.log10() - lo) / f64::from(divisions);
    let mut edges: Vec<f64> = (0..=divisions)
        .map(|i| 10_f64.powf(step.mul_add(f64::from(i), lo)))
        .collect();
    if let Some(first) = edges.first_mut() {
        *first = min;
    }
    if let Some(last) = edges.last_mut() {
        *last = max;
    }
    Ok(edges)
}

impl LogHistogram {
    /// Bin `values` into `edge_count - 1` logarithmic bins starting at `min`
    /// and ending at the largest value.
    ///
    /// Returns an empty histogram if no value reaches `min`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::InvalidBinCount`] or [`StatsError::InvalidRange`]
    /// for bad parameters, regardless of the data.
    pub fn build(values: &[u64], edge_count: usize, min: f64) -> Result<Self, StatsError> {
        if edge_count < 2 {
            return Err(StatsError::InvalidBinCount { count: edge_count });
        }
        if !min.is_finite() || min <= 0.0 {
            return Err(StatsError::InvalidRange { min });
        }

        let Some(max) = values.iter().copied().max().map(as_f64) else {
            return Ok(Self::default());
        };
        if max < min {
            warn!(min, max, "no values reach the histogram lower edge");
            return Ok(Self::default());
        }

        let edges = log_spaced_edges(min, max, edge_count)?;
        let mut counts = vec![0_u64; edges.len().saturating_sub(1)];
        for value in values.iter().copied().map(as_f64) {
            if let Some(slot) = bin_index(&edges, value).and_then(|bin| counts.get_mut(bin)) {
                *slot = slot.saturating_add(1);
            }
        }
        Ok(Self { edges, counts })
    }

    /// Whether the histogram has no bins.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all bin counts.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0_u64, |sum, &count| sum.saturating_add(count))
    }

    /// `(lower edge, upper edge, count)` for every bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, u64)> {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .filter_map(|(pair, &count)| match pair {
                [lo, hi] => Some((*lo, *hi, count)),
                _ => None,
            })
    }

    /// Fit `log10(count) = intercept - exponent * log10(lower edge)` over
    /// the non-empty bins.
    ///
    /// Returns `None` with fewer than two non-empty bins or when all of
    /// them share one lower edge.
    pub fn power_law_fit(&self) -> Option<PowerLawFit> {
        let points: Vec<(f64, f64)> = self
            .bins()
            .filter(|&(_, _, count)| count > 0)
            .map(|(lo, _, count)| (lo.log10(), as_f64(count).log10()))
            .collect();
        if points.len() < 2 {
            return None;
        }

        let n = as_f64(u64::try_from(points.len()).ok()?);
        let (sum_x, sum_y, sum_xx, sum_xy) = points.iter().fold(
            (0.0, 0.0, 0.0, 0.0),
            |(sx, sy, sxx, sxy), &(x, y)| (sx + x, sy + y, x.mul_add(x, sxx), x.mul_add(y, sxy)),
        );
        let denominator = n.mul_add(sum_xx, -(sum_x * sum_x));
        if denominator.abs() < f64::EPSILON {
            return None;
        }
        let slope = n.mul_add(sum_xy, -(sum_x * sum_y)) / denominator;
        let intercept = slope.mul_add(-sum_x, sum_y) / n;
        Some(PowerLawFit {
            exponent: -slope,
            intercept,
            points: points.len(),
        })
    }
}

/// Bin for `value`, or `None` if it falls outside `[first edge, last edge]`.
fn bin_index(edges: &[f64], value: f64) -> Option<usize> {
    let (&first, &last) = (edges.first()?, edges.last()?);
    if value < first || value > last {
        return None;
    }
    let bins = edges.len().checked_sub(1)?;
    if value >= last {
        return bins.checked_sub(1);
    }
    edges
        .partition_point(|&edge| edge <= value)
        .checked_sub(1)
        .map(|bin| bin.min(bins.saturating_sub(1)))
}

/// Counts and sizes stay far below 2^52, where `f64` is exact.
#[allow(clippy::cast_precision_loss)]
const fn as_f64(value: u64) -> f64 {
    value as f64
}
