//! Error types for the `sandpile-stats` crate.

/// Errors that can occur while analysing a finished run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    /// A histogram needs at least two edges.
    #[error("histogram needs at least 2 edges, got {count}")]
    InvalidBinCount {
        /// The rejected edge count.
        count: usize,
    },

    /// A logarithmic histogram needs a finite, positive lower edge.
    #[error("histogram lower edge must be finite and positive, got {min}")]
    InvalidRange {
        /// The rejected lower edge.
        min: f64,
    },

    /// A history snapshot refers to a step with no recorded duration.
    #[error("no duration recorded for step {step}")]
    DurationMissing {
        /// The step produced by the snapshot.
        step: u64,
    },
}
