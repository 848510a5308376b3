//! Error types for the `sandpile-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

/// Errors that can occur during lattice construction, deposition, or
/// relaxation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The requested lattice size is not a positive integer.
    #[error("invalid lattice size {size}: must be at least 1")]
    InvalidSize {
        /// The rejected size.
        size: usize,
    },

    /// A supplied grid is ragged or not square.
    #[error("grid row {row} has {len} cells, expected {expected}")]
    NotSquare {
        /// Index of the offending row.
        row: usize,
        /// Length of the offending row.
        len: usize,
        /// Expected row length (the number of rows).
        expected: usize,
    },

    /// A supplied cell value lies outside `[0, threshold)`.
    #[error("cell ({row}, {col}) holds {value} grains, must be below {threshold}")]
    CellOutOfDomain {
        /// Row of the offending cell.
        row: usize,
        /// Column of the offending cell.
        col: usize,
        /// The rejected value.
        value: u32,
        /// The toppling threshold.
        threshold: u32,
    },

    /// A targeted deposition addressed a site outside the lattice.
    #[error("site ({row}, {col}) is outside a {size}x{size} lattice")]
    SiteOutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Lattice side length.
        size: usize,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in lattice calculation")]
    ArithmeticOverflow,

    /// Relaxation ran past its iteration bound.
    ///
    /// The bound is derived from total grain mass and lattice area, so this
    /// can only happen if the toppling update itself is broken. It is an
    /// internal-consistency defect, never a recoverable condition.
    #[error("relaxation did not settle after {iterations} iterations (bound {limit})")]
    RelaxationDiverged {
        /// Iterations executed before giving up.
        iterations: u64,
        /// The iteration bound that was exceeded.
        limit: u64,
    },
}
