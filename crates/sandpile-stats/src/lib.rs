//! Avalanche statistics for finished Sandpile runs.
//!
//! Everything here is derived and read-only: it takes a recorded
//! [`History`] plus the per-step durations and never touches a live
//! simulation.
//!
//! # Modules
//!
//! - [`activity`] -- Per-cell activity maps over the most recent avalanches
//!   and over a sliding window of avalanches.
//! - [`avalanche`] -- [`AvalancheEvent`] extraction, burn-in and size
//!   filtering, and waiting times between events.
//! - [`error`] -- Error types for analysis.
//! - [`histogram`] -- [`LogHistogram`] with logarithmic bins and a
//!   least-squares [`PowerLawFit`].
//! - [`summary`] -- [`analyze`], which produces an [`AvalancheAnalysis`]
//!   from a whole run.
//!
//! [`History`]: sandpile_core::History
//! [`AvalancheEvent`]: avalanche::AvalancheEvent
//! [`LogHistogram`]: histogram::LogHistogram
//! [`PowerLawFit`]: histogram::PowerLawFit
//! [`analyze`]: summary::analyze
//! [`AvalancheAnalysis`]: summary::AvalancheAnalysis

pub mod activity;
pub mod avalanche;
pub mod error;
pub mod histogram;
pub mod summary;

pub use activity::{ActivityMap, recent_activity, sliding_activity};
pub use avalanche::{AvalancheEvent, AvalancheFilter, avalanche_events, waiting_times};
pub use error::StatsError;
pub use histogram::{LogHistogram, PowerLawFit};
pub use summary::{AvalancheAnalysis, Distribution, analyze};
