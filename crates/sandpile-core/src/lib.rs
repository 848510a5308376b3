//! Simulation instance, history recording, configuration, and run loop for
//! the Sandpile simulation.
//!
//! Each step deposits one grain, relaxes the lattice to stability, appends
//! the relaxation duration, and records a snapshot if the stable grid
//! changed.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `sandpile-config.yaml` into
//!   strongly-typed structs.
//! - [`history`] -- [`History`] of deep-copied snapshots, appended only on
//!   observable change.
//! - [`runner`] -- Bounded run loop with [`StepCallback`] hooks and progress
//!   logging.
//! - [`simulation`] -- [`Sandpile`], the per-instance owner of lattice,
//!   history, durations, and random generator.
//!
//! [`History`]: history::History
//! [`StepCallback`]: runner::StepCallback
//! [`Sandpile`]: simulation::Sandpile

pub mod config;
pub mod history;
pub mod runner;
pub mod simulation;

pub use history::{History, Snapshot};
pub use simulation::{Sandpile, SimulationError, StepSummary};
