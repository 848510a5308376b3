//! Lattice state, grain deposition, and toppling relaxation for the Sandpile
//! simulation.
//!
//! This crate models the physical sandpile: a square lattice of grain counts
//! with absorbing edges, the deposition of single grains, and the relaxation
//! engine that topples critical sites until the lattice is stable again.
//!
//! # Modules
//!
//! - [`error`] -- Error types for lattice construction and relaxation.
//! - [`grid`] -- [`Grid`], the value type holding an `n x n` array of grain
//!   counts, plus [`Site`] coordinates.
//! - [`lattice`] -- [`Lattice`] wraps a [`Grid`] with the toppling threshold
//!   and implements random and targeted deposition.
//! - [`relaxation`] -- Synchronous multi-site toppling and the
//!   [`RelaxationReport`] it produces.
//!
//! [`Grid`]: grid::Grid
//! [`Site`]: grid::Site
//! [`Lattice`]: lattice::Lattice
//! [`RelaxationReport`]: relaxation::RelaxationReport

pub mod error;
pub mod grid;
pub mod lattice;
pub mod relaxation;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::{Grid, Site};
pub use lattice::{Lattice, TOPPLE_THRESHOLD};
pub use relaxation::{RelaxationReport, iteration_limit};
