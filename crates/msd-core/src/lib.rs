//! # MSD Core Library
//!
//! A spin-lattice model of molecular spintronic devices (MSDs): two
//! ferromagnetic leads bridged by molecules, sampled with the Metropolis
//! algorithm.
//!
//! ## Architecture
//!
//! The library follows a three-layer layout.
//!
//! - **[`core`]: The Model.** Vectors, generic cursors, the molecule graph, the
//!   lattice with its geometry solver, and the Hamiltonian that scores it. All
//!   of it is deterministic; nothing here draws random numbers on its own.
//!
//! - **[`engine`]: The Sampler.** Owns the pseudo-random generator and the
//!   flipping algorithm, and runs Metropolis steps against a lattice.
//!
//! - **[`workflows`]: The Procedures.** Plans multi-step runs with optional
//!   temperature and field ramps, reporting back after each batch.

pub mod core;
pub mod engine;
pub mod workflows;
