//! # Core Models Module
//!
//! Data structures describing a device and its state.
//!
//! ## Key Components
//!
//! - [`cursor`] - Bidirectional, bounds-checked cursors over indexable sequences
//! - [`molecule`] - The molecule graph instantiated along the molecule columns
//! - [`parameters`] - Hamiltonian coefficients, observables and their history
//! - [`geometry`] - Region layout of the lattice and the solver that resolves it
//! - [`lattice`] - Spins, fluxes and cached results of every site
//!
//! ## Usage
//!
//! ```ignore
//! use msd::core::models::geometry::LatticeBuilder;
//! use msd::core::models::molecule::MoleculeType;
//!
//! let lattice = LatticeBuilder::new(11, 10, 10)
//!     .mol_pos_l(5)
//!     .mol_pos_r(5)
//!     .height_l(4)
//!     .depth_r(4)
//!     .molecule_type(MoleculeType::Linear)
//!     .build()?;
//! println!("U = {}", lattice.results().u);
//! ```

pub mod cursor;
pub mod geometry;
pub mod lattice;
pub mod molecule;
pub mod parameters;
