//! # Core Module
//!
//! The physical model of a molecular spintronic device.
//!
//! ## Overview
//!
//! - **Vectors** ([`utils::vector`]) - Spherical and cylindrical helpers over `nalgebra` vectors
//! - **Models** ([`models`]) - Cursors, the molecule graph, parameters, geometry and the lattice
//! - **Energy** ([`hamiltonian`]) - Couplings and energy terms of the lattice
//! - **Binary I/O** ([`io`]) - Molecule serialization into flat byte buffers

pub mod hamiltonian;
pub mod io;
pub mod models;
pub mod utils;
