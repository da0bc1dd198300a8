//! # Engine Module
//!
//! Metropolis sampling of a [`Lattice`](crate::core::models::lattice::Lattice).
//!
//! ## Overview
//!
//! The engine owns everything stochastic: the seeded pseudo-random generator
//! and the rule used to propose new spins. The lattice itself stays
//! deterministic, so the same seed always replays the same trajectory.
//!
//! ## Architecture
//!
//! - **Sampling Contract** ([`Engine`]) - What the worker and workflows drive
//! - **Metropolis Sampler** ([`metropolis`]) - The default single-site implementation
//! - **Progress Monitoring** ([`progress`]) - Callbacks fired while a run advances
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod error;
pub mod metropolis;
pub mod progress;

use crate::core::models::lattice::Lattice;
use error::EngineError;
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use metropolis::MetropolisEngine;

/// How a Metropolis step proposes the next spin of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FlippingAlgorithm {
    /// Reverses the spin.
    UpDown,
    /// Draws a new direction uniformly from the sphere, keeping the magnitude.
    #[default]
    ContinuousSpin,
}

static FLIPPING_ALGORITHMS: Map<&'static str, FlippingAlgorithm> = phf_map! {
    "up_down_model" => FlippingAlgorithm::UpDown,
    "up-down" => FlippingAlgorithm::UpDown,
    "continuous_spin_model" => FlippingAlgorithm::ContinuousSpin,
    "continuous-spin" => FlippingAlgorithm::ContinuousSpin,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown flipping algorithm '{0}' (expected UP_DOWN_MODEL or CONTINUOUS_SPIN_MODEL)")]
pub struct ParseFlippingAlgorithmError(pub String);

impl FromStr for FlippingAlgorithm {
    type Err = ParseFlippingAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FLIPPING_ALGORITHMS
            .get(s.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| ParseFlippingAlgorithmError(s.to_string()))
    }
}

impl TryFrom<String> for FlippingAlgorithm {
    type Error = ParseFlippingAlgorithmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FlippingAlgorithm> for String {
    fn from(value: FlippingAlgorithm) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FlippingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlippingAlgorithm::UpDown => write!(f, "UP_DOWN_MODEL"),
            FlippingAlgorithm::ContinuousSpin => write!(f, "CONTINUOUS_SPIN_MODEL"),
        }
    }
}

/// A sampler that advances a lattice through Monte Carlo time.
///
/// Seeding semantics: [`Engine::set_seed`] restarts the random sequence from
/// the given seed, [`Engine::reseed`] draws a fresh seed first. `randomize` and
/// `reinitialize` restart the sequence from the current seed unless asked to
/// reseed, so repeating them replays the same trajectory.
pub trait Engine {
    fn seed(&self) -> u64;

    fn set_seed(&mut self, seed: u64);

    /// Picks a fresh seed, restarts the sequence from it and returns it.
    fn reseed(&mut self) -> u64;

    fn flipping_algorithm(&self) -> FlippingAlgorithm;

    fn set_flipping_algorithm(&mut self, algorithm: FlippingAlgorithm);

    /// Performs `steps` single-site Metropolis steps and advances `t` by `steps`.
    fn metropolis(&mut self, lattice: &mut Lattice, steps: u64) -> Result<(), EngineError>;

    /// Like [`Engine::metropolis`], appending the results to the record every
    /// `freq` steps (and after a final partial batch). `freq == 0` records once
    /// at the end.
    fn metropolis_recorded(
        &mut self,
        lattice: &mut Lattice,
        steps: u64,
        freq: u64,
    ) -> Result<(), EngineError> {
        let batch = if freq == 0 { steps } else { freq };
        let mut remaining = steps;
        while remaining > 0 {
            let n = remaining.min(batch);
            self.metropolis(lattice, n)?;
            lattice.record_results();
            remaining -= n;
        }
        Ok(())
    }

    fn randomize(&mut self, lattice: &mut Lattice, reseed: bool);

    fn reinitialize(&mut self, lattice: &mut Lattice, reseed: bool);
}
