use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Lattice has no sites to sample")]
    EmptyLattice,

    #[error("Invalid temperature kT = {0}")]
    InvalidTemperature(f64),
}
