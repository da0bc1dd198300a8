use msd::core::models::cursor::BoundsError;
use msd::core::models::geometry::ConfigurationError;
use msd::core::models::lattice::LatticeError;
use msd::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The controlling process closed the input stream.
    #[error("End of input")]
    EndOfInput,

    #[error("Invalid lattice configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Lattice(#[from] LatticeError),

    #[error("Invalid molecule: {0}")]
    Molecule(#[from] BoundsError),

    #[error("Simulation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Malformed {command} body: {source}")]
    Request {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
