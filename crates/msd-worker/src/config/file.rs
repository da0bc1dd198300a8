use crate::error::{Result, WorkerError};
use msd::engine::FlippingAlgorithm;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileEngineConfig {
    pub seed: Option<u64>,
    #[serde(rename = "flipping-algorithm")]
    pub flipping_algorithm: Option<FlippingAlgorithm>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileProtocolConfig {
    #[serde(rename = "cancel-token")]
    pub cancel_token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub engine: Option<FileEngineConfig>,
    pub protocol: Option<FileProtocolConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WorkerError::FileParsing {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
