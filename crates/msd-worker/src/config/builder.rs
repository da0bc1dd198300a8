use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::WorkerConfig;
use crate::cli::Cli;
use crate::error::{Result, WorkerError};

pub fn build_config(cli: &Cli) -> Result<WorkerConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &cli.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let engine_file = file_config.engine.unwrap_or_default();
    let protocol_file = file_config.protocol.unwrap_or_default();

    let seed = cli.seed.or(engine_file.seed);
    let flipping_algorithm = cli
        .flipping_algorithm
        .or(engine_file.flipping_algorithm)
        .unwrap_or(defaults.flipping_algorithm);

    let cancel_token = cli
        .cancel_token
        .clone()
        .or(protocol_file.cancel_token)
        .unwrap_or(defaults.cancel_token)
        .trim()
        .to_string();
    if cancel_token.is_empty() {
        return Err(WorkerError::Argument(
            "The cancel token must not be blank.".to_string(),
        ));
    }

    Ok(WorkerConfig {
        seed,
        flipping_algorithm,
        cancel_token,
    })
}
