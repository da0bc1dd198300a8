use msd::engine::FlippingAlgorithm;

/// Settings resolved before the startup request is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Seed used when the startup request carries none; `None` keeps the
    /// engine's entropy seed.
    pub seed: Option<u64>,
    pub flipping_algorithm: FlippingAlgorithm,
    /// Control line that cancels a run, compared case-insensitively.
    pub cancel_token: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let defaults = super::defaults::DefaultsConfig::default();
        Self {
            seed: None,
            flipping_algorithm: defaults.flipping_algorithm,
            cancel_token: defaults.cancel_token,
        }
    }
}
