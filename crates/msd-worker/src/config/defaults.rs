use msd::engine::FlippingAlgorithm;

pub struct DefaultsConfig {
    pub flipping_algorithm: FlippingAlgorithm,
    pub cancel_token: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            flipping_algorithm: FlippingAlgorithm::ContinuousSpin,
            cancel_token: "CANCEL".to_string(),
        }
    }
}
