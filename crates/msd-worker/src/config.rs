//! Worker configuration, layered from built-in defaults, an optional TOML
//! file and command-line flags. Fields of the startup request sit on top of
//! all three and are applied by the worker itself.

mod builder;
mod defaults;
mod file;
mod models;

pub use builder::build_config;
pub use models::WorkerConfig;
