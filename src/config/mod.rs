//! TOML-backed application settings.
//!
//! Every field carries a serde default so older or partial files keep loading;
//! values are clamped into usable ranges on load.

mod defaults;
mod errors;
mod io;
mod types;

#[cfg(test)]
mod tests;

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub use errors::ConfigError;
pub use io::{config_path, load_from, load_or_default, save, save_to_path};
pub use types::{
    AppConfig, CanvasSettings, DatasetSettings, ModelSettings, SketchSettings, TrainingSettings,
};
