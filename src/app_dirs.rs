//! Application directory helpers anchored to a single `.shape_sketch` folder.
//!
//! Config, logs and model artifacts live under the OS config directory unless
//! `SHAPE_SKETCH_CONFIG_HOME` points somewhere else (tests, portable setups).

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".shape_sketch";
/// Environment variable that overrides the config base directory.
pub const CONFIG_HOME_ENV: &str = "SHAPE_SKETCH_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";
const MODELS_DIR_NAME: &str = "models";

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Layout of the application folder below a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Layout under `base`; nothing is created until a directory is requested.
    pub fn under(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(APP_DIR_NAME),
        }
    }

    /// Layout under the env override, else the OS config directory.
    pub fn resolve() -> Result<Self, AppDirError> {
        let base = std::env::var_os(CONFIG_HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .ok_or(AppDirError::NoBaseDir)?;
        Ok(Self::under(base))
    }

    pub fn root(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.clone())
    }

    pub fn logs(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join(LOGS_DIR_NAME))
    }

    pub fn models(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join(MODELS_DIR_NAME))
    }
}

/// Return the root `.shape_sketch` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.root()
}

/// Return the logs directory inside the app root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.logs()
}

/// Return the model artifact directory inside the app root, creating it if needed.
pub fn models_dir() -> Result<PathBuf, AppDirError> {
    AppDirs::resolve()?.models()
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
