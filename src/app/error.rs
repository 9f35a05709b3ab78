use nonceling_core::CoreError;
use nonceling_io::IoError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the headless driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] IoError),
}

pub type Result<T> = std::result::Result<T, DriverError>;
