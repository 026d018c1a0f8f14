//! Settings errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why the settings file could not be used.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Parser failure.
        source: serde_json::Error,
    },
    /// The merged document does not fit the settings schema, e.g. a string
    /// where a port number is expected.
    #[error("invalid settings: {0}")]
    Schema(#[from] serde_json::Error),
}

/// Result alias for settings loading.
pub type Result<T> = std::result::Result<T, SettingsError>;
