//! Error types for dependency resolution and config validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for dependency operations.
pub type DepsResult<T> = Result<T, DepsError>;

/// Errors that can occur while resolving dependencies or validating configs.
#[derive(Error, Debug)]
pub enum DepsError {
    #[error("Manifest not readable: {path} - {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest not parseable: {path} - {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("Manifest write failed: {path} - {message}")]
    ManifestWrite { path: PathBuf, message: String },

    #[error("Parse failed ({parser}): {message}")]
    Parse { parser: String, message: String },

    #[error("Rewrite failed: {file} - {message}")]
    Rewrite { file: PathBuf, message: String },

    #[error("Scanner task failed: {0}")]
    ScannerTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DepsError {
    /// Whether the error means the manifest itself is unusable.
    pub fn is_manifest_error(&self) -> bool {
        matches!(self, Self::ManifestRead { .. } | Self::ManifestParse { .. })
    }
}
