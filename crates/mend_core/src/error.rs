//! Error types for the orchestration core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while configuring or running a mend session.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config not loadable: {path} - {message}")]
    Config { path: PathBuf, message: String },

    #[error("Installer failed to start: {0}")]
    InstallerSpawn(String),

    #[error("Installer timed out after {0}s")]
    InstallerTimeout(u64),

    #[error("Preview capture failed: {0}")]
    Capture(String),

    #[error("Dependency error: {0}")]
    Deps(#[from] mend_deps::DepsError),

    #[error("Visual error: {0}")]
    Visual(#[from] mend_visual::VisualError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
