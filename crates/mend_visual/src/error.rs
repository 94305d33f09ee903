//! Error types for visual analysis.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for visual operations.
pub type VisualResult<T> = Result<T, VisualError>;

/// Errors that can occur while loading or decoding captured artifacts.
#[derive(Error, Debug)]
pub enum VisualError {
    #[error("Screenshot decode failed: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("Screenshot encode failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Unsupported screenshot color type: {0}")]
    UnsupportedColor(String),

    #[error("Raster size mismatch: {width}x{height} needs {expected} bytes, got {actual}")]
    RasterSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid classification rule '{pattern}': {source}")]
    Rule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Capture not readable: {path} - {message}")]
    Capture { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
