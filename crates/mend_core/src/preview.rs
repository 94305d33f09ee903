//! Preview capture boundary.
//!
//! The browser automation that loads the app and records the screenshot,
//! console and network failures runs outside mend. A [`PreviewSource`] hands
//! its output to the visual phase once per iteration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use mend_visual::CapturedArtifacts;

use crate::error::{CoreError, CoreResult};

/// Supplies captured page-load artifacts for an iteration.
#[async_trait]
pub trait PreviewSource: Send + Sync {
    async fn capture(&self, project_path: &Path, iteration: u32) -> CoreResult<CapturedArtifacts>;
}

/// Re-reads a capture document written by the external collaborator.
#[derive(Debug, Clone)]
pub struct CaptureFileSource {
    capture_path: PathBuf,
    screenshot_path: Option<PathBuf>,
}

impl CaptureFileSource {
    pub fn new(capture_path: impl Into<PathBuf>) -> Self {
        Self {
            capture_path: capture_path.into(),
            screenshot_path: None,
        }
    }

    /// Screenshot to use instead of the one the document references.
    pub fn with_screenshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.screenshot_path = Some(path.into());
        self
    }
}

#[async_trait]
impl PreviewSource for CaptureFileSource {
    async fn capture(&self, _project_path: &Path, iteration: u32) -> CoreResult<CapturedArtifacts> {
        debug!("Reading capture {:?} for iteration {}", self.capture_path, iteration);
        let mut artifacts = CapturedArtifacts::load(&self.capture_path)
            .map_err(|e| CoreError::Capture(e.to_string()))?;
        if let Some(path) = &self.screenshot_path {
            artifacts = artifacts
                .with_screenshot_file(path)
                .map_err(|e| CoreError::Capture(e.to_string()))?;
        }
        Ok(artifacts)
    }
}
