//! Page-load artifacts captured by the browser automation layer.
//!
//! The capture is a JSON document; the screenshot travels as a separate PNG
//! file referenced by path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VisualError, VisualResult};
use crate::raster::Raster;

/// A console or log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub text: String,
    /// `file:line:column` or URL the browser attributed the entry to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An uncaught exception thrown on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeException {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A sub-resource that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRequest {
    pub url: String,
    /// HTTP status, absent when the request never got a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Browser resource type (`stylesheet`, `script`, `image`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl FailedRequest {
    pub fn new(url: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            url: url.into(),
            status,
            resource_type: None,
        }
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Stylesheets and scripts; without them the page cannot render.
    pub fn is_render_blocking(&self) -> bool {
        if let Some(kind) = &self.resource_type {
            return matches!(kind.to_ascii_lowercase().as_str(), "stylesheet" | "script");
        }
        let path = self
            .url
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        [".css", ".js", ".mjs", ".cjs", ".jsx", ".ts", ".tsx"]
            .iter()
            .any(|ext| path.ends_with(ext))
    }
}

/// The screenshot of a page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screenshot {
    /// Encoded PNG bytes
    Png(Vec<u8>),
    /// Already decoded pixels
    Raster(Raster),
}

impl Screenshot {
    pub fn to_raster(&self) -> VisualResult<Raster> {
        match self {
            Self::Png(bytes) => Raster::decode_png(bytes),
            Self::Raster(raster) => Ok(raster.clone()),
        }
    }
}

/// Everything captured from one page load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedArtifacts {
    /// Screenshot file, relative to the capture document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    #[serde(skip)]
    pub screenshot: Option<Screenshot>,
    #[serde(default)]
    pub console: Vec<ConsoleEntry>,
    #[serde(default)]
    pub exceptions: Vec<RuntimeException>,
    #[serde(default)]
    pub failed_requests: Vec<FailedRequest>,
    /// HTTP status of the top-level document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_status: Option<u16>,
}

impl CapturedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a capture document and the screenshot it references.
    pub fn load(path: &Path) -> VisualResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VisualError::Capture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut artifacts: Self = serde_json::from_str(&content).map_err(|e| VisualError::Capture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(rel) = artifacts.screenshot_path.clone() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            artifacts = artifacts.with_screenshot_file(&base.join(rel))?;
        }

        debug!(
            "Loaded capture {:?}: {} console, {} exceptions, {} failed requests",
            path,
            artifacts.console.len(),
            artifacts.exceptions.len(),
            artifacts.failed_requests.len()
        );
        Ok(artifacts)
    }

    /// Attach a PNG screenshot read from disk.
    pub fn with_screenshot_file(mut self, path: &Path) -> VisualResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| VisualError::Capture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.screenshot = Some(Screenshot::Png(bytes));
        Ok(self)
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn with_console(mut self, text: impl Into<String>, location: Option<&str>) -> Self {
        self.console.push(ConsoleEntry {
            text: text.into(),
            location: location.map(str::to_string),
        });
        self
    }

    pub fn with_exception(mut self, message: impl Into<String>, stack: Option<&str>) -> Self {
        self.exceptions.push(RuntimeException {
            message: message.into(),
            stack: stack.map(str::to_string),
        });
        self
    }

    pub fn with_failed_request(mut self, request: FailedRequest) -> Self {
        self.failed_requests.push(request);
        self
    }

    pub fn with_page_status(mut self, status: u16) -> Self {
        self.page_status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_blocking_by_type_then_extension() {
        assert!(FailedRequest::new("/x", Some(404)).with_resource_type("Stylesheet").is_render_blocking());
        assert!(!FailedRequest::new("/app.css", None).with_resource_type("image").is_render_blocking());
        assert!(FailedRequest::new("/src/main.tsx?t=1", Some(500)).is_render_blocking());
        assert!(!FailedRequest::new("/logo.svg", Some(404)).is_render_blocking());
    }

    #[test]
    fn test_load_capture_with_relative_screenshot() {
        let temp = tempdir().unwrap();
        let png = Raster::filled(2, 2, [255, 255, 255, 255]).encode_png().unwrap();
        std::fs::write(temp.path().join("shot.png"), png).unwrap();
        std::fs::write(
            temp.path().join("capture.json"),
            r#"{
  "screenshot_path": "shot.png",
  "console": [{"text": "[vite] Internal server error", "location": "main.tsx:1"}],
  "failed_requests": [{"url": "/index.css", "status": 500}],
  "page_status": 200
}"#,
        )
        .unwrap();

        let artifacts = CapturedArtifacts::load(&temp.path().join("capture.json")).unwrap();

        assert_eq!(artifacts.console.len(), 1);
        assert_eq!(artifacts.failed_requests[0].status, Some(500));
        assert_eq!(artifacts.page_status, Some(200));
        let raster = artifacts.screenshot.unwrap().to_raster().unwrap();
        assert_eq!(raster.pixel_count(), 4);
    }

    #[test]
    fn test_load_missing_capture() {
        let temp = tempdir().unwrap();
        let err = CapturedArtifacts::load(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, VisualError::Capture { .. }));
    }
}
