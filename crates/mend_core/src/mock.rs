//! Scripted installer and preview source for testing.
//!
//! Both capture their calls and replay predefined responses, so sessions can
//! be driven without a package manager or a browser.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use mend_visual::CapturedArtifacts;

use crate::error::{CoreError, CoreResult};
use crate::installer::{InstallOutcome, PackageInstaller};
use crate::preview::PreviewSource;

/// Predefined installer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockInstall {
    Success,
    Failure { exit_code: i32, stderr: String },
    Timeout { after_secs: u64 },
}

impl MockInstall {
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::Failure {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

/// Mock package installer.
///
/// Responses are consumed in order; once exhausted the default applies.
#[derive(Clone)]
pub struct MockInstaller {
    responses: Arc<RwLock<Vec<MockInstall>>>,
    response_index: Arc<AtomicUsize>,
    default_response: Arc<RwLock<MockInstall>>,
    captured_calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInstaller {
    /// A mock that always succeeds.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            default_response: Arc::new(RwLock::new(MockInstall::Success)),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: MockInstall) -> Self {
        self.responses.write().push(response);
        self
    }

    pub fn with_default(self, response: MockInstall) -> Self {
        *self.default_response.write() = response;
        self
    }

    /// Project paths the installer was invoked on, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.captured_calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    fn next_response(&self) -> MockInstall {
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        self.responses
            .read()
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.default_response.read().clone())
    }
}

#[async_trait]
impl PackageInstaller for MockInstaller {
    fn name(&self) -> &str {
        "mock"
    }

    async fn install(&self, project_path: &Path) -> CoreResult<InstallOutcome> {
        self.captured_calls.write().push(project_path.to_path_buf());

        match self.next_response() {
            MockInstall::Success => Ok(InstallOutcome {
                exit_code: Some(0),
                duration_ms: 10,
                stderr_tail: String::new(),
            }),
            MockInstall::Failure { exit_code, stderr } => Ok(InstallOutcome {
                exit_code: Some(exit_code),
                duration_ms: 10,
                stderr_tail: stderr,
            }),
            MockInstall::Timeout { after_secs } => Err(CoreError::InstallerTimeout(after_secs)),
        }
    }
}

/// Mock preview source replaying captures per iteration.
///
/// Iteration `n` gets the `n`-th capture; later iterations repeat the last one.
#[derive(Clone, Default)]
pub struct MockPreview {
    captures: Arc<RwLock<Vec<CapturedArtifacts>>>,
    requested: Arc<RwLock<Vec<u32>>>,
}

impl MockPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture(self, artifacts: CapturedArtifacts) -> Self {
        self.captures.write().push(artifacts);
        self
    }

    /// Iterations a capture was requested for.
    pub fn requested(&self) -> Vec<u32> {
        self.requested.read().clone()
    }
}

#[async_trait]
impl PreviewSource for MockPreview {
    async fn capture(&self, _project_path: &Path, iteration: u32) -> CoreResult<CapturedArtifacts> {
        self.requested.write().push(iteration);
        let captures = self.captures.read();
        let index = (iteration.max(1) as usize - 1).min(captures.len().saturating_sub(1));
        captures
            .get(index)
            .cloned()
            .ok_or_else(|| CoreError::Capture("no capture scripted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_installer_replays_then_defaults() {
        let mock = MockInstaller::new()
            .with_response(MockInstall::failure(1, "ERESOLVE"))
            .with_response(MockInstall::Timeout { after_secs: 120 });
        let path = Path::new("/tmp/project");

        let first = mock.install(path).await.unwrap();
        assert!(!first.success());
        assert_eq!(first.stderr_tail, "ERESOLVE");
        assert!(matches!(mock.install(path).await, Err(CoreError::InstallerTimeout(120))));
        assert!(mock.install(path).await.unwrap().success());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_preview_repeats_last_capture() {
        let preview = MockPreview::new()
            .with_capture(CapturedArtifacts::new().with_page_status(500))
            .with_capture(CapturedArtifacts::new().with_page_status(200));
        let path = Path::new("/tmp/project");

        assert_eq!(preview.capture(path, 1).await.unwrap().page_status, Some(500));
        assert_eq!(preview.capture(path, 2).await.unwrap().page_status, Some(200));
        assert_eq!(preview.capture(path, 3).await.unwrap().page_status, Some(200));
        assert_eq!(preview.requested(), vec![1, 2, 3]);

        assert!(MockPreview::new().capture(path, 1).await.is_err());
    }
}
