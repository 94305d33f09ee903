//! Package installer boundary.
//!
//! Installation is delegated to an external package-manager process; only
//! its exit status decides success.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::InstallerConfig;
use crate::error::{CoreError, CoreResult};

/// Trailing stderr kept for reports.
const STDERR_TAIL: usize = 2000;

/// Result of one installer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOutcome {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub stderr_tail: String,
}

impl InstallOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Realizes manifest changes on disk.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Install the project's declared dependencies.
    ///
    /// Spawn failures and timeouts are errors; a non-zero exit is an outcome.
    async fn install(&self, project_path: &Path) -> CoreResult<InstallOutcome>;
}

/// Runs a configured command (`npm install` by default) in the project root.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandInstaller {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }
}

#[async_trait]
impl PackageInstaller for CommandInstaller {
    fn name(&self) -> &str {
        &self.program
    }

    async fn install(&self, project_path: &Path) -> CoreResult<InstallOutcome> {
        info!("Running {} {} in {:?}", self.program, self.args.join(" "), project_path);
        let start = Instant::now();

        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(project_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::InstallerSpawn(format!("{}: {}", self.program, e)))?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // Dropping the future kills the child.
                warn!("{} timed out after {:?}", self.program, self.timeout);
                return Err(CoreError::InstallerTimeout(self.timeout.as_secs()));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let skip = stderr.chars().count().saturating_sub(STDERR_TAIL);
        let outcome = InstallOutcome {
            exit_code: output.status.code(),
            duration_ms: start.elapsed().as_millis() as u64,
            stderr_tail: stderr.chars().skip(skip).collect(),
        };

        debug!("{} exited with {:?}", self.program, outcome.exit_code);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp = tempdir().unwrap();
        let installer = CommandInstaller::new(
            "mend-test-no-such-program",
            vec![],
            Duration::from_secs(5),
        );
        let err = installer.install(temp.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::InstallerSpawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_decides_success() {
        let temp = tempdir().unwrap();
        let ok = CommandInstaller::new("true", vec![], Duration::from_secs(5));
        assert!(ok.install(temp.path()).await.unwrap().success());

        let failing = CommandInstaller::new("false", vec![], Duration::from_secs(5));
        let outcome = failing.install(temp.path()).await.unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let temp = tempdir().unwrap();
        let slow = CommandInstaller::new("sleep", vec!["5".to_string()], Duration::from_millis(100));
        let err = slow.install(temp.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::InstallerTimeout(_)));
    }
}
