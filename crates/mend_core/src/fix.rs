//! Automatic remediation of fixable bugs.

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mend_deps::{apply_rewrite, DependencyResolver, DEV_GROUP};
use mend_model::{DetectedDependency, ModuleSystemIssue};

use crate::bug::{Bug, BugKind};
use crate::installer::PackageInstaller;

/// Record of one fix attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAttempt {
    /// Id of the bug within its iteration
    pub bug_id: usize,
    pub success: bool,
    /// What was done or tried
    pub action: String,
    pub error: Option<String>,
}

impl FixAttempt {
    fn succeeded(bug_id: usize, action: String) -> Self {
        Self {
            bug_id,
            success: true,
            action,
            error: None,
        }
    }

    fn failed(bug_id: usize, action: String, error: impl Into<String>) -> Self {
        Self {
            bug_id,
            success: false,
            action,
            error: Some(error.into()),
        }
    }
}

/// Applies remediations one at a time, highest severity first.
#[derive(Clone, Default)]
pub struct FixApplier {
    resolver: DependencyResolver,
    installer: Option<Arc<dyn PackageInstaller>>,
}

impl FixApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the installer once after the batch's manifest updates.
    pub fn with_installer(mut self, installer: Arc<dyn PackageInstaller>) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn has_installer(&self) -> bool {
        self.installer.is_some()
    }

    /// Attempt every fixable bug, marking the ones that succeed.
    ///
    /// Bugs are visited CRITICAL first, detection order within a tier.
    /// Diagnostic-only bugs produce no attempt. A failure never stops the batch.
    /// Manifest additions are installed together; a failed install fails
    /// every dependency attempt of the batch.
    pub async fn apply_all(&self, bugs: &mut [Bug], project_path: &Path) -> Vec<FixAttempt> {
        let mut order: Vec<usize> = (0..bugs.len()).collect();
        order.sort_by_key(|&i| Reverse(bugs[i].severity));

        // (bug index, attempt)
        let mut attempts: Vec<(usize, FixAttempt)> = Vec::new();
        // Positions in `attempts` waiting on the install
        let mut added: Vec<usize> = Vec::new();

        for index in order {
            let bug = &bugs[index];
            if !bug.fixable {
                continue;
            }

            debug!("Fixing {}", bug);
            let attempt = match &bug.kind {
                BugKind::MissingDependency { dependency } => {
                    let attempt = self.add_dependency(bug.id, dependency, project_path);
                    if attempt.success {
                        added.push(attempts.len());
                    }
                    attempt
                }
                BugKind::ModuleSystemMismatch { issue } => {
                    Self::rewrite_module_syntax(bug.id, issue, project_path)
                }
                BugKind::Visual { .. } => continue,
            };
            attempts.push((index, attempt));
        }

        if !added.is_empty() {
            if let Some(result) = self.install(project_path).await {
                for &position in &added {
                    let attempt = &mut attempts[position].1;
                    match &result {
                        Ok(note) => attempt.action = format!("{}, {}", attempt.action, note),
                        Err(err) => {
                            attempt.success = false;
                            attempt.error = Some(err.clone());
                        }
                    }
                }
            }
        }

        attempts
            .into_iter()
            .map(|(index, attempt)| {
                if attempt.success {
                    info!("✅ #{} {}", attempt.bug_id, attempt.action);
                    bugs[index].fixed = true;
                } else {
                    warn!(
                        "❌ #{} {}: {}",
                        attempt.bug_id,
                        attempt.action,
                        attempt.error.as_deref().unwrap_or("unknown error")
                    );
                }
                attempt
            })
            .collect()
    }

    fn add_dependency(
        &self,
        bug_id: usize,
        dependency: &DetectedDependency,
        project_path: &Path,
    ) -> FixAttempt {
        let action = format!("add {} to {}", dependency.name, DEV_GROUP);

        let report = match self
            .resolver
            .auto_add_missing(std::slice::from_ref(dependency), project_path)
        {
            Ok(report) => report,
            Err(e) => return FixAttempt::failed(bug_id, action, e.to_string()),
        };
        if let Some(err) = report.write_error {
            return FixAttempt::failed(bug_id, action, err);
        }

        let action = match report.added.first() {
            Some((name, version)) => format!("added {}@{} to {}", name, version, DEV_GROUP),
            None => format!("{} already declared", dependency.name),
        };
        FixAttempt::succeeded(bug_id, action)
    }

    /// Install once for the batch. `None` without an installer.
    async fn install(&self, project_path: &Path) -> Option<Result<String, String>> {
        let installer = self.installer.as_ref()?;
        info!("Running {} in {:?}", installer.name(), project_path);

        let result = match installer.install(project_path).await {
            Ok(outcome) if outcome.success() => Ok(format!("{} succeeded", installer.name())),
            Ok(outcome) => Err(format!(
                "{} exited with {}: {}",
                installer.name(),
                outcome
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                outcome.stderr_tail.trim()
            )),
            Err(e) => Err(e.to_string()),
        };
        Some(result)
    }

    fn rewrite_module_syntax(bug_id: usize, issue: &ModuleSystemIssue, project_path: &Path) -> FixAttempt {
        let action = format!(
            "convert {} to {} syntax",
            issue.file.display(),
            issue.expected_system
        );
        match apply_rewrite(project_path, issue) {
            Ok(outcome) => FixAttempt::succeeded(
                bug_id,
                format!("{} ({} changes)", action, outcome.changes),
            ),
            Err(e) => FixAttempt::failed(bug_id, action, e.to_string()),
        }
    }
}
