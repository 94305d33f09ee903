//! Orchestration controller.
//!
//! Runs the bounded detect, fix and re-validate loop over a project:
//!
//! 1. **Scanning**: dependency resolution and config validation, plus the
//!    visual phase when a preview source is attached
//! 2. **Fixing**: fixable bugs, highest severity first, one at a time
//! 3. **Validating**: stop conditions, checked in a fixed order
//!
//! The session always ends in [`OrchestratorState::Stopped`] or
//! [`OrchestratorState::Converged`]; errors never escape [`Orchestrator::run`].

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use mend_deps::{ConfigValidator, DependencyResolver, DepsError};
use mend_model::{ScanNote, Severity};
use mend_visual::VisualDetector;

use crate::bug::{Bug, CONFIG_VALIDATOR, DEPENDENCY_RESOLVER};
use crate::config::MendConfig;
use crate::error::CoreResult;
use crate::fix::{FixApplier, FixAttempt};
use crate::installer::{CommandInstaller, PackageInstaller};
use crate::preview::PreviewSource;

/// Caller-supplied check consulted before every iteration.
pub type AbortCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Scanning,
    Fixing,
    Validating,
    Stopped,
    Converged,
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Converged)
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scanning => "Scanning",
            Self::Fixing => "Fixing",
            Self::Validating => "Validating",
            Self::Stopped => "Stopped",
            Self::Converged => "Converged",
        };
        f.write_str(name)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum StopReason {
    /// An iteration detected no bugs
    Converged,
    CriticalUnresolved,
    /// Fixable bugs were attempted and every attempt failed
    FixesFailed,
    /// Only diagnostic-only bugs remain
    DiagnosticOnly,
    IterationLimit,
    ManifestUnavailable(String),
    ScanFailed(String),
    Aborted,
}

impl StopReason {
    /// Terminal state this reason leads to.
    pub fn state(&self) -> OrchestratorState {
        match self {
            Self::Converged => OrchestratorState::Converged,
            _ => OrchestratorState::Stopped,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => f.write_str("no bugs detected"),
            Self::CriticalUnresolved => f.write_str("critical bug unresolved"),
            Self::FixesFailed => f.write_str("no fixes available, manual intervention required"),
            Self::DiagnosticOnly => {
                f.write_str("no fixes available, only diagnostic findings remain")
            }
            Self::IterationLimit => f.write_str("iteration limit reached"),
            Self::ManifestUnavailable(err) => write!(f, "manifest unavailable: {}", err),
            Self::ScanFailed(err) => write!(f, "scan failed: {}", err),
            Self::Aborted => f.write_str("aborted by caller"),
        }
    }
}

/// One pass of scan, fix and validate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub number: u32,
    pub bugs: Vec<Bug>,
    pub fixes: Vec<FixAttempt>,
    /// Scan notes from every phase; informational only
    pub notes: Vec<ScanNote>,
    /// Whether the visual phase ran
    pub visual_checked: bool,
    pub should_stop: bool,
    pub stop_reason: Option<StopReason>,
    pub duration_ms: u64,
}

impl Iteration {
    fn new(number: u32) -> Self {
        Self {
            number,
            bugs: Vec::new(),
            fixes: Vec::new(),
            notes: Vec::new(),
            visual_checked: false,
            should_stop: false,
            stop_reason: None,
            duration_ms: 0,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.bugs.iter().filter(|b| b.severity == severity).count()
    }

    pub fn fixed_count(&self) -> usize {
        self.bugs.iter().filter(|b| b.fixed).count()
    }

    pub fn successful_fixes(&self) -> usize {
        self.fixes.iter().filter(|f| f.success).count()
    }

    fn has_unresolved_critical(&self) -> bool {
        self.bugs.iter().any(Bug::is_unresolved_critical)
    }
}

/// Cumulative session figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_bugs: usize,
    pub total_fixed: usize,
    /// `total_fixed / total_bugs`, 1.0 when nothing was detected
    pub success_rate: f64,
    pub iterations: usize,
}

/// A complete run over one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationSession {
    pub id: Uuid,
    pub project_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub iterations: Vec<Iteration>,
    pub state: OrchestratorState,
    pub stop_reason: Option<StopReason>,
    pub summary: SessionSummary,
}

impl OrchestrationSession {
    fn new(project_path: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_path: project_path.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            iterations: Vec::new(),
            state: OrchestratorState::Scanning,
            stop_reason: None,
            summary: SessionSummary::default(),
        }
    }

    fn transition(&mut self, next: OrchestratorState) {
        if self.state != next {
            info!("State: {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn finish(&mut self, reason: StopReason) {
        self.transition(reason.state());
        info!("Session {} finished: {}", self.id, reason);
        self.stop_reason = Some(reason);
        self.finished_at = Some(Utc::now());

        let total_bugs: usize = self.iterations.iter().map(|i| i.bugs.len()).sum();
        let total_fixed: usize = self.iterations.iter().map(Iteration::fixed_count).sum();
        self.summary = SessionSummary {
            total_bugs,
            total_fixed,
            success_rate: if total_bugs == 0 {
                1.0
            } else {
                total_fixed as f64 / total_bugs as f64
            },
            iterations: self.iterations.len(),
        };
    }

    pub fn is_converged(&self) -> bool {
        self.state == OrchestratorState::Converged
    }

    pub fn last_iteration(&self) -> Option<&Iteration> {
        self.iterations.last()
    }

    /// Human-readable orchestration report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("Orchestration Report\n");
        report.push_str(&format!("Session: {}\n", self.id));
        report.push_str(&format!("Project: {}\n\n", self.project_path.display()));

        for iteration in &self.iterations {
            report.push_str(&format!(
                "Iteration {}: {} bug(s) ({} critical, {} major, {} minor), {}/{} fix(es) applied{}\n",
                iteration.number,
                iteration.bugs.len(),
                iteration.count(Severity::Critical),
                iteration.count(Severity::Major),
                iteration.count(Severity::Minor),
                iteration.successful_fixes(),
                iteration.fixes.len(),
                if iteration.visual_checked { ", visual checked" } else { "" }
            ));
            for bug in &iteration.bugs {
                let mark = if bug.fixed {
                    "✅"
                } else if bug.fixable {
                    bug.severity.icon()
                } else {
                    "🔍"
                };
                report.push_str(&format!("  {} {}\n", mark, bug));
            }
            for fix in &iteration.fixes {
                match &fix.error {
                    None => report.push_str(&format!("     fix #{}: {}\n", fix.bug_id, fix.action)),
                    Some(err) => report.push_str(&format!(
                        "     fix #{} failed: {} ({})\n",
                        fix.bug_id, fix.action, err
                    )),
                }
            }
            for note in &iteration.notes {
                report.push_str(&format!("  ⚠️ {}\n", note));
            }
            report.push('\n');
        }

        let status = match self.state {
            OrchestratorState::Converged => "✅ CONVERGED".to_string(),
            state => format!("❌ {}", state.to_string().to_uppercase()),
        };
        report.push_str(&format!("Final state: {}", status));
        if let Some(reason) = &self.stop_reason {
            report.push_str(&format!(" ({})", reason));
        }
        report.push('\n');

        report.push_str(&format!(
            "Summary: {} bug(s) detected, {} fixed, success rate {:.1}% over {} iteration(s)",
            self.summary.total_bugs,
            self.summary.total_fixed,
            self.summary.success_rate * 100.0,
            self.summary.iterations
        ));

        report
    }

    /// Persist `session.json` and `report.txt` into `dir`.
    pub fn write_artifact(&self, dir: &Path) -> CoreResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let json_path = dir.join("session.json");
        std::fs::write(&json_path, serde_json::to_string_pretty(self)?)?;

        let report_path = dir.join("report.txt");
        std::fs::write(&report_path, format!("{}\n", self.report()))?;

        info!("Session artifacts written to {:?}", dir);
        Ok(vec![json_path, report_path])
    }
}

/// Drives the detect, fix and re-validate loop.
///
/// Owns one instance of each detector for the lifetime of the sessions it runs.
pub struct Orchestrator {
    max_iterations: u32,
    stop_on_critical: bool,
    resolver: DependencyResolver,
    validator: ConfigValidator,
    visual: VisualDetector,
    preview: Option<Arc<dyn PreviewSource>>,
    fixer: FixApplier,
    abort: Option<AbortCheck>,
}

impl Orchestrator {
    /// Build an orchestrator from configuration.
    ///
    /// The command installer is attached only when `run_installer` is set.
    pub fn from_config(config: &MendConfig) -> CoreResult<Self> {
        let visual = VisualDetector::new()?.with_blank_config(config.visual.blank_page());

        let mut fixer = FixApplier::new();
        if config.orchestrator.run_installer {
            fixer = fixer.with_installer(Arc::new(CommandInstaller::from_config(&config.installer)));
        }

        Ok(Self {
            max_iterations: config.orchestrator.max_iterations,
            stop_on_critical: config.orchestrator.stop_on_critical,
            resolver: DependencyResolver::new(),
            validator: ConfigValidator::new(),
            visual,
            preview: None,
            fixer,
            abort: None,
        })
    }

    /// Enable the visual phase.
    pub fn with_preview(mut self, preview: Arc<dyn PreviewSource>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_installer(mut self, installer: Arc<dyn PackageInstaller>) -> Self {
        self.fixer = self.fixer.with_installer(installer);
        self
    }

    pub fn with_abort_check(mut self, abort: AbortCheck) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run a session to a terminal state.
    pub async fn run(&self, project_path: &Path) -> OrchestrationSession {
        let mut session = OrchestrationSession::new(project_path);
        info!(
            "Starting session {} on {:?} (max {} iteration(s))",
            session.id, project_path, self.max_iterations
        );

        for number in 1..=self.max_iterations {
            if self.abort.as_ref().is_some_and(|abort| abort()) {
                warn!("Abort requested before iteration {}", number);
                session.finish(StopReason::Aborted);
                return session;
            }

            let iteration = self.run_iteration(&mut session, number, project_path).await;
            let reason = iteration.stop_reason.clone();
            session.iterations.push(iteration);

            if let Some(reason) = reason {
                session.finish(reason);
                return session;
            }
        }

        // Only reachable with a zero iteration budget.
        session.finish(StopReason::IterationLimit);
        session
    }

    async fn run_iteration(
        &self,
        session: &mut OrchestrationSession,
        number: u32,
        project_path: &Path,
    ) -> Iteration {
        let start = Instant::now();
        let mut iteration = Iteration::new(number);
        session.transition(OrchestratorState::Scanning);
        info!("Iteration {}/{}", number, self.max_iterations);

        if let Err(reason) = self.scan(&mut iteration, project_path).await {
            iteration.should_stop = true;
            iteration.stop_reason = Some(reason);
            iteration.duration_ms = start.elapsed().as_millis() as u64;
            return iteration;
        }

        if iteration.bugs.iter().any(|b| b.fixable) {
            session.transition(OrchestratorState::Fixing);
            iteration.fixes = self.fixer.apply_all(&mut iteration.bugs, project_path).await;
        }

        session.transition(OrchestratorState::Validating);
        let reason = self.evaluate(&iteration);
        iteration.should_stop = reason.is_some();
        iteration.stop_reason = reason;
        iteration.duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Iteration {} done: {} bug(s), {} fixed",
            number,
            iteration.bugs.len(),
            iteration.fixed_count()
        );
        iteration
    }

    /// Run every detector and normalize the results into bugs.
    async fn scan(&self, iteration: &mut Iteration, project_path: &Path) -> Result<(), StopReason> {
        let deps = self
            .resolver
            .scan_project(project_path)
            .await
            .map_err(stop_reason_for)?;
        let config = self
            .validator
            .detect_config_plugins(project_path)
            .map_err(stop_reason_for)?;

        let mut bugs = Vec::new();
        let mut seen = BTreeSet::new();
        for dep in deps.missing {
            seen.insert(dep.name.clone());
            bugs.push(Bug::missing_dependency(dep, DEPENDENCY_RESOLVER));
        }
        for dep in config.missing {
            if seen.insert(dep.name.clone()) {
                bugs.push(Bug::missing_dependency(dep, CONFIG_VALIDATOR));
            }
        }
        bugs.extend(config.module_system_issues.into_iter().map(Bug::module_system_mismatch));

        iteration.notes.extend(deps.notes);
        iteration.notes.extend(config.notes);

        if let Some(preview) = &self.preview {
            match preview.capture(project_path, iteration.number).await {
                Ok(artifacts) => {
                    let analysis = self.visual.analyze_results(&artifacts);
                    iteration.visual_checked = true;
                    iteration.notes.extend(analysis.notes);
                    bugs.extend(analysis.errors.into_iter().map(Bug::visual));
                }
                Err(e) => {
                    warn!("Visual phase skipped: {}", e);
                    iteration
                        .notes
                        .push(ScanNote::general(format!("visual phase skipped: {}", e)));
                }
            }
        }

        for (index, bug) in bugs.iter_mut().enumerate() {
            bug.id = index + 1;
        }
        info!(
            "Detected {} bug(s) ({} fixable)",
            bugs.len(),
            bugs.iter().filter(|b| b.fixable).count()
        );
        iteration.bugs = bugs;
        Ok(())
    }

    /// Stop conditions, first match wins.
    ///
    /// An unfixable CRITICAL stops as "no fixes available" only with
    /// `stop_on_critical` off; with it on (the default) it stops as
    /// "critical bug unresolved".
    fn evaluate(&self, iteration: &Iteration) -> Option<StopReason> {
        if self.stop_on_critical && iteration.has_unresolved_critical() {
            return Some(StopReason::CriticalUnresolved);
        }
        if iteration.bugs.is_empty() {
            return Some(StopReason::Converged);
        }
        if iteration.successful_fixes() == 0 {
            return Some(if iteration.fixes.is_empty() {
                StopReason::DiagnosticOnly
            } else {
                StopReason::FixesFailed
            });
        }
        if iteration.number >= self.max_iterations {
            return Some(StopReason::IterationLimit);
        }
        None
    }
}

fn stop_reason_for(err: DepsError) -> StopReason {
    if err.is_manifest_error() {
        error!("Manifest unavailable: {}", err);
        StopReason::ManifestUnavailable(err.to_string())
    } else {
        error!("Scan failed: {}", err);
        StopReason::ScanFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_model::{Finding, FindingType};

    fn orchestrator(max_iterations: u32, stop_on_critical: bool) -> Orchestrator {
        let mut config = MendConfig::default();
        config.orchestrator.max_iterations = max_iterations;
        config.orchestrator.stop_on_critical = stop_on_critical;
        Orchestrator::from_config(&config).unwrap()
    }

    fn iteration_with(number: u32, bugs: Vec<Bug>, fixes: Vec<FixAttempt>) -> Iteration {
        let mut iteration = Iteration::new(number);
        iteration.bugs = bugs;
        iteration.fixes = fixes;
        iteration
    }

    fn visual(severity: Severity) -> Bug {
        Bug::visual(Finding::new(severity, FindingType::ConsoleError, "boom", "check"))
    }

    fn attempt(success: bool) -> FixAttempt {
        FixAttempt {
            bug_id: 1,
            success,
            action: "add pkg".to_string(),
            error: (!success).then(|| "failed".to_string()),
        }
    }

    #[test]
    fn test_stop_condition_order() {
        let strict = orchestrator(3, true);
        let lenient = orchestrator(3, false);

        let critical = iteration_with(1, vec![visual(Severity::Critical)], vec![]);
        assert_eq!(strict.evaluate(&critical), Some(StopReason::CriticalUnresolved));
        assert_eq!(lenient.evaluate(&critical), Some(StopReason::DiagnosticOnly));

        let clean = iteration_with(1, vec![], vec![]);
        assert_eq!(strict.evaluate(&clean), Some(StopReason::Converged));

        let failed = iteration_with(1, vec![visual(Severity::Major)], vec![attempt(false)]);
        assert_eq!(strict.evaluate(&failed), Some(StopReason::FixesFailed));

        let progressing = iteration_with(1, vec![visual(Severity::Major)], vec![attempt(true)]);
        assert_eq!(strict.evaluate(&progressing), None);
        let last = iteration_with(3, vec![visual(Severity::Major)], vec![attempt(true)]);
        assert_eq!(strict.evaluate(&last), Some(StopReason::IterationLimit));
    }

    #[test]
    fn test_stop_reason_text() {
        assert_eq!(StopReason::CriticalUnresolved.to_string(), "critical bug unresolved");
        assert_eq!(
            StopReason::FixesFailed.to_string(),
            "no fixes available, manual intervention required"
        );
        assert!(StopReason::DiagnosticOnly.to_string().starts_with("no fixes available"));
        assert_eq!(StopReason::Converged.state(), OrchestratorState::Converged);
        assert_eq!(StopReason::Aborted.state(), OrchestratorState::Stopped);
    }

    #[test]
    fn test_success_rate() {
        let mut session = OrchestrationSession::new(Path::new("/tmp/app"));
        session.finish(StopReason::Converged);
        assert_eq!(session.summary.success_rate, 1.0);

        let mut session = OrchestrationSession::new(Path::new("/tmp/app"));
        let mut fixed = visual(Severity::Major);
        fixed.fixed = true;
        session.iterations.push(iteration_with(1, vec![fixed, visual(Severity::Minor)], vec![]));
        session.iterations.push(iteration_with(2, vec![], vec![]));
        session.finish(StopReason::Converged);
        assert_eq!(session.summary.total_bugs, 2);
        assert_eq!(session.summary.total_fixed, 1);
        assert_eq!(session.summary.success_rate, 0.5);
        assert!(session.report().contains("success rate 50.0% over 2 iteration(s)"));
    }

    #[tokio::test]
    async fn test_zero_budget_runs_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let session = orchestrator(0, true).run(temp.path()).await;
        assert!(session.iterations.is_empty());
        assert_eq!(session.stop_reason, Some(StopReason::IterationLimit));
    }
}
