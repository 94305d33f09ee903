//! Visual/runtime-error detector.

use serde::Serialize;
use tracing::{debug, info, warn};

use mend_model::{AggregateSeverity, Finding, FindingType, ScanNote, Severity};

use crate::artifacts::CapturedArtifacts;
use crate::blank::{analyze_raster, BlankPageAnalysis, BlankPageConfig};
use crate::error::VisualResult;
use crate::rules::RuleSet;

/// Finding counts per severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisualSummary {
    pub total: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

impl VisualSummary {
    fn of(findings: &[Finding]) -> Self {
        let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
        Self {
            total: findings.len(),
            critical: count(Severity::Critical),
            major: count(Severity::Major),
            minor: count(Severity::Minor),
        }
    }
}

/// Result of [`VisualDetector::analyze_results`].
#[derive(Debug, Clone, Serialize)]
pub struct VisualAnalysis {
    /// Highest severity among the findings, `PASS` when there are none
    pub severity: AggregateSeverity,
    /// Set when at least one finding is CRITICAL
    pub should_stop: bool,
    pub errors: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_page: Option<BlankPageAnalysis>,
    /// Artifacts that could not be analyzed
    pub notes: Vec<ScanNote>,
    pub summary: VisualSummary,
}

impl VisualAnalysis {
    /// Human-readable visual report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("Visual Analysis\n");
        let status = match self.severity {
            AggregateSeverity::Pass => "✅ PASS".to_string(),
            AggregateSeverity::Critical => "❌ CRITICAL".to_string(),
            other => format!("⚠️ {}", other),
        };
        report.push_str(&format!("Status: {}\n", status));

        if let Some(blank) = &self.blank_page {
            report.push_str(&format!(
                "Screenshot: {}x{}, {:.1}% blank, {} content pixels\n",
                blank.width,
                blank.height,
                blank.blank_fraction * 100.0,
                blank.content_pixels
            ));
        }
        report.push('\n');

        if !self.errors.is_empty() {
            report.push_str("Findings:\n");
            for finding in &self.errors {
                report.push_str(&format!(
                    "  {} [{}] {}: {}\n",
                    finding.severity.icon(),
                    finding.severity,
                    finding.finding_type,
                    finding.message
                ));
                if let Some(location) = &finding.location {
                    report.push_str(&format!("     at {}\n", location));
                }
                report.push_str(&format!("     Fix: {}\n", finding.suggestion));
            }
            report.push('\n');
        }

        for note in &self.notes {
            report.push_str(&format!("  ⚠️ {}\n", note));
        }

        report.push_str(&format!(
            "Summary: {} finding(s) ({} critical, {} major, {} minor){}",
            self.summary.total,
            self.summary.critical,
            self.summary.major,
            self.summary.minor,
            if self.should_stop { ", stop requested" } else { "" }
        ));

        report
    }
}

/// Classifies captured page-load artifacts into findings.
#[derive(Debug, Clone)]
pub struct VisualDetector {
    rules: RuleSet,
    blank: BlankPageConfig,
}

impl VisualDetector {
    /// Detector with the built-in rules and default thresholds.
    pub fn new() -> VisualResult<Self> {
        Ok(Self::with_rules(RuleSet::standard()?))
    }

    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            rules,
            blank: BlankPageConfig::default(),
        }
    }

    pub fn with_blank_config(mut self, blank: BlankPageConfig) -> Self {
        self.blank = blank;
        self
    }

    pub fn blank_config(&self) -> &BlankPageConfig {
        &self.blank
    }

    /// Classify every captured artifact.
    ///
    /// A screenshot that cannot be decoded is recorded as a note and the
    /// blank-page check is skipped; everything else is still analyzed.
    pub fn analyze_results(&self, artifacts: &CapturedArtifacts) -> VisualAnalysis {
        let mut errors = Vec::new();
        let mut notes = Vec::new();

        if let Some(status) = artifacts.page_status {
            if !(200..300).contains(&status) {
                errors.push(Finding::new(
                    Severity::Critical,
                    FindingType::HttpError,
                    format!("Page load returned HTTP {}", status),
                    "Make sure the dev server serves the entry route with a 2xx status",
                ));
            }
        }

        let blank_page = match &artifacts.screenshot {
            Some(screenshot) => match screenshot.to_raster() {
                Ok(raster) => {
                    let analysis = analyze_raster(&raster, &self.blank);
                    debug!(
                        "Screenshot {:.4} blank, {} content pixels",
                        analysis.blank_fraction, analysis.content_pixels
                    );
                    if analysis.is_blank {
                        errors.push(Finding::new(
                            Severity::Critical,
                            FindingType::BlankPage,
                            format!(
                                "Blank page: {:.1}% of pixels blank, {} content pixels",
                                analysis.blank_fraction * 100.0,
                                analysis.content_pixels
                            ),
                            "The app rendered nothing; check the console and build output for the error that stopped it",
                        ));
                    }
                    Some(analysis)
                }
                Err(e) => {
                    warn!("Skipping blank-page check: {}", e);
                    notes.push(ScanNote::general(format!("screenshot not analyzed: {}", e)));
                    None
                }
            },
            None => None,
        };

        for exception in &artifacts.exceptions {
            let mut finding = Finding::new(
                Severity::Critical,
                FindingType::RuntimeException,
                exception.message.clone(),
                "Fix the uncaught exception; it aborts rendering",
            );
            if let Some(stack) = &exception.stack {
                finding = finding.with_stack(stack.clone());
            }
            errors.push(finding);
        }

        for entry in &artifacts.console {
            let classification = self.rules.classify(&entry.text);
            debug!(
                "Console entry classified {} by {}",
                classification.severity,
                classification.rule.as_deref().unwrap_or("default")
            );
            let mut finding = Finding::new(
                classification.severity,
                FindingType::ConsoleError,
                entry.text.clone(),
                classification.suggestion,
            );
            if let Some(location) = &entry.location {
                finding = finding.with_location(location.clone());
            }
            errors.push(finding);
        }

        for request in &artifacts.failed_requests {
            let (severity, suggestion) = if request.is_render_blocking() {
                (
                    Severity::Critical,
                    "A stylesheet or script failed to load; the page cannot render without it",
                )
            } else {
                (Severity::Major, "Check the asset path and that the file is served")
            };
            let status = request
                .status
                .map(|s| format!("HTTP {}", s))
                .unwrap_or_else(|| "no response".to_string());
            errors.push(
                Finding::new(
                    severity,
                    FindingType::AssetFailure,
                    format!("Failed to load {} ({})", request.url, status),
                    suggestion,
                )
                .with_location(request.url.clone()),
            );
        }

        let severity = AggregateSeverity::of(errors.iter().map(|f| f.severity));
        let should_stop = severity.is_critical();
        let summary = VisualSummary::of(&errors);

        info!(
            "Visual analysis: {} ({} finding(s))",
            severity, summary.total
        );

        VisualAnalysis {
            severity,
            should_stop,
            errors,
            blank_page,
            notes,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{FailedRequest, Screenshot};
    use crate::raster::Raster;

    fn detector() -> VisualDetector {
        VisualDetector::new().unwrap()
    }

    #[test]
    fn test_no_artifacts_pass() {
        let analysis = detector().analyze_results(&CapturedArtifacts::new().with_page_status(200));
        assert_eq!(analysis.severity, AggregateSeverity::Pass);
        assert!(!analysis.should_stop);
        assert!(analysis.errors.is_empty());
    }

    #[test]
    fn test_non_2xx_status_is_critical() {
        let analysis = detector().analyze_results(&CapturedArtifacts::new().with_page_status(304));
        assert_eq!(analysis.errors.len(), 1);
        assert_eq!(analysis.errors[0].finding_type, FindingType::HttpError);
        assert!(analysis.should_stop);
    }

    #[test]
    fn test_asset_failures() {
        let artifacts = CapturedArtifacts::new()
            .with_failed_request(FailedRequest::new("/assets/index.css", Some(404)))
            .with_failed_request(FailedRequest::new("/logo.png", Some(404)).with_resource_type("image"));

        let analysis = detector().analyze_results(&artifacts);

        assert_eq!(analysis.errors[0].severity, Severity::Critical);
        assert_eq!(analysis.errors[1].severity, Severity::Major);
        assert_eq!(analysis.summary.critical, 1);
        assert_eq!(analysis.summary.major, 1);
    }

    #[test]
    fn test_exceptions_always_critical() {
        let artifacts = CapturedArtifacts::new().with_exception("something odd", Some("at App (App.tsx:3:7)"));
        let analysis = detector().analyze_results(&artifacts);
        assert_eq!(analysis.severity, AggregateSeverity::Critical);
        assert_eq!(analysis.errors[0].stack.as_deref(), Some("at App (App.tsx:3:7)"));
    }

    #[test]
    fn test_undecodable_screenshot_is_note() {
        let artifacts = CapturedArtifacts::new()
            .with_screenshot(Screenshot::Png(b"garbage".to_vec()))
            .with_console("Download the React DevTools", None);
        let analysis = detector().analyze_results(&artifacts);

        assert_eq!(analysis.notes.len(), 1);
        assert!(analysis.blank_page.is_none());
        assert_eq!(analysis.severity, AggregateSeverity::Minor);
    }

    #[test]
    fn test_rendered_page_is_not_blank() {
        let raster = Raster::filled(100, 100, [30, 60, 90, 255]);
        let artifacts = CapturedArtifacts::new().with_screenshot(Screenshot::Raster(raster));
        let analysis = detector().analyze_results(&artifacts);

        assert!(!analysis.blank_page.unwrap().is_blank);
        assert_eq!(analysis.severity, AggregateSeverity::Pass);
    }

    #[test]
    fn test_adding_critical_never_lowers_severity() {
        let base = CapturedArtifacts::new()
            .with_console("Failed to load resource: 404", None)
            .with_console("hello", None);
        let before = detector().analyze_results(&base).severity;
        let after = detector()
            .analyze_results(&base.with_exception("boom", None))
            .severity;
        assert!(after >= before);
        assert_eq!(after, AggregateSeverity::Critical);
    }
}
