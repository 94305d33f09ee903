//! The unified bug record every detector output is normalized into.

use std::fmt;

use serde::{Deserialize, Serialize};

use mend_model::{DetectedDependency, Finding, ModuleSystemIssue, Severity};

/// Detector identifiers recorded on each bug.
pub const DEPENDENCY_RESOLVER: &str = "dependency-resolver";
pub const CONFIG_VALIDATOR: &str = "config-validator";
pub const VISUAL_DETECTOR: &str = "visual-detector";

/// What was detected, with the detector's own record attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BugKind {
    MissingDependency { dependency: DetectedDependency },
    ModuleSystemMismatch { issue: ModuleSystemIssue },
    Visual { finding: Finding },
}

impl BugKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDependency { .. } => "missing-dependency",
            Self::ModuleSystemMismatch { .. } => "module-system-mismatch",
            Self::Visual { finding } => finding.finding_type.as_str(),
        }
    }

    /// Whether a registered automatic remediation exists for this kind.
    pub fn is_fixable(&self) -> bool {
        match self {
            Self::MissingDependency { .. } | Self::ModuleSystemMismatch { .. } => true,
            Self::Visual { .. } => false,
        }
    }
}

/// A severity-tagged problem found during one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    /// Position within its iteration, in detection order
    pub id: usize,
    pub severity: Severity,
    /// Detector that reported it
    pub source: String,
    pub message: String,
    #[serde(flatten)]
    pub kind: BugKind,
    pub fixable: bool,
    /// Set only by a successful fix attempt in the same iteration
    pub fixed: bool,
}

impl Bug {
    fn new(severity: Severity, source: &str, message: String, kind: BugKind) -> Self {
        Self {
            id: 0,
            severity,
            source: source.to_string(),
            message,
            fixable: kind.is_fixable(),
            kind,
            fixed: false,
        }
    }

    /// A referenced package the manifest does not declare. The build cannot
    /// resolve it, so it is CRITICAL.
    pub fn missing_dependency(dependency: DetectedDependency, source: &str) -> Self {
        let locations: Vec<String> = dependency.usages.iter().map(|u| u.to_string()).collect();
        let message = if locations.is_empty() {
            format!("{} is used but not declared", dependency.name)
        } else {
            format!(
                "{} is used but not declared ({})",
                dependency.name,
                locations.join(", ")
            )
        };
        Self::new(
            Severity::Critical,
            source,
            message,
            BugKind::MissingDependency { dependency },
        )
    }

    pub fn module_system_mismatch(issue: ModuleSystemIssue) -> Self {
        let message = format!(
            "{} uses {} syntax but is loaded as {}",
            issue.file.display(),
            issue.observed_system,
            issue.expected_system
        );
        Self::new(
            issue.severity,
            CONFIG_VALIDATOR,
            message,
            BugKind::ModuleSystemMismatch { issue },
        )
    }

    pub fn visual(finding: Finding) -> Self {
        Self::new(
            finding.severity,
            VISUAL_DETECTOR,
            finding.message.clone(),
            BugKind::Visual { finding },
        )
    }

    pub fn bug_type(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn is_unresolved_critical(&self) -> bool {
        self.severity == Severity::Critical && !self.fixed
    }
}

impl fmt::Display for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {}: {}",
            self.id,
            self.severity,
            self.bug_type(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mend_model::{
        ConversionDirection, FindingType, ModuleSystem, UsageLocation,
    };

    #[test]
    fn test_missing_dependency_is_critical_and_fixable() {
        let dep = DetectedDependency::new("pkg-alpha-plugin", "config-scanner")
            .with_usage(UsageLocation::new("vite.config.js", 2));
        let bug = Bug::missing_dependency(dep, DEPENDENCY_RESOLVER);

        assert_eq!(bug.severity, Severity::Critical);
        assert!(bug.fixable);
        assert!(!bug.fixed);
        assert_eq!(bug.bug_type(), "missing-dependency");
        assert!(bug.message.contains("vite.config.js:2"));
    }

    #[test]
    fn test_visual_bugs_are_diagnostic_only() {
        let finding = Finding::new(Severity::Critical, FindingType::BlankPage, "blank", "look");
        let bug = Bug::visual(finding);
        assert!(!bug.fixable);
        assert_eq!(bug.bug_type(), "blank-page");
        assert_eq!(bug.source, VISUAL_DETECTOR);
    }

    #[test]
    fn test_serialized_with_type_discriminator() {
        let issue = ModuleSystemIssue {
            file: "postcss.config.js".into(),
            severity: Severity::Major,
            project_system: ModuleSystem::Module,
            expected_system: ModuleSystem::Module,
            observed_system: ModuleSystem::CommonJs,
            direction: ConversionDirection::ToModule,
            suggestion: "convert".to_string(),
        };
        let json = serde_json::to_value(Bug::module_system_mismatch(issue)).unwrap();
        assert_eq!(json["type"], "module-system-mismatch");
        assert_eq!(json["severity"], "MAJOR");
        assert_eq!(json["issue"]["direction"], "to_module");
    }
}
