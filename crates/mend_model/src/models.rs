//! Detection records produced by the scanners and detectors.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Marker used when no pinned version is known for a package.
pub const LATEST_VERSION: &str = "latest";

/// Where a package reference was seen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsageLocation {
    /// File path relative to the project root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
}

impl UsageLocation {
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for UsageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// A third-party package referenced by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedDependency {
    /// Normalized package name (`@scope/name` or `name`)
    pub name: String,
    /// Every place the package is referenced
    pub usages: Vec<UsageLocation>,
    /// Identifiers of the scanners that reported it, in scan order
    pub detected_by: Vec<String>,
    /// Whether the manifest declares it
    pub installed: bool,
    /// Version to add when the package is missing
    pub recommended_version: String,
}

impl DetectedDependency {
    pub fn new(name: impl Into<String>, detector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usages: Vec::new(),
            detected_by: vec![detector.into()],
            installed: false,
            recommended_version: LATEST_VERSION.to_string(),
        }
    }

    pub fn with_usage(mut self, usage: UsageLocation) -> Self {
        self.usages.push(usage);
        self
    }

    /// Fold another sighting of the same package into this one.
    pub fn merge(&mut self, other: DetectedDependency) {
        self.usages.extend(other.usages);
        for detector in other.detected_by {
            if !self.detected_by.contains(&detector) {
                self.detected_by.push(detector);
            }
        }
    }

    /// Files referencing the package, deduplicated in first-seen order.
    pub fn files(&self) -> Vec<&PathBuf> {
        let mut files: Vec<&PathBuf> = Vec::new();
        for usage in &self.usages {
            if !files.contains(&&usage.file) {
                files.push(&usage.file);
            }
        }
        files
    }
}

/// One of the two static import styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSystem {
    /// `import` / `export`
    Module,
    /// `require()` / `module.exports`
    CommonJs,
}

impl ModuleSystem {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Module => Self::CommonJs,
            Self::CommonJs => Self::Module,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::CommonJs => "commonjs",
        }
    }
}

impl fmt::Display for ModuleSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a mismatching file should be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionDirection {
    ToModule,
    ToCommonJs,
}

impl ConversionDirection {
    /// Direction that makes a file conform to `expected`.
    pub fn towards(expected: ModuleSystem) -> Self {
        match expected {
            ModuleSystem::Module => Self::ToModule,
            ModuleSystem::CommonJs => Self::ToCommonJs,
        }
    }

    pub fn target(&self) -> ModuleSystem {
        match self {
            Self::ToModule => ModuleSystem::Module,
            Self::ToCommonJs => ModuleSystem::CommonJs,
        }
    }
}

/// A config file written in the opposite module system from the one it is loaded as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSystemIssue {
    /// File path relative to the project root
    pub file: PathBuf,
    pub severity: Severity,
    /// Module system declared by the manifest
    pub project_system: ModuleSystem,
    /// Module system the file is loaded as (extension override or project default)
    pub expected_system: ModuleSystem,
    /// Module system the file's syntax actually uses
    pub observed_system: ModuleSystem,
    pub direction: ConversionDirection,
    pub suggestion: String,
}

/// Category of a visual/runtime finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingType {
    BlankPage,
    ConsoleError,
    RuntimeException,
    AssetFailure,
    HttpError,
}

impl FindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlankPage => "blank-page",
            Self::ConsoleError => "console-error",
            Self::RuntimeException => "runtime-exception",
            Self::AssetFailure => "asset-failure",
            Self::HttpError => "http-error",
        }
    }
}

impl fmt::Display for FindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified observation from a page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub finding_type: FindingType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub suggestion: String,
}

impl Finding {
    pub fn new(
        severity: Severity,
        finding_type: FindingType,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            finding_type,
            message: message.into(),
            location: None,
            stack: None,
            suggestion: suggestion.into(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Informational note about an input that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub severity: Severity,
    pub message: String,
}

impl ScanNote {
    pub fn for_file(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            severity: Severity::Minor,
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            file: None,
            severity: Severity::Minor,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: {}", file.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_concatenates_usages_and_detectors() {
        let mut a = DetectedDependency::new("tailwindcss", "style-scanner")
            .with_usage(UsageLocation::new("src/index.css", 1));
        let b = DetectedDependency::new("tailwindcss", "config-scanner")
            .with_usage(UsageLocation::new("postcss.config.js", 3));

        a.merge(b);

        assert_eq!(a.usages.len(), 2);
        assert_eq!(a.detected_by, vec!["style-scanner", "config-scanner"]);
    }

    #[test]
    fn test_merge_same_detector_not_duplicated() {
        let mut a = DetectedDependency::new("daisyui", "style-scanner")
            .with_usage(UsageLocation::new("a.css", 1));
        let b = DetectedDependency::new("daisyui", "style-scanner")
            .with_usage(UsageLocation::new("b.css", 2));

        a.merge(b);

        assert_eq!(a.detected_by, vec!["style-scanner"]);
        assert_eq!(a.files().len(), 2);
    }

    #[test]
    fn test_conversion_direction() {
        assert_eq!(
            ConversionDirection::towards(ModuleSystem::Module),
            ConversionDirection::ToModule
        );
        assert_eq!(ConversionDirection::ToCommonJs.target(), ModuleSystem::CommonJs);
        assert_eq!(ModuleSystem::Module.opposite(), ModuleSystem::CommonJs);
    }

    #[test]
    fn test_finding_type_serializes_kebab_case() {
        let json = serde_json::to_string(&FindingType::BlankPage).unwrap();
        assert_eq!(json, "\"blank-page\"");
    }
}
