//! Config & module-system validator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use mend_model::{DetectedDependency, ModuleSystem, ModuleSystemIssue, ScanNote, UsageLocation};

use crate::config::module_system::check_file;
use crate::error::DepsResult;
use crate::manifest::Manifest;
use crate::resolver::cross_reference;
use crate::scanners::{BuildConfigScanner, CONFIG_SCANNER};

/// What is known about one plugin referenced from config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMeta {
    pub usages: Vec<UsageLocation>,
    /// Config files referencing it, first-seen order
    pub config_files: Vec<PathBuf>,
    pub installed: bool,
    pub recommended_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub config_files: usize,
    pub plugins: usize,
    pub missing_plugins: usize,
    pub module_system_issues: usize,
    pub skipped_files: usize,
}

/// Result of [`ConfigValidator::detect_config_plugins`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigScanResult {
    pub plugins: BTreeMap<String, PluginMeta>,
    /// Plugins the manifest does not declare, sorted by name
    pub missing: Vec<DetectedDependency>,
    pub module_system_issues: Vec<ModuleSystemIssue>,
    /// Config files found at the project root
    pub config_files: Vec<PathBuf>,
    pub project_system: ModuleSystem,
    pub notes: Vec<ScanNote>,
    pub summary: ConfigSummary,
}

impl ConfigScanResult {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.module_system_issues.is_empty()
    }

    /// Human-readable config report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("Config Validation\n");
        report.push_str(&format!("Project module system: {}\n", self.project_system));
        report.push_str(&format!(
            "Status: {}\n\n",
            if self.is_clean() { "✅ PASSED" } else { "❌ ISSUES FOUND" }
        ));

        if !self.config_files.is_empty() {
            report.push_str("Config files:\n");
            for file in &self.config_files {
                report.push_str(&format!("  {}\n", file.display()));
            }
            report.push('\n');
        }

        if !self.plugins.is_empty() {
            report.push_str("Plugins:\n");
            for (name, meta) in &self.plugins {
                let status = if meta.installed { "✅" } else { "❌" };
                let files: Vec<String> =
                    meta.config_files.iter().map(|f| f.display().to_string()).collect();
                report.push_str(&format!("  {} {} ({})\n", status, name, files.join(", ")));
            }
            report.push('\n');
        }

        if !self.module_system_issues.is_empty() {
            report.push_str("Module system:\n");
            for issue in &self.module_system_issues {
                report.push_str(&format!(
                    "  {} {}: uses {}, loaded as {}\n",
                    issue.severity.icon(),
                    issue.file.display(),
                    issue.observed_system,
                    issue.expected_system
                ));
                report.push_str(&format!("     Fix: {}\n", issue.suggestion));
            }
            report.push('\n');
        }

        for note in &self.notes {
            report.push_str(&format!("  ⚠️ {}\n", note));
        }

        report.push_str(&format!(
            "Summary: {} config file(s), {} plugin(s), {} missing, {} module-system issue(s)",
            self.summary.config_files,
            self.summary.plugins,
            self.summary.missing_plugins,
            self.summary.module_system_issues
        ));

        report
    }
}

/// Validates build-tool config files against the manifest.
#[derive(Clone, Default)]
pub struct ConfigValidator {
    scanner: BuildConfigScanner,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scanner(scanner: BuildConfigScanner) -> Self {
        Self { scanner }
    }

    /// Inspect every well-known config file at the project root.
    ///
    /// Fails only when the manifest cannot be read or parsed.
    pub fn detect_config_plugins(&self, project_path: &Path) -> DepsResult<ConfigScanResult> {
        info!("Validating config files in {:?}", project_path);

        let manifest = Manifest::load(project_path).map_err(|e| {
            error!("Cannot use manifest: {}", e);
            e
        })?;
        let project_system = manifest.module_system();
        let config_files = BuildConfigScanner::present_config_files(project_path);

        let mut detected: BTreeMap<String, DetectedDependency> = BTreeMap::new();
        let mut issues = Vec::new();
        let mut notes = Vec::new();

        for rel in &config_files {
            let scan = match self.scanner.scan_file(project_path, rel) {
                Ok(scan) => scan,
                Err(note) => {
                    warn!("Skipping config file: {}", note);
                    notes.push(note);
                    continue;
                }
            };

            if let Some(issue) = check_file(rel, &scan.source, project_system) {
                warn!(
                    "{} uses {} but is loaded as {}",
                    rel.display(),
                    issue.observed_system,
                    issue.expected_system
                );
                issues.push(issue);
            }

            for (name, line) in scan.plugins {
                debug!("{} references plugin {}", rel.display(), name);
                let dep = DetectedDependency::new(name.clone(), CONFIG_SCANNER)
                    .with_usage(UsageLocation::new(rel, line));
                match detected.get_mut(&name) {
                    Some(existing) => existing.merge(dep),
                    None => {
                        detected.insert(name, dep);
                    }
                }
            }
        }

        let (missing, satisfied) = cross_reference(detected, &manifest);

        let plugins: BTreeMap<String, PluginMeta> = missing
            .iter()
            .chain(satisfied.iter())
            .map(|dep| {
                (
                    dep.name.clone(),
                    PluginMeta {
                        usages: dep.usages.clone(),
                        config_files: dep.files().into_iter().cloned().collect(),
                        installed: dep.installed,
                        recommended_version: dep.recommended_version.clone(),
                    },
                )
            })
            .collect();

        info!(
            "Config validation complete: {} plugin(s), {} missing, {} module-system issue(s)",
            plugins.len(),
            missing.len(),
            issues.len()
        );

        Ok(ConfigScanResult {
            summary: ConfigSummary {
                config_files: config_files.len(),
                plugins: plugins.len(),
                missing_plugins: missing.len(),
                module_system_issues: issues.len(),
                skipped_files: notes.len(),
            },
            plugins,
            missing,
            module_system_issues: issues,
            config_files,
            project_system,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plugins_merged_across_config_files() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"type":"module","devDependencies":{"@vitejs/plugin-react":"^4.0.0"}}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join("vite.config.js"),
            "import react from '@vitejs/plugin-react';\nimport tailwindcss from '@tailwindcss/vite';\nexport default { plugins: [react(), tailwindcss()] };\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("vitest.config.js"),
            "import react from '@vitejs/plugin-react';\nexport default { plugins: [react()] };\n",
        )
        .unwrap();

        let result = ConfigValidator::new().detect_config_plugins(temp.path()).unwrap();

        assert_eq!(result.config_files.len(), 2);
        let react = &result.plugins["@vitejs/plugin-react"];
        assert!(react.installed);
        assert_eq!(react.config_files.len(), 2);
        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.missing[0].name, "@tailwindcss/vite");
        assert!(result.module_system_issues.is_empty());
    }

    #[test]
    fn test_unparseable_config_becomes_note() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        std::fs::write(temp.path().join("vite.config.js"), "import \0 from").unwrap();

        let result = ConfigValidator::new().detect_config_plugins(temp.path()).unwrap();

        assert_eq!(result.notes.len(), 1);
        assert_eq!(result.summary.skipped_files, 1);
        assert!(result.plugins.is_empty());
    }

    #[test]
    fn test_missing_manifest_is_fatal() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("vite.config.js"), "export default {}").unwrap();

        let err = ConfigValidator::new().detect_config_plugins(temp.path()).unwrap_err();
        assert!(err.is_manifest_error());
    }
}
