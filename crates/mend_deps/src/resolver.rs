//! Dependency resolution engine.
//!
//! Runs the plugin-usage scanners, merges what they saw and cross-references
//! the result against the project manifest. Packages referenced but not
//! declared come back as missing and can be added to the development group.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use mend_model::{DetectedDependency, ScanNote};

use crate::error::{DepsError, DepsResult};
use crate::manifest::{Manifest, DEV_GROUP};
use crate::package::recommended_version;
use crate::scanners::{BuildConfigScanner, ScanOutput, Scanner, StyleScanner};

/// Counts for a dependency scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySummary {
    /// Distinct packages referenced across all scanners
    pub total_detected: usize,
    pub missing: usize,
    pub satisfied: usize,
    /// Files read by all scanners together
    pub files_scanned: usize,
    /// Files skipped because they could not be read or parsed
    pub skipped_files: usize,
}

/// Result of [`DependencyResolver::scan_project`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyScanResult {
    /// Referenced but not declared, sorted by name
    pub missing: Vec<DetectedDependency>,
    /// Referenced and declared, sorted by name
    pub satisfied: Vec<DetectedDependency>,
    pub notes: Vec<ScanNote>,
    pub summary: DependencySummary,
}

impl DependencyScanResult {
    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    /// Human-readable dependency report.
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("Dependency Scan\n");
        report.push_str(&format!(
            "Status: {}\n\n",
            if self.has_missing() { "❌ MISSING DEPENDENCIES" } else { "✅ ALL DECLARED" }
        ));

        if !self.missing.is_empty() {
            report.push_str("Missing:\n");
            for dep in &self.missing {
                report.push_str(&format!(
                    "  ❌ {}@{} (found by {})\n",
                    dep.name,
                    dep.recommended_version,
                    dep.detected_by.join(", ")
                ));
                for usage in &dep.usages {
                    report.push_str(&format!("     at {}\n", usage));
                }
            }
            report.push('\n');
        }

        if !self.satisfied.is_empty() {
            report.push_str("Declared:\n");
            for dep in &self.satisfied {
                report.push_str(&format!("  ✅ {}\n", dep.name));
            }
            report.push('\n');
        }

        if !self.notes.is_empty() {
            report.push_str("Notes:\n");
            for note in &self.notes {
                report.push_str(&format!("  ⚠️ {}\n", note));
            }
            report.push('\n');
        }

        report.push_str(&format!(
            "Summary: {} referenced, {} missing, {} declared ({} files scanned)",
            self.summary.total_detected,
            self.summary.missing,
            self.summary.satisfied,
            self.summary.files_scanned
        ));

        report
    }
}

/// Result of [`DependencyResolver::auto_add_missing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAddReport {
    /// Packages inserted into the development group, with the version used
    pub added: Vec<(String, String)>,
    /// Packages already declared, left alone
    pub skipped: Vec<String>,
    pub manifest_path: PathBuf,
    /// Whether the updated manifest reached the disk
    pub written: bool,
    /// Write failure, if the manifest could not be persisted
    pub write_error: Option<String>,
    #[serde(skip)]
    manifest: Option<Manifest>,
}

impl AutoAddReport {
    /// Additions are computed and nothing is left to persist.
    pub fn is_complete(&self) -> bool {
        self.write_error.is_none()
    }

    pub fn added_names(&self) -> Vec<&str> {
        self.added.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Try persisting the computed manifest again after a write failure.
    pub fn retry_write(&mut self) -> DepsResult<()> {
        let Some(manifest) = &self.manifest else {
            return Ok(());
        };
        manifest.save()?;
        self.written = true;
        self.write_error = None;
        Ok(())
    }

    pub fn report(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("Manifest: {}\n", self.manifest_path.display()));
        for (name, version) in &self.added {
            report.push_str(&format!("  ✅ added {}@{} to {}\n", name, version, DEV_GROUP));
        }
        for name in &self.skipped {
            report.push_str(&format!("  ⚠️ {} already declared\n", name));
        }
        if let Some(err) = &self.write_error {
            report.push_str(&format!("  ❌ write failed: {}\n", err));
        }
        report.push_str(&format!("Added {} package(s)", self.added.len()));
        report
    }
}

/// Detects undeclared third-party packages.
#[derive(Clone)]
pub struct DependencyResolver {
    scanners: Vec<Arc<dyn Scanner>>,
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyResolver {
    /// Resolver running the style scanner and the build-config scanner.
    pub fn new() -> Self {
        Self::with_scanners(vec![
            Arc::new(StyleScanner::new()),
            Arc::new(BuildConfigScanner::new()),
        ])
    }

    pub fn with_scanners(scanners: Vec<Arc<dyn Scanner>>) -> Self {
        Self { scanners }
    }

    /// Scan a project and sort every referenced package into missing or satisfied.
    ///
    /// Scanners run concurrently on the blocking pool. A manifest that cannot
    /// be read or parsed fails the whole scan.
    pub async fn scan_project(&self, project_path: &Path) -> DepsResult<DependencyScanResult> {
        info!("Scanning dependencies in {:?}", project_path);

        let handles: Vec<_> = self
            .scanners
            .iter()
            .map(|scanner| {
                let scanner = Arc::clone(scanner);
                let root = project_path.to_path_buf();
                tokio::task::spawn_blocking(move || scanner.scan(&root))
            })
            .collect();

        // Await in registration order so merging is deterministic.
        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            let output = handle
                .await
                .map_err(|e| DepsError::ScannerTask(e.to_string()))?;
            debug!(
                "{} saw {} package(s) in {} file(s)",
                output.scanner,
                output.packages.len(),
                output.files_scanned
            );
            outputs.push(output);
        }

        let (merged, files_scanned, notes) = merge_outputs(outputs);

        let manifest = Manifest::load(project_path).map_err(|e| {
            error!("Cannot use manifest: {}", e);
            e
        })?;

        let total_detected = merged.len();
        let (missing, satisfied) = cross_reference(merged, &manifest);

        for dep in &missing {
            warn!("Missing dependency: {} ({})", dep.name, dep.detected_by.join(", "));
        }
        info!(
            "Dependency scan complete: {} missing, {} declared",
            missing.len(),
            satisfied.len()
        );

        Ok(DependencyScanResult {
            summary: DependencySummary {
                total_detected,
                missing: missing.len(),
                satisfied: satisfied.len(),
                files_scanned,
                skipped_files: notes.len(),
            },
            missing,
            satisfied,
            notes,
        })
    }

    /// Add missing packages to the development group and persist the manifest.
    ///
    /// Reading the manifest is fatal; a failed write is recorded on the report
    /// and the computed additions are kept for [`AutoAddReport::retry_write`].
    pub fn auto_add_missing(
        &self,
        missing: &[DetectedDependency],
        project_path: &Path,
    ) -> DepsResult<AutoAddReport> {
        add_to_manifest(Manifest::load(project_path)?, missing)
    }
}

/// Insert missing packages into `manifest` and try persisting it.
fn add_to_manifest(
    mut manifest: Manifest,
    missing: &[DetectedDependency],
) -> DepsResult<AutoAddReport> {
    let mut added = Vec::new();
    let mut skipped = Vec::new();

    for dep in missing {
        if manifest.declares(&dep.name) {
            skipped.push(dep.name.clone());
            continue;
        }
        let version = if dep.recommended_version.is_empty() {
            recommended_version(&dep.name).to_string()
        } else {
            dep.recommended_version.clone()
        };
        if manifest.add_dev_dependency(&dep.name, &version)? {
            info!("Adding {}@{} to {}", dep.name, version, DEV_GROUP);
            added.push((dep.name.clone(), version));
        } else {
            skipped.push(dep.name.clone());
        }
    }

    let mut report = AutoAddReport {
        added,
        skipped,
        manifest_path: manifest.path().to_path_buf(),
        written: false,
        write_error: None,
        manifest: None,
    };

    if report.added.is_empty() {
        return Ok(report);
    }

    match manifest.save() {
        Ok(()) => report.written = true,
        Err(e) => {
            warn!("Manifest additions computed but not written: {}", e);
            report.write_error = Some(e.to_string());
        }
    }
    report.manifest = Some(manifest);

    Ok(report)
}

/// Merge scanner outputs by package name, in scanner order.
fn merge_outputs(
    outputs: Vec<ScanOutput>,
) -> (BTreeMap<String, DetectedDependency>, usize, Vec<ScanNote>) {
    let mut merged: BTreeMap<String, DetectedDependency> = BTreeMap::new();
    let mut files_scanned = 0;
    let mut notes = Vec::new();

    for output in outputs {
        files_scanned += output.files_scanned;
        notes.extend(output.notes);
        for (name, dep) in output.packages {
            match merged.get_mut(&name) {
                Some(existing) => existing.merge(dep),
                None => {
                    merged.insert(name, dep);
                }
            }
        }
    }

    (merged, files_scanned, notes)
}

/// Split detected packages into `(missing, satisfied)` against a manifest.
///
/// Output order follows the input order, which is by name for a `BTreeMap`.
pub fn cross_reference<I>(detected: I, manifest: &Manifest) -> (Vec<DetectedDependency>, Vec<DetectedDependency>)
where
    I: IntoIterator<Item = (String, DetectedDependency)>,
{
    let mut missing = Vec::new();
    let mut satisfied = Vec::new();

    for (name, mut dep) in detected {
        if manifest.declares(&name) {
            dep.installed = true;
            satisfied.push(dep);
        } else {
            dep.installed = false;
            dep.recommended_version = recommended_version(&name).to_string();
            missing.push(dep);
        }
    }

    (missing, satisfied)
}
