//! Read-only plugin-usage scanners.
//!
//! Each scanner walks the project and reports the packages it sees
//! referenced, keyed by package name. Scanners never touch the manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use mend_model::{DetectedDependency, ScanNote};

pub mod build_config;
pub mod style;

pub use build_config::{BuildConfigScanner, ConfigFileScan, CONFIG_FILE_NAMES, CONFIG_SCANNER};
pub use style::{StyleScanner, STYLE_SCANNER};

/// Directories that never contain project sources.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".turbo",
    "coverage",
    ".mend",
];

/// Output of one scanner run.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// Scanner identifier
    pub scanner: String,
    /// Referenced packages, keyed by name
    pub packages: BTreeMap<String, DetectedDependency>,
    /// Number of files read
    pub files_scanned: usize,
    /// Files that could not be read or parsed
    pub notes: Vec<ScanNote>,
}

impl ScanOutput {
    pub fn new(scanner: impl Into<String>) -> Self {
        Self {
            scanner: scanner.into(),
            ..Default::default()
        }
    }

    /// Record a sighting, folding it into an existing entry of the same name.
    pub fn record(&mut self, dependency: DetectedDependency) {
        match self.packages.get_mut(&dependency.name) {
            Some(existing) => existing.merge(dependency),
            None => {
                self.packages.insert(dependency.name.clone(), dependency);
            }
        }
    }
}

/// A read-only scanner over project files.
pub trait Scanner: Send + Sync {
    /// Identifier recorded on every dependency the scanner reports.
    fn id(&self) -> &'static str;

    /// Scan a project root. Per-file failures become notes.
    fn scan(&self, project_path: &Path) -> ScanOutput;
}

/// Files under `root` accepted by `keep`, in a stable (name-sorted) order.
pub(crate) fn walk_project<F>(root: &Path, keep: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !IGNORED_DIRS.contains(&e.file_name().to_string_lossy().as_ref())
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| keep(p))
        .collect()
}

/// Path relative to the project root, for reporting.
pub(crate) fn relative(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_walk_skips_ignored_dirs_and_sorts() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("node_modules/pkg/a.css"), "").unwrap();
        std::fs::write(temp.path().join("src/b.css"), "").unwrap();
        std::fs::write(temp.path().join("src/a.css"), "").unwrap();

        let files = walk_project(temp.path(), |p| {
            p.extension().map_or(false, |e| e == "css")
        });
        let rel: Vec<PathBuf> = files.iter().map(|f| relative(temp.path(), f)).collect();

        assert_eq!(rel, vec![PathBuf::from("src/a.css"), PathBuf::from("src/b.css")]);
    }
}
