//! Scanner over stylesheets and utility-CSS entry points.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use mend_model::{DetectedDependency, ScanNote, UsageLocation};

use crate::lexer::{line_of, mask_comments};
use crate::package::normalize_specifier;
use crate::scanners::{relative, walk_project, ScanOutput, Scanner};

/// Identifier of the style scanner.
pub const STYLE_SCANNER: &str = "style-scanner";

const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass", "less", "pcss", "postcss"];

/// `@plugin "name";`
static PLUGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@plugin\s+['"]([^'"\n]+)['"]"#).expect("plugin pattern is valid")
});

/// `@import "pkg";`, `@use 'pkg';`, `@forward "pkg";`, `@import url("pkg");`
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@(?:import|use|forward)\s+(?:url\(\s*)?['"]([^'"\n]+)['"]"#)
        .expect("style import pattern is valid")
});

/// `@tailwind base;`
static TAILWIND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@tailwind\s+[\w-]+").expect("tailwind pattern is valid"));

/// Reports packages pulled in from stylesheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyleScanner;

impl StyleScanner {
    pub fn new() -> Self {
        Self
    }

    /// Package references in one stylesheet: `(package, line)`.
    ///
    /// `dir` is the stylesheet's directory; imports of files that exist
    /// there are local and not reported.
    pub fn references(content: &str, dir: &Path) -> Vec<(String, usize)> {
        let masked = mask_comments(content);
        let mut refs: Vec<(usize, String)> = Vec::new();

        for caps in PLUGIN_RE.captures_iter(&masked) {
            if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) {
                if let Some(name) = normalize_specifier(spec.as_str()) {
                    refs.push((whole.start(), name));
                }
            }
        }

        for caps in IMPORT_RE.captures_iter(&masked) {
            if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) {
                if is_local_stylesheet(spec.as_str(), dir) {
                    continue;
                }
                if let Some(name) = normalize_specifier(spec.as_str()) {
                    refs.push((whole.start(), name));
                }
            }
        }

        for m in TAILWIND_RE.find_iter(&masked) {
            refs.push((m.start(), "tailwindcss".to_string()));
        }

        refs.sort();
        refs.into_iter()
            .map(|(offset, name)| (name, line_of(&masked, offset)))
            .collect()
    }
}

/// Whether `spec` names a file next to the importing stylesheet.
///
/// Covers `@import "theme.css"` and Sass partials (`@use "vars"` for
/// `_vars.scss`). A bare name with no such file is a package, e.g.
/// `normalize.css`.
fn is_local_stylesheet(spec: &str, dir: &Path) -> bool {
    let path = Path::new(spec);
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let parent = dir.join(path.parent().unwrap_or_else(|| Path::new("")));

    let mut candidates = vec![file_name.to_string(), format!("_{}", file_name)];
    if path.extension().is_none() {
        for ext in STYLE_EXTENSIONS {
            candidates.push(format!("{}.{}", file_name, ext));
            candidates.push(format!("_{}.{}", file_name, ext));
        }
    }
    candidates.iter().any(|c| parent.join(c).is_file())
}

impl Scanner for StyleScanner {
    fn id(&self) -> &'static str {
        STYLE_SCANNER
    }

    fn scan(&self, project_path: &Path) -> ScanOutput {
        let mut output = ScanOutput::new(self.id());

        let files = walk_project(project_path, |p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| STYLE_EXTENSIONS.contains(&e))
        });

        for file in files {
            let rel = relative(project_path, &file);
            let content = match std::fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Skipping unreadable stylesheet {:?}: {}", rel, e);
                    output.notes.push(ScanNote::for_file(&rel, format!("unreadable: {}", e)));
                    continue;
                }
            };
            output.files_scanned += 1;

            let dir = file.parent().unwrap_or(project_path);
            for (name, line) in Self::references(&content, dir) {
                debug!("{} references {} at line {}", rel.display(), name, line);
                output.record(
                    DetectedDependency::new(name, STYLE_SCANNER)
                        .with_usage(UsageLocation::new(&rel, line)),
                );
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_references_in_tailwind_v4_entry() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("theme.css"), ":root {}\n").unwrap();
        let css = r#"@import "tailwindcss";
@plugin "@tailwindcss/typography";
@plugin 'daisyui';
@import "./components.css";
@import "theme.css";
/* @plugin "ghost-plugin"; */
"#;
        let refs = StyleScanner::references(css, temp.path());
        assert_eq!(
            refs,
            vec![
                ("tailwindcss".to_string(), 1),
                ("@tailwindcss/typography".to_string(), 2),
                ("daisyui".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_tailwind_directives_imply_tailwindcss() {
        let css = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";
        let refs = StyleScanner::references(css, Path::new("."));
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|(name, _)| name == "tailwindcss"));
    }

    #[test]
    fn test_bare_import_is_local_only_when_file_exists() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("theme.css"), ":root {}\n").unwrap();
        std::fs::write(temp.path().join("_variables.scss"), "$brand: red;\n").unwrap();

        let css = "@import \"normalize.css\";\n@import \"theme.css\";\n@use \"variables\";\n";
        let refs = StyleScanner::references(css, temp.path());

        assert_eq!(refs, vec![("normalize.css".to_string(), 1)]);
    }

    #[test]
    fn test_scan_resolves_imports_against_the_stylesheet_dir() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src/styles")).unwrap();
        std::fs::write(temp.path().join("src/styles/reset.css"), "* { margin: 0 }\n").unwrap();
        std::fs::write(
            temp.path().join("src/styles/main.css"),
            "@import \"normalize.css\";\n@import \"reset.css\";\n",
        )
        .unwrap();

        let output = StyleScanner::new().scan(temp.path());

        assert!(output.packages.contains_key("normalize.css"));
        assert!(!output.packages.contains_key("reset.css"));
    }

    #[test]
    fn test_scan_merges_usages_per_package() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/a.css"), "@tailwind base;\n").unwrap();
        std::fs::write(temp.path().join("src/b.scss"), "@use \"tailwindcss/base\";\n").unwrap();

        let output = StyleScanner::new().scan(temp.path());

        assert_eq!(output.files_scanned, 2);
        let tw = output.packages.get("tailwindcss").unwrap();
        assert_eq!(tw.usages.len(), 2);
        assert_eq!(tw.detected_by, vec![STYLE_SCANNER]);
    }
}
