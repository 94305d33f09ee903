//! Scanner over build-tool config files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use mend_model::{DetectedDependency, ScanNote, UsageLocation};

use crate::lexer::{line_of, mask_comments};
use crate::package::{is_plugin_name, normalize_specifier};
use crate::parser::{Dialect, FallbackParser, ImportParser};
use crate::scanners::{ScanOutput, Scanner};

/// Identifier of the build-config scanner.
pub const CONFIG_SCANNER: &str = "config-scanner";

/// Well-known config files, looked up at the project root.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "vite.config.js",
    "vite.config.mjs",
    "vite.config.cjs",
    "vite.config.ts",
    "vite.config.mts",
    "vite.config.cts",
    "vitest.config.js",
    "vitest.config.mjs",
    "vitest.config.ts",
    "tailwind.config.js",
    "tailwind.config.cjs",
    "tailwind.config.mjs",
    "tailwind.config.ts",
    "postcss.config.js",
    "postcss.config.cjs",
    "postcss.config.mjs",
    "postcss.config.ts",
    "webpack.config.js",
    "webpack.config.cjs",
    "webpack.config.mjs",
    "rollup.config.js",
    "rollup.config.mjs",
    "rollup.config.cjs",
    "babel.config.js",
    "babel.config.cjs",
    "babel.config.mjs",
    "next.config.js",
    "next.config.mjs",
    "svelte.config.js",
    "astro.config.mjs",
    "nuxt.config.js",
    "nuxt.config.ts",
    "eslint.config.js",
    "eslint.config.mjs",
    "eslint.config.cjs",
    ".eslintrc.js",
    ".eslintrc.cjs",
    "prettier.config.js",
    "prettier.config.cjs",
    "prettier.config.mjs",
];

/// `plugins: { ... }` in a PostCSS config.
static POSTCSS_PLUGINS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bplugins\s*:\s*\{").expect("postcss plugins pattern is valid")
});

/// An object key: `tailwindcss: {}` or `'postcss-import': {}`.
static OBJECT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[{,])\s*['"]?(@?[A-Za-z0-9_./-]+)['"]?\s*:"#)
        .expect("object key pattern is valid")
});

/// Plugins found in one config file.
#[derive(Debug, Clone)]
pub struct ConfigFileScan {
    /// File path relative to the project root
    pub path: PathBuf,
    /// Full file text
    pub source: String,
    /// Accepted plugin references: `(package, line)`
    pub plugins: Vec<(String, usize)>,
}

/// Reports plugin packages referenced from build-tool config files.
#[derive(Clone)]
pub struct BuildConfigScanner {
    parser: Arc<dyn ImportParser>,
}

impl Default for BuildConfigScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildConfigScanner {
    /// Scanner using the structural parser with regex fallback.
    pub fn new() -> Self {
        Self::with_parser(Arc::new(FallbackParser::default()))
    }

    pub fn with_parser(parser: Arc<dyn ImportParser>) -> Self {
        Self { parser }
    }

    /// Config files present in the project, in list order.
    pub fn present_config_files(project_path: &Path) -> Vec<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(PathBuf::from)
            .filter(|name| project_path.join(name).is_file())
            .collect()
    }

    /// Read one config file and extract its plugin references.
    ///
    /// Unreadable or unparseable files come back as a note.
    pub fn scan_file(&self, project_path: &Path, rel: &Path) -> Result<ConfigFileScan, ScanNote> {
        let source = std::fs::read_to_string(project_path.join(rel))
            .map_err(|e| ScanNote::for_file(rel, format!("unreadable: {}", e)))?;

        let imports = self
            .parser
            .extract(&source, Dialect::for_path(rel))
            .map_err(|e| ScanNote::for_file(rel, format!("unparseable: {}", e)))?;

        let mut plugins: Vec<(String, usize)> = imports
            .into_iter()
            .filter_map(|r| normalize_specifier(&r.specifier).map(|name| (name, r.line)))
            .filter(|(name, _)| is_plugin_name(name))
            .collect();

        if is_postcss_config(rel) {
            plugins.extend(postcss_object_plugins(&source));
        }

        plugins.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        plugins.dedup();

        Ok(ConfigFileScan {
            path: rel.to_path_buf(),
            source,
            plugins,
        })
    }
}

impl Scanner for BuildConfigScanner {
    fn id(&self) -> &'static str {
        CONFIG_SCANNER
    }

    fn scan(&self, project_path: &Path) -> ScanOutput {
        let mut output = ScanOutput::new(self.id());

        for rel in Self::present_config_files(project_path) {
            match self.scan_file(project_path, &rel) {
                Ok(scan) => {
                    output.files_scanned += 1;
                    for (name, line) in scan.plugins {
                        debug!("{} references plugin {} at line {}", rel.display(), name, line);
                        output.record(
                            DetectedDependency::new(name, CONFIG_SCANNER)
                                .with_usage(UsageLocation::new(&rel, line)),
                        );
                    }
                }
                Err(note) => {
                    warn!("Skipping config file: {}", note);
                    output.notes.push(note);
                }
            }
        }

        output
    }
}

fn is_postcss_config(rel: &Path) -> bool {
    rel.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with("postcss.config."))
}

/// Keys of the object-form `plugins: { name: {...} }` block.
fn postcss_object_plugins(source: &str) -> Vec<(String, usize)> {
    let masked = mask_comments(source);
    let Some(open) = POSTCSS_PLUGINS_RE.find(&masked) else {
        return Vec::new();
    };

    // Block body between the opening brace and its match.
    let body_start = open.end();
    let mut depth = 1usize;
    let mut body_end = masked.len();
    for (i, c) in masked[body_start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    body_end = body_start + i;
                    break;
                }
            }
            _ => {}
        }
    }
    let body = &masked[body_start..body_end];

    // Only keys at the top level of the block name plugins.
    let mut keys = Vec::new();
    for caps in OBJECT_KEY_RE.captures_iter(body) {
        let Some(key) = caps.get(1) else {
            continue;
        };
        let before = &body[..key.start()];
        let nested = before.matches('{').count() > before.matches('}').count();
        if nested {
            continue;
        }
        if let Some(name) = normalize_specifier(key.as_str()) {
            keys.push((name, line_of(&masked, body_start + key.start())));
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_postcss_object_form() {
        let src = r#"export default {
  plugins: {
    'postcss-import': {},
    tailwindcss: { config: './tailwind.config.js' },
    autoprefixer: {},
  },
};
"#;
        let plugins = postcss_object_plugins(src);
        let names: Vec<&str> = plugins.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["postcss-import", "tailwindcss", "autoprefixer"]);
        assert_eq!(plugins[1].1, 4);
    }

    #[test]
    fn test_postcss_object_form_single_line() {
        let src = "module.exports = { plugins: { tailwindcss: {}, autoprefixer: {} } };";
        let names: Vec<String> = postcss_object_plugins(src).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["tailwindcss", "autoprefixer"]);
    }

    #[test]
    fn test_scan_filters_to_plugin_names() {
        let temp = tempdir().unwrap();
        std::fs::write(
            temp.path().join("vite.config.js"),
            "import { defineConfig } from 'vite';\nimport react from '@vitejs/plugin-react';\nimport lodash from 'lodash';\nexport default defineConfig({ plugins: [react()] });\n",
        )
        .unwrap();

        let output = BuildConfigScanner::new().scan(temp.path());

        assert_eq!(output.files_scanned, 1);
        assert_eq!(
            output.packages.keys().collect::<Vec<_>>(),
            vec!["@vitejs/plugin-react"]
        );
        let usage = &output.packages["@vitejs/plugin-react"].usages[0];
        assert_eq!(usage.file, PathBuf::from("vite.config.js"));
        assert_eq!(usage.line, 2);
    }

    #[test]
    fn test_present_config_files_only_root() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("nested")).unwrap();
        std::fs::write(temp.path().join("nested/vite.config.js"), "").unwrap();
        std::fs::write(temp.path().join("tailwind.config.js"), "module.exports = {}").unwrap();

        let files = BuildConfigScanner::present_config_files(temp.path());
        assert_eq!(files, vec![PathBuf::from("tailwind.config.js")]);
    }
}
