//! Import extraction from config sources.
//!
//! One capability, [`ImportParser`], with two implementations: a structural
//! parse over a tree-sitter syntax tree and a lexical regex scan. The
//! [`FallbackParser`] chains them so callers only ever see the normalized
//! list of [`ImportRef`]s, never which strategy produced it.

use std::cell::RefCell;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tree_sitter::{Node, Parser};

use crate::error::{DepsError, DepsResult};
use crate::lexer::{line_of, mask_comments};

/// How a module was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import ... from 'x'`, `import 'x'`, or `export ... from 'x'`
    Import,
    /// `require('x')`
    Require,
}

/// A static module reference found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRef {
    pub specifier: String,
    pub line: usize,
    pub kind: ImportKind,
}

impl ImportRef {
    pub fn new(specifier: impl Into<String>, line: usize, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            line,
            kind,
        }
    }
}

/// Source grammar to parse with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    JavaScript,
    TypeScript,
}

impl Dialect {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts" | "mts" | "cts") => Self::TypeScript,
            _ => Self::JavaScript,
        }
    }
}

/// Extracts static module references from source text.
pub trait ImportParser: Send + Sync {
    /// Parser identifier (for logs).
    fn name(&self) -> &'static str;

    /// Extract every static import and `require()` reference, in source order.
    fn extract(&self, source: &str, dialect: Dialect) -> DepsResult<Vec<ImportRef>>;
}

// ---------------------------------------------------------------------------
// Structural parser
// ---------------------------------------------------------------------------

thread_local! {
    static JS_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // A language error surfaces as a failed parse below
        let _ = p.set_language(&tree_sitter_javascript::LANGUAGE.into());
        p
    });

    static TS_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into());
        p
    });
}

/// Syntax-tree based extraction. Fails on any syntax error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterParser;

impl TreeSitterParser {
    pub fn new() -> Self {
        Self
    }
}

impl ImportParser for TreeSitterParser {
    fn name(&self) -> &'static str {
        "tree-sitter"
    }

    fn extract(&self, source: &str, dialect: Dialect) -> DepsResult<Vec<ImportRef>> {
        let tree = match dialect {
            Dialect::JavaScript => JS_PARSER.with(|p| p.borrow_mut().parse(source, None)),
            Dialect::TypeScript => TS_PARSER.with(|p| p.borrow_mut().parse(source, None)),
        }
        .ok_or_else(|| DepsError::Parse {
            parser: self.name().to_string(),
            message: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(DepsError::Parse {
                parser: self.name().to_string(),
                message: "source contains syntax errors".to_string(),
            });
        }

        Ok(collect_imports(&root, source))
    }
}

fn collect_imports(root: &Node, source: &str) -> Vec<ImportRef> {
    let mut refs = Vec::new();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();

        match node.kind() {
            "import_statement" | "export_statement" => {
                if let Some(spec) = node
                    .child_by_field_name("source")
                    .and_then(|s| string_value(&s, source))
                {
                    refs.push(ImportRef::new(spec, line(&node), ImportKind::Import));
                }
            }
            "import_require_clause" => {
                if let Some(spec) = node
                    .child_by_field_name("source")
                    .and_then(|s| string_value(&s, source))
                {
                    refs.push(ImportRef::new(spec, line(&node), ImportKind::Require));
                }
            }
            "call_expression" => {
                if let Some(spec) = require_argument(&node, source) {
                    refs.push(ImportRef::new(spec, line(&node), ImportKind::Require));
                }
            }
            _ => {}
        }

        if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return refs;
            }
        }
    }
}

/// Specifier of a `require('x')` call with a single string literal argument.
fn require_argument(call: &Node, source: &str) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "identifier" || node_text(&function, source) != "require" {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    if first.kind() != "string" {
        return None;
    }
    string_value(&first, source)
}

fn string_value(node: &Node, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let value = node_text(node, source)
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string();
    (!value.is_empty()).then_some(value)
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn line(node: &Node) -> usize {
    node.start_position().row + 1
}

// ---------------------------------------------------------------------------
// Lexical parser
// ---------------------------------------------------------------------------

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:import|export)\s+(?:[^'";]*?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .expect("import pattern is valid")
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).expect("require pattern is valid")
});

/// Regex-based extraction. Tolerates syntax errors elsewhere in the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexParser;

impl RegexParser {
    pub fn new() -> Self {
        Self
    }
}

impl ImportParser for RegexParser {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn extract(&self, source: &str, _dialect: Dialect) -> DepsResult<Vec<ImportRef>> {
        if source.contains('\0') {
            return Err(DepsError::Parse {
                parser: self.name().to_string(),
                message: "source is not text".to_string(),
            });
        }

        let masked = mask_comments(source);
        let mut found: Vec<(usize, ImportRef)> = Vec::new();

        for caps in IMPORT_RE.captures_iter(&masked) {
            let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // `export const x = ...` has no source clause
            if whole.as_str().starts_with("export") && !whole.as_str().contains("from") {
                continue;
            }
            let line = line_of(&masked, whole.start());
            found.push((whole.start(), ImportRef::new(spec.as_str(), line, ImportKind::Import)));
        }

        for caps in REQUIRE_RE.captures_iter(&masked) {
            let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let line = line_of(&masked, whole.start());
            found.push((whole.start(), ImportRef::new(spec.as_str(), line, ImportKind::Require)));
        }

        found.sort_by_key(|(offset, _)| *offset);
        Ok(found.into_iter().map(|(_, r)| r).collect())
    }
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

/// Tries a primary parser and falls back to a secondary one on failure.
pub struct FallbackParser {
    primary: Box<dyn ImportParser>,
    fallback: Box<dyn ImportParser>,
}

impl FallbackParser {
    pub fn new(primary: Box<dyn ImportParser>, fallback: Box<dyn ImportParser>) -> Self {
        Self { primary, fallback }
    }
}

impl Default for FallbackParser {
    /// Structural parse first, regex scan second.
    fn default() -> Self {
        Self::new(Box::new(TreeSitterParser::new()), Box::new(RegexParser::new()))
    }
}

impl ImportParser for FallbackParser {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn extract(&self, source: &str, dialect: Dialect) -> DepsResult<Vec<ImportRef>> {
        match self.primary.extract(source, dialect) {
            Ok(refs) => Ok(refs),
            Err(primary_err) => {
                debug!(
                    "{} parser failed ({}), falling back to {}",
                    self.primary.name(),
                    primary_err,
                    self.fallback.name()
                );
                self.fallback.extract(source, dialect).map_err(|fallback_err| DepsError::Parse {
                    parser: self.name().to_string(),
                    message: format!("{}; {}", primary_err, fallback_err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESM_CONFIG: &str = r#"import { defineConfig } from 'vite';
import react from '@vitejs/plugin-react';
import alpha from "pkg-alpha-plugin";
import './local-setup.js';

export default defineConfig({
  plugins: [react(), alpha()],
});
"#;

    const CJS_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
module.exports = {
  content: ['./src/**/*.{js,jsx}'],
  plugins: [
    require('@tailwindcss/forms'),
    require("daisyui"),
  ],
};
"#;

    fn specifiers(refs: &[ImportRef]) -> Vec<&str> {
        refs.iter().map(|r| r.specifier.as_str()).collect()
    }

    #[test]
    fn test_tree_sitter_extracts_imports() {
        let refs = TreeSitterParser::new()
            .extract(ESM_CONFIG, Dialect::JavaScript)
            .unwrap();
        assert_eq!(
            specifiers(&refs),
            vec!["vite", "@vitejs/plugin-react", "pkg-alpha-plugin", "./local-setup.js"]
        );
        assert_eq!(refs[2].line, 3);
        assert!(refs.iter().all(|r| r.kind == ImportKind::Import));
    }

    #[test]
    fn test_tree_sitter_extracts_requires() {
        let refs = TreeSitterParser::new()
            .extract(CJS_CONFIG, Dialect::JavaScript)
            .unwrap();
        assert_eq!(specifiers(&refs), vec!["@tailwindcss/forms", "daisyui"]);
        assert!(refs.iter().all(|r| r.kind == ImportKind::Require));
    }

    #[test]
    fn test_tree_sitter_rejects_syntax_errors() {
        let broken = "import x from 'a';\nexport default {{{ plugins: [";
        assert!(TreeSitterParser::new().extract(broken, Dialect::JavaScript).is_err());
    }

    #[test]
    fn test_regex_matches_structural_shape() {
        let structural = TreeSitterParser::new()
            .extract(ESM_CONFIG, Dialect::JavaScript)
            .unwrap();
        let lexical = RegexParser::new().extract(ESM_CONFIG, Dialect::JavaScript).unwrap();
        assert_eq!(structural, lexical);

        let structural = TreeSitterParser::new()
            .extract(CJS_CONFIG, Dialect::JavaScript)
            .unwrap();
        let lexical = RegexParser::new().extract(CJS_CONFIG, Dialect::JavaScript).unwrap();
        assert_eq!(structural, lexical);
    }

    #[test]
    fn test_regex_ignores_commented_requires() {
        let src = "// require('ghost-plugin')\nconst a = require('real-plugin');";
        let refs = RegexParser::new().extract(src, Dialect::JavaScript).unwrap();
        assert_eq!(specifiers(&refs), vec!["real-plugin"]);
        assert_eq!(refs[0].line, 2);
    }

    #[test]
    fn test_fallback_recovers_from_syntax_error() {
        let broken = "import alpha from 'pkg-alpha-plugin';\nexport default {{{ plugins: [alpha(";
        let refs = FallbackParser::default()
            .extract(broken, Dialect::JavaScript)
            .unwrap();
        assert_eq!(specifiers(&refs), vec!["pkg-alpha-plugin"]);
    }

    #[test]
    fn test_fallback_fails_when_both_fail() {
        let binary = "import a from 'b'\0\0{{{";
        assert!(FallbackParser::default().extract(binary, Dialect::JavaScript).is_err());
    }

    #[test]
    fn test_typescript_dialect() {
        let src = "import type { Config } from 'tailwindcss';\nimport forms from '@tailwindcss/forms';\nexport default { plugins: [forms] } satisfies Config;\n";
        let refs = FallbackParser::default()
            .extract(src, Dialect::TypeScript)
            .unwrap();
        assert_eq!(specifiers(&refs), vec!["tailwindcss", "@tailwindcss/forms"]);
    }

    #[test]
    fn test_dialect_from_extension() {
        assert_eq!(Dialect::for_path(Path::new("vite.config.ts")), Dialect::TypeScript);
        assert_eq!(Dialect::for_path(Path::new("vite.config.mjs")), Dialect::JavaScript);
    }
}
