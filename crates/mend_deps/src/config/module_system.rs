//! Module-system mismatch detection for config files.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use mend_model::{ConversionDirection, ModuleSystem, ModuleSystemIssue, Severity};

use crate::lexer::mask_comments;

/// `import x from`, `import {`, `import * as`, `import 'side-effect'`.
/// Dynamic `import(...)` is valid in both systems and is not matched.
static ESM_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import(?:\s+[\w$*{]|\s*['"{*]).*$"#).expect("esm import pattern is valid")
});

static ESM_TYPE_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*import\s+type\s").expect("type import pattern is valid")
});

static ESM_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*export(?:\s+(?:default|const|let|var|function|class|async)\b|\s*[{*])")
        .expect("esm export pattern is valid")
});

static CJS_REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*['"]"#).expect("require pattern is valid")
});

static CJS_EXPORTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\bmodule\.exports\b|^[ \t]*exports\.[\w$]+\s*=")
        .expect("commonjs exports pattern is valid")
});

/// Syntax markers of each module system found in a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxMarkers {
    pub module: usize,
    pub commonjs: usize,
}

impl SyntaxMarkers {
    /// The system the file uses, when it uses exactly one.
    pub fn exclusive_system(&self) -> Option<ModuleSystem> {
        match (self.module > 0, self.commonjs > 0) {
            (true, false) => Some(ModuleSystem::Module),
            (false, true) => Some(ModuleSystem::CommonJs),
            _ => None,
        }
    }

    pub fn count(&self, system: ModuleSystem) -> usize {
        match system {
            ModuleSystem::Module => self.module,
            ModuleSystem::CommonJs => self.commonjs,
        }
    }
}

/// Count import/export and require/module.exports markers outside comments.
pub fn detect_markers(source: &str) -> SyntaxMarkers {
    let masked = mask_comments(source);

    let imports = ESM_IMPORT_RE
        .find_iter(&masked)
        .filter(|m| !ESM_TYPE_IMPORT_RE.is_match(m.as_str()))
        .count();

    SyntaxMarkers {
        module: imports + ESM_EXPORT_RE.find_iter(&masked).count(),
        commonjs: CJS_REQUIRE_RE.find_iter(&masked).count()
            + CJS_EXPORTS_RE.find_iter(&masked).count(),
    }
}

/// Module system forced by the file extension, if any.
pub fn file_system_override(path: &Path) -> Option<ModuleSystem> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mjs") | Some("mts") => Some(ModuleSystem::Module),
        Some("cjs") | Some("cts") => Some(ModuleSystem::CommonJs),
        _ => None,
    }
}

/// The system a file is loaded as: extension override, else the project default.
pub fn expected_system(path: &Path, project_system: ModuleSystem) -> ModuleSystem {
    file_system_override(path).unwrap_or(project_system)
}

/// Check one config file. Mixed or marker-free files are never flagged.
pub fn check_file(
    rel: &Path,
    source: &str,
    project_system: ModuleSystem,
) -> Option<ModuleSystemIssue> {
    let expected = expected_system(rel, project_system);
    let observed = detect_markers(source).exclusive_system()?;
    if observed == expected {
        return None;
    }

    Some(ModuleSystemIssue {
        file: rel.to_path_buf(),
        severity: Severity::Major,
        project_system,
        expected_system: expected,
        observed_system: observed,
        direction: ConversionDirection::towards(expected),
        suggestion: suggestion(rel, expected, observed),
    })
}

fn suggestion(rel: &Path, expected: ModuleSystem, observed: ModuleSystem) -> String {
    let name = rel.display();
    let (syntax, rename_ext) = match observed {
        ModuleSystem::CommonJs => ("require()/module.exports", "cjs"),
        ModuleSystem::Module => ("import/export", "mjs"),
    };
    let target_syntax = match expected {
        ModuleSystem::Module => "import/export",
        ModuleSystem::CommonJs => "require()/module.exports",
    };

    let mut text = format!(
        "{} uses {} but is loaded as {}; convert it to {} syntax",
        name, syntax, expected, target_syntax
    );
    // An explicit extension only helps when the current one is not already forcing the system.
    if file_system_override(rel).is_none() {
        text.push_str(&format!(
            " or rename it to {}",
            rel.with_extension(rename_ext).display()
        ));
    }
    text
}
