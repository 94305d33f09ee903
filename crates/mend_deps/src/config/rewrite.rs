//! Mechanical import-syntax rewrite between the two module systems.
//!
//! Only the statement shapes config files actually use are handled. After a
//! rewrite the markers of the source system must be gone, otherwise the file
//! is left untouched and the rewrite reports failure.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mend_model::{ConversionDirection, ModuleSystemIssue};

use crate::config::module_system::detect_markers;
use crate::error::{DepsError, DepsResult};
use crate::lexer::{line_depths, line_of};

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("rewrite pattern is valid")
}

// CommonJS -> ES module

static REQUIRE_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)(?:const|let|var)[ \t]+([\w$]+)[ \t]*=[ \t]*require\(\s*['"]([^'"\n]+)['"]\s*\)[ \t]*;?[ \t]*$"#)
});

static REQUIRE_DESTRUCTURED_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)(?:const|let|var)[ \t]+\{([^}]*)\}[ \t]*=[ \t]*require\(\s*['"]([^'"\n]+)['"]\s*\)[ \t]*;?[ \t]*$"#)
});

static REQUIRE_BARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)require\(\s*['"]([^'"\n]+)['"]\s*\)[ \t]*;?[ \t]*$"#)
});

static REQUIRE_INLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r#"\brequire\(\s*['"]([^'"\n]+)['"]\s*\)"#));

static MODULE_EXPORTS_MEMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^([ \t]*)(?:module\.)?exports\.([\w$]+)[ \t]*=[ \t]*")
});

static MODULE_EXPORTS_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^([ \t]*)module\.exports[ \t]*=[ \t]*"));

static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| pattern(r"(?m)^import\b.*$"));

// ES module -> CommonJS

static IMPORT_DEFAULT_NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)import[ \t]+([\w$]+)[ \t]*,[ \t]*\{([^}]*)\}\s*from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static IMPORT_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)import[ \t]+([\w$]+)\s+from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static IMPORT_NAMED_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)import[ \t]*\{([^}]*)\}\s*from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static IMPORT_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)import[ \t]*\*[ \t]*as[ \t]+([\w$]+)\s+from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static IMPORT_SIDE_EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)import[ \t]*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static EXPORT_DEFAULT_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^([ \t]*)export[ \t]+default[ \t]+"));

static EXPORT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"(?m)^([ \t]*)export[ \t]+((?:const|let|var|class|function\*?|async[ \t]+function\*?)[ \t]*)([\w$]+)")
});

static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r#"(?m)^([ \t]*)export[ \t]*\{([^}]*)\}\s*from\s*['"]([^'"\n]+)['"][ \t]*;?[ \t]*$"#)
});

static EXPORT_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"(?m)^([ \t]*)export[ \t]*\{([^}]*)\}[ \t]*;?[ \t]*$"));

/// Rewritten source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    /// Statements changed
    pub changes: usize,
}

/// A rewrite that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOutcome {
    pub file: PathBuf,
    pub direction: ConversionDirection,
    pub changes: usize,
}

/// Rewrite `source` towards the system named by `direction`.
///
/// Text already in the target system comes back unchanged.
pub fn rewrite_source(source: &str, direction: ConversionDirection) -> Rewrite {
    match direction {
        ConversionDirection::ToModule => to_module(source),
        ConversionDirection::ToCommonJs => to_commonjs(source),
    }
}

/// Rewrite the file named by `issue` and persist it.
///
/// Fails without touching the file when the rewrite leaves markers of the
/// system being converted away from.
pub fn apply_rewrite(project_path: &Path, issue: &ModuleSystemIssue) -> DepsResult<RewriteOutcome> {
    let path = project_path.join(&issue.file);
    let rewrite_error = |message: String| DepsError::Rewrite {
        file: issue.file.clone(),
        message,
    };

    let source = std::fs::read_to_string(&path).map_err(|e| rewrite_error(e.to_string()))?;
    let rewrite = rewrite_source(&source, issue.direction);

    let leftover = detect_markers(&rewrite.content).count(issue.direction.target().opposite());
    if leftover > 0 {
        return Err(rewrite_error(format!(
            "{} {} statement(s) could not be converted",
            leftover,
            issue.direction.target().opposite()
        )));
    }
    if rewrite.changes == 0 {
        return Err(rewrite_error("nothing to convert".to_string()));
    }

    std::fs::write(&path, &rewrite.content).map_err(|e| rewrite_error(e.to_string()))?;
    info!(
        "Rewrote {:?} to {} ({} change(s))",
        issue.file,
        issue.direction.target(),
        rewrite.changes
    );

    Ok(RewriteOutcome {
        file: issue.file.clone(),
        direction: issue.direction,
        changes: rewrite.changes,
    })
}

fn to_module(source: &str) -> Rewrite {
    let mut changes = 0;
    // Specifier -> binding, so later inline requires reuse an existing import.
    let mut bindings: BTreeMap<String, String> = BTreeMap::new();

    // Statement rewrites apply only at the top level; `import` and `export`
    // are invalid inside a block. Nested requires are hoisted below.
    let depths = line_depths(source);
    let text = REQUIRE_DEFAULT_RE.replace_all(source, |caps: &Captures| {
        if !at_top_level(source, &depths, caps) {
            return caps[0].to_string();
        }
        changes += 1;
        bindings.insert(caps[3].to_string(), caps[2].to_string());
        format!("{}import {} from '{}';", &caps[1], &caps[2], &caps[3])
    });

    let depths = line_depths(&text);
    let text = REQUIRE_DESTRUCTURED_RE.replace_all(&text, |caps: &Captures| {
        if !at_top_level(&text, &depths, caps) {
            return caps[0].to_string();
        }
        changes += 1;
        format!(
            "{}import {{ {} }} from '{}';",
            &caps[1],
            map_bindings(&caps[2], ":", " as "),
            &caps[3]
        )
    });

    let depths = line_depths(&text);
    let text = REQUIRE_BARE_RE.replace_all(&text, |caps: &Captures| {
        if !at_top_level(&text, &depths, caps) {
            return caps[0].to_string();
        }
        changes += 1;
        format!("{}import '{}';", &caps[1], &caps[2])
    });

    let depths = line_depths(&text);
    let text = MODULE_EXPORTS_MEMBER_RE.replace_all(&text, |caps: &Captures| {
        if !at_top_level(&text, &depths, caps) {
            return caps[0].to_string();
        }
        changes += 1;
        format!("{}export const {} = ", &caps[1], &caps[2])
    });

    let depths = line_depths(&text);
    let text = MODULE_EXPORTS_RE.replace_all(&text, |caps: &Captures| {
        if !at_top_level(&text, &depths, caps) {
            return caps[0].to_string();
        }
        changes += 1;
        format!("{}export default ", &caps[1])
    });

    // Remaining requires sit inside expressions: hoist each to an import.
    let mut hoisted: Vec<String> = Vec::new();
    let text = REQUIRE_INLINE_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        let specifier = caps[1].to_string();
        if let Some(binding) = bindings.get(&specifier) {
            return binding.clone();
        }
        let binding = unique_binding(&specifier, &bindings);
        hoisted.push(format!("import {} from '{}';", binding, specifier));
        bindings.insert(specifier, binding.clone());
        binding
    });

    let content = if hoisted.is_empty() {
        text.into_owned()
    } else {
        debug!("Hoisting {} inline require(s)", hoisted.len());
        insert_after_imports(&text, &hoisted)
    };

    Rewrite { content, changes }
}

fn to_commonjs(source: &str) -> Rewrite {
    let mut changes = 0;

    let text = IMPORT_DEFAULT_NAMED_RE.replace_all(source, |caps: &Captures| {
        changes += 1;
        format!(
            "{indent}const {} = require('{m}');\n{indent}const {{ {} }} = require('{m}');",
            &caps[2],
            map_bindings(&caps[3], " as ", ": "),
            indent = &caps[1],
            m = &caps[4]
        )
    });

    let text = IMPORT_DEFAULT_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        format!("{}const {} = require('{}');", &caps[1], &caps[2], &caps[3])
    });

    let text = IMPORT_NAMED_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        format!(
            "{}const {{ {} }} = require('{}');",
            &caps[1],
            map_bindings(&caps[2], " as ", ": "),
            &caps[3]
        )
    });

    let text = IMPORT_NAMESPACE_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        format!("{}const {} = require('{}');", &caps[1], &caps[2], &caps[3])
    });

    let text = IMPORT_SIDE_EFFECT_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        format!("{}require('{}');", &caps[1], &caps[2])
    });

    let text = EXPORT_DEFAULT_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        format!("{}module.exports = ", &caps[1])
    });

    let mut exported: Vec<String> = Vec::new();
    let text = EXPORT_DECL_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        exported.push(caps[3].to_string());
        format!("{}{}{}", &caps[1], &caps[2], &caps[3])
    });

    let text = EXPORT_FROM_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        export_list(&caps[2])
            .into_iter()
            .map(|(local, public)| {
                format!(
                    "{}module.exports.{} = require('{}').{};",
                    &caps[1], public, &caps[3], local
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    });

    let text = EXPORT_LIST_RE.replace_all(&text, |caps: &Captures| {
        changes += 1;
        export_list(&caps[2])
            .into_iter()
            .map(|(local, public)| format!("{}module.exports.{} = {};", &caps[1], public, local))
            .collect::<Vec<_>>()
            .join("\n")
    });

    let mut content = text.into_owned();
    if !exported.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        content.push('\n');
        for name in &exported {
            content.push_str(&format!("module.exports.{} = {};\n", name, name));
        }
    }

    Rewrite { content, changes }
}

/// Whether the statement matched by `caps` starts outside any bracket.
fn at_top_level(text: &str, depths: &[usize], caps: &Captures) -> bool {
    let start = caps.get(0).map_or(0, |m| m.start());
    depths.get(line_of(text, start) - 1).copied().unwrap_or(0) == 0
}

/// Rewrite each `a<from>b` entry of a binding list as `a<to>b`.
fn map_bindings(list: &str, from: &str, to: &str) -> String {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(from) {
            Some((name, alias)) => format!("{}{}{}", name.trim(), to, alias.trim()),
            None => entry.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Entries of an `export { a, b as c }` list as `(local, public)` pairs.
fn export_list(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(" as ") {
            Some((local, public)) => (local.trim().to_string(), public.trim().to_string()),
            None => (entry.to_string(), entry.to_string()),
        })
        .collect()
}

/// camelCase binding for a package specifier, unique among `taken`.
fn unique_binding(specifier: &str, taken: &BTreeMap<String, String>) -> String {
    let mut base = String::new();
    for (i, part) in specifier
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        if i == 0 {
            base.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                base.extend(first.to_uppercase());
                base.push_str(chars.as_str());
            }
        }
    }
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, '_');
    }

    let mut binding = base.clone();
    let mut n = 2;
    while taken.values().any(|b| *b == binding) {
        binding = format!("{}{}", base, n);
        n += 1;
    }
    binding
}

/// Insert `lines` after the last top-level import, or at the top.
fn insert_after_imports(text: &str, lines: &[String]) -> String {
    let block = lines.join("\n");
    match IMPORT_LINE_RE.find_iter(text).last() {
        Some(last) => {
            let mut out = String::with_capacity(text.len() + block.len() + 1);
            out.push_str(&text[..last.end()]);
            out.push('\n');
            out.push_str(&block);
            out.push_str(&text[last.end()..]);
            out
        }
        None => format!("{}\n\n{}", block, text),
    }
}
