//! Ordered first-match classification rules for console text.
//!
//! Rules are evaluated top to bottom and the first match decides the
//! severity. Adding a rule is a data change: push another entry.

use regex::Regex;
use serde::Serialize;

use mend_model::Severity;

use crate::error::{VisualError, VisualResult};

/// Fallback remediation for entries no rule matches.
pub const DEFAULT_SUGGESTION: &str = "Review the console message";

/// Built-in rules, most severe first: `(label, pattern, severity, remediation)`.
const STANDARD_RULES: &[(&str, &str, Severity, &str)] = &[
    (
        "server-error",
        r"(?i)internal server error|bad gateway|service unavailable|gateway timeout|status of 5\d\d\b|\b50[0-4]\b.*\b(?:error|failed)\b",
        Severity::Critical,
        "The dev server failed to serve the page; check its output for the failing request",
    ),
    (
        "bundler-failure",
        r"(?i)\[plugin:[^\]]+\]|(?:\[vite\]|\[webpack[^\]]*\]|\besbuild\b|\brollup\b)[^\n]*\b(?:error|failed|failure)\b|pre-transform error|failed to compile|compilation failed|module build failed|build failed",
        Severity::Critical,
        "Fix the build error reported by the bundler; the page cannot render until it compiles",
    ),
    (
        "style-preprocessor",
        r"(?i)\b(?:postcss|tailwind(?:css)?|sass|scss|less)\b[^\n]*\b(?:error|failed|cannot|unknown|undefined)\b|css ?syntax ?error|unknown at-?rule",
        Severity::Critical,
        "Check stylesheet syntax and that every CSS plugin is declared and installed",
    ),
    (
        "uncaught-exception",
        r"(?i)uncaught|unhandled (?:promise )?rejection|\b(?:Type|Reference|Syntax|Range)Error\b|is not defined|cannot read propert",
        Severity::Critical,
        "Fix the runtime error at the reported location",
    ),
    (
        "module-resolution",
        r"(?i)cannot find module|failed to resolve (?:import|module|entry)|module not found|could not resolve|does not provide an export named|failed to fetch dynamically imported module",
        Severity::Critical,
        "Install the missing package or correct the import path",
    ),
    (
        "not-found",
        r"(?i)\b404\b|not found",
        Severity::Major,
        "Check the asset path or route; the resource does not exist",
    ),
    (
        "cross-origin",
        r"(?i)\bcors\b|cross-origin|access-control-allow-origin",
        Severity::Major,
        "Serve the resource from the same origin or configure CORS headers",
    ),
    (
        "network",
        r"(?i)net::err_|network ?error|failed to fetch|econnrefused|econnreset|\btimed out\b|\btimeout (?:error|exceeded)\b",
        Severity::Major,
        "Check that the dev server is running and reachable",
    ),
];

/// One classification rule.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub label: String,
    pub pattern: Regex,
    pub severity: Severity,
    pub suggestion: String,
}

/// Outcome of classifying one text entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub severity: Severity,
    pub suggestion: String,
    /// Label of the matching rule; `None` when the default applied
    pub rule: Option<String>,
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
}

impl RuleSet {
    /// An empty set: everything classifies as MINOR.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules.
    pub fn standard() -> VisualResult<Self> {
        STANDARD_RULES
            .iter()
            .try_fold(Self::new(), |set, (label, pattern, severity, suggestion)| {
                set.with_rule(*label, pattern, *severity, *suggestion)
            })
    }

    /// Append a rule; it is consulted after every existing one.
    pub fn with_rule(
        mut self,
        label: impl Into<String>,
        pattern: &str,
        severity: Severity,
        suggestion: impl Into<String>,
    ) -> VisualResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| VisualError::Rule {
            pattern: pattern.to_string(),
            source,
        })?;
        self.rules.push(ClassificationRule {
            label: label.into(),
            pattern: regex,
            severity,
            suggestion: suggestion.into(),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First matching rule wins; unmatched text is MINOR.
    pub fn classify(&self, text: &str) -> Classification {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| Classification {
                severity: rule.severity,
                suggestion: rule.suggestion.clone(),
                rule: Some(rule.label.clone()),
            })
            .unwrap_or_else(|| Classification {
                severity: Severity::Minor,
                suggestion: DEFAULT_SUGGESTION.to_string(),
                rule: None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> RuleSet {
        RuleSet::standard().unwrap()
    }

    #[test]
    fn test_standard_rules_compile_in_order() {
        let rules = standard();
        assert_eq!(rules.len(), STANDARD_RULES.len());
        assert!(rules
            .rules
            .windows(2)
            .all(|pair| pair[0].severity >= pair[1].severity));
    }

    #[test]
    fn test_critical_patterns() {
        let rules = standard();
        for text in [
            "GET http://localhost:5173/ 500 (Internal Server Error)",
            "[plugin:vite:css] [postcss] Cannot find module 'tailwindcss'",
            "Uncaught TypeError: Cannot read properties of undefined (reading 'map')",
            "Failed to resolve import \"./App\" from \"src/main.tsx\". Does the file exist?",
            "Failed to fetch dynamically imported module: http://localhost:5173/src/pages/Home.tsx",
        ] {
            assert_eq!(rules.classify(text).severity, Severity::Critical, "{}", text);
        }
    }

    #[test]
    fn test_major_patterns() {
        let rules = standard();
        for text in [
            "Failed to load resource: the server responded with a status of 404 (Not Found)",
            "Access to fetch at 'https://api.example.com' has been blocked by CORS policy",
            "GET http://localhost:3000/api net::ERR_CONNECTION_REFUSED",
        ] {
            assert_eq!(rules.classify(text).severity, Severity::Major, "{}", text);
        }
    }

    #[test]
    fn test_tool_names_alone_are_not_failures() {
        let rules = standard();
        for text in [
            "[vite] connecting...",
            "[vite] connected.",
            "[vite] hot updated: /src/App.tsx",
            "Tailwind CSS IntelliSense loaded",
            "clearTimeout called",
            "setTimeout handler took 52ms",
        ] {
            let result = rules.classify(text);
            assert_eq!(result.severity, Severity::Minor, "{} via {:?}", text, result.rule);
        }
    }

    #[test]
    fn test_tool_failures_still_critical() {
        let rules = standard();
        for (text, rule) in [
            ("[vite] error while updating dependencies", "bundler-failure"),
            ("[plugin:vite:import-analysis] Failed to resolve import \"./x\"", "bundler-failure"),
            ("esbuild failed: Unexpected end of file", "bundler-failure"),
            ("Build failed with 1 error: src/main.ts:3:0: ERROR: Expected \";\"", "bundler-failure"),
            ("[postcss] Cannot apply unknown utility class `bg-primary`", "style-preprocessor"),
            ("Sass error: Undefined variable $brand", "style-preprocessor"),
        ] {
            let result = rules.classify(text);
            assert_eq!(result.severity, Severity::Critical, "{}", text);
            assert_eq!(result.rule.as_deref(), Some(rule), "{}", text);
        }
        assert_eq!(
            rules.classify("GET /api/items net::ERR_TIMED_OUT").severity,
            Severity::Major
        );
        assert_eq!(rules.classify("request timed out after 30s").severity, Severity::Major);
    }

    #[test]
    fn test_first_match_wins() {
        // Matches both module-resolution and not-found; the earlier rule decides.
        let result = standard().classify("Module not found: Error: Can't resolve 'daisyui'");
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.rule.as_deref(), Some("module-resolution"));
    }

    #[test]
    fn test_unmatched_defaults_to_minor() {
        let result = standard().classify("Download the React DevTools for a better development experience");
        assert_eq!(result.severity, Severity::Minor);
        assert_eq!(result.rule, None);
        assert_eq!(result.suggestion, DEFAULT_SUGGESTION);
    }

    #[test]
    fn test_custom_rule_appends() {
        let rules = RuleSet::new()
            .with_rule("deprecation", "(?i)deprecated", Severity::Major, "Update the API call")
            .unwrap();
        assert_eq!(rules.classify("findDOMNode is deprecated").severity, Severity::Major);
        assert!(RuleSet::new().with_rule("bad", "(", Severity::Minor, "").is_err());
    }
}
