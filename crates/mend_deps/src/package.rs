//! Package-name rules: specifier normalization, the plugin naming filter,
//! and the table of recommended versions.

use mend_model::LATEST_VERSION;

/// Scoped namespaces whose packages are build plugins.
const PLUGIN_SCOPES: &[&str] = &[
    "@vitejs/",
    "@tailwindcss/",
    "@rollup/plugin-",
    "@babel/plugin-",
    "@babel/preset-",
    "@sveltejs/",
    "@astrojs/",
    "@nuxt/",
    "@originjs/",
    "@csstools/",
];

/// Unscoped prefixes that mark a plugin package.
const PLUGIN_PREFIXES: &[&str] = &[
    "vite-plugin-",
    "rollup-plugin-",
    "eslint-plugin-",
    "eslint-config-",
    "babel-plugin-",
    "babel-preset-",
    "postcss-",
    "tailwindcss-",
    "unplugin-",
    "prettier-plugin-",
];

/// Well-known plugins that follow none of the conventions above.
const KNOWN_PLUGINS: &[&str] = &["tailwindcss", "autoprefixer", "daisyui", "cssnano"];

/// Versions recommended when a known package is missing.
const RECOMMENDED_VERSIONS: &[(&str, &str)] = &[
    ("@tailwindcss/aspect-ratio", "^0.4.2"),
    ("@tailwindcss/container-queries", "^0.1.1"),
    ("@tailwindcss/forms", "^0.5.7"),
    ("@tailwindcss/line-clamp", "^0.4.4"),
    ("@tailwindcss/typography", "^0.5.10"),
    ("@vitejs/plugin-react", "^4.2.1"),
    ("@vitejs/plugin-vue", "^5.0.0"),
    ("autoprefixer", "^10.4.16"),
    ("cssnano", "^6.0.2"),
    ("daisyui", "^4.4.0"),
    ("postcss", "^8.4.32"),
    ("postcss-import", "^15.1.0"),
    ("postcss-nesting", "^12.0.2"),
    ("tailwindcss", "^3.4.0"),
    ("tailwindcss-animate", "^1.0.7"),
];

/// Node built-in modules, which never appear in a manifest.
const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "crypto", "events", "fs", "http", "https", "module",
    "os", "path", "process", "stream", "url", "util", "zlib",
];

/// Reduce an import specifier to the package name it refers to.
///
/// Returns `None` for relative, absolute, URL, and built-in specifiers.
pub fn normalize_specifier(specifier: &str) -> Option<String> {
    let spec = specifier.trim();
    if spec.is_empty()
        || spec.starts_with('.')
        || spec.starts_with('/')
        || spec.starts_with('~')
        || spec.starts_with('#')
        || spec.starts_with("node:")
        || spec.contains("://")
    {
        return None;
    }

    let mut parts = spec.split('/');
    let name = if spec.starts_with('@') {
        let scope = parts.next()?;
        let pkg = parts.next().filter(|p| !p.is_empty())?;
        format!("{}/{}", scope, pkg)
    } else {
        parts.next()?.to_string()
    };

    if NODE_BUILTINS.contains(&name.as_str()) || !is_valid_name(&name) {
        return None;
    }

    Some(name)
}

fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '/'))
}

/// Whether a package name follows one of the plugin naming conventions.
pub fn is_plugin_name(name: &str) -> bool {
    PLUGIN_SCOPES.iter().any(|scope| name.starts_with(scope))
        || PLUGIN_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        || KNOWN_PLUGINS.contains(&name)
        || name.ends_with("-plugin")
        || name.contains("-plugin-")
}

/// Version to add for a missing package.
pub fn recommended_version(name: &str) -> &'static str {
    RECOMMENDED_VERSIONS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, version)| *version)
        .unwrap_or(LATEST_VERSION)
}
