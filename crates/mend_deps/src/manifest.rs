//! Dependency manifest (`package.json`) access.
//!
//! The manifest is held as an order-preserving JSON document so that
//! persisting it after an edit changes nothing but the edited group.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use mend_model::ModuleSystem;

use crate::error::{DepsError, DepsResult};

/// Manifest file name at the project root.
pub const MANIFEST_FILE: &str = "package.json";

/// Runtime dependency group.
pub const RUNTIME_GROUP: &str = "dependencies";

/// Development dependency group. Build plugins are added here.
pub const DEV_GROUP: &str = "devDependencies";

/// Every group whose entries count as "declared".
const DECLARING_GROUPS: [&str; 4] = [
    RUNTIME_GROUP,
    DEV_GROUP,
    "peerDependencies",
    "optionalDependencies",
];

/// An in-memory copy of a project's dependency manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    document: Map<String, Value>,
}

impl Manifest {
    /// Location of the manifest for a project root.
    pub fn path_for(project_path: &Path) -> PathBuf {
        project_path.join(MANIFEST_FILE)
    }

    /// Read and parse the manifest of a project.
    pub fn load(project_path: &Path) -> DepsResult<Self> {
        let path = Self::path_for(project_path);
        let content = std::fs::read_to_string(&path).map_err(|source| DepsError::ManifestRead {
            path: path.clone(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse manifest text that was read from `path`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> DepsResult<Self> {
        let path = path.into();
        let value: Value = serde_json::from_str(content).map_err(|e| DepsError::ManifestParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        match value {
            Value::Object(document) => {
                debug!("Loaded manifest {:?} ({} top-level keys)", path, document.len());
                Ok(Self { path, document })
            }
            _ => Err(DepsError::ManifestParse {
                path,
                message: "top-level value is not an object".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project-level module system from the `type` field.
    pub fn module_system(&self) -> ModuleSystem {
        match self.document.get("type").and_then(Value::as_str) {
            Some("module") => ModuleSystem::Module,
            _ => ModuleSystem::CommonJs,
        }
    }

    /// Whether any dependency group declares `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.declared_version(name).is_some()
    }

    /// Version range declared for `name`, from the first group that has it.
    pub fn declared_version(&self, name: &str) -> Option<&str> {
        DECLARING_GROUPS.iter().find_map(|group| {
            self.document
                .get(*group)
                .and_then(Value::as_object)
                .and_then(|deps| deps.get(name))
                .map(|v| v.as_str().unwrap_or("*"))
        })
    }

    /// Names declared in one group, in document order.
    pub fn group_names(&self, group: &str) -> Vec<String> {
        self.document
            .get(group)
            .and_then(Value::as_object)
            .map(|deps| deps.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Insert `name` into the development group.
    ///
    /// Returns `false` when the development group already has it.
    pub fn add_dev_dependency(&mut self, name: &str, version: &str) -> DepsResult<bool> {
        let group = self
            .document
            .entry(DEV_GROUP.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        let deps = group.as_object_mut().ok_or_else(|| DepsError::ManifestParse {
            path: self.path.clone(),
            message: format!("'{}' is not an object", DEV_GROUP),
        })?;

        if deps.contains_key(name) {
            return Ok(false);
        }

        // Package managers keep each group sorted by name.
        let mut entries: Vec<(String, Value)> = std::mem::take(deps).into_iter().collect();
        entries.push((name.to_string(), Value::String(version.to_string())));
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        deps.extend(entries);

        Ok(true)
    }

    /// Serialize the way npm writes it: two-space indent, trailing newline.
    pub fn to_pretty_string(&self) -> DepsResult<String> {
        let mut out = serde_json::to_string_pretty(&self.document)?;
        out.push('\n');
        Ok(out)
    }

    /// Persist the manifest back to the file it was read from.
    pub fn save(&self) -> DepsResult<()> {
        let content = self.to_pretty_string()?;
        std::fs::write(&self.path, content).map_err(|e| DepsError::ManifestWrite {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        info!("Wrote manifest {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
  "name": "demo",
  "type": "module",
  "dependencies": { "react": "^18.2.0" },
  "devDependencies": { "vite": "^5.0.0", "autoprefixer": "^10.4.16" }
}"#;

    #[test]
    fn test_declares_across_groups() {
        let manifest = Manifest::parse("package.json", SAMPLE).unwrap();
        assert!(manifest.declares("react"));
        assert!(manifest.declares("vite"));
        assert!(!manifest.declares("tailwindcss"));
        assert_eq!(manifest.declared_version("react"), Some("^18.2.0"));
    }

    #[test]
    fn test_module_system_from_type_field() {
        let manifest = Manifest::parse("package.json", SAMPLE).unwrap();
        assert_eq!(manifest.module_system(), ModuleSystem::Module);

        let manifest = Manifest::parse("package.json", r#"{"name":"x"}"#).unwrap();
        assert_eq!(manifest.module_system(), ModuleSystem::CommonJs);
    }

    #[test]
    fn test_add_dev_dependency_keeps_group_sorted() {
        let mut manifest = Manifest::parse("package.json", SAMPLE).unwrap();
        assert!(manifest.add_dev_dependency("tailwindcss", "^3.4.0").unwrap());
        assert!(!manifest.add_dev_dependency("tailwindcss", "^3.4.0").unwrap());

        assert_eq!(
            manifest.group_names(DEV_GROUP),
            vec!["autoprefixer", "tailwindcss", "vite"]
        );
    }

    #[test]
    fn test_add_creates_missing_group() {
        let mut manifest = Manifest::parse("package.json", r#"{"name":"x"}"#).unwrap();
        manifest.add_dev_dependency("postcss", "^8.4.32").unwrap();
        assert!(manifest.declares("postcss"));
    }

    #[test]
    fn test_top_level_order_preserved_on_save() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), SAMPLE).unwrap();

        let mut manifest = Manifest::load(temp.path()).unwrap();
        manifest.add_dev_dependency("daisyui", "^4.4.0").unwrap();
        manifest.save().unwrap();

        let written = std::fs::read_to_string(temp.path().join(MANIFEST_FILE)).unwrap();
        let name_pos = written.find("\"name\"").unwrap();
        let type_pos = written.find("\"type\"").unwrap();
        assert!(name_pos < type_pos);
        assert!(written.ends_with('\n'));
        assert!(written.contains("\"daisyui\": \"^4.4.0\""));
    }

    #[test]
    fn test_missing_manifest_is_read_error() {
        let temp = tempdir().unwrap();
        let err = Manifest::load(temp.path()).unwrap_err();
        assert!(matches!(err, DepsError::ManifestRead { .. }));
        assert!(err.is_manifest_error());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = Manifest::parse("package.json", "{ not json").unwrap_err();
        assert!(matches!(err, DepsError::ManifestParse { .. }));
    }
}
