//! Session configuration, loaded from `mend.yaml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mend_visual::BlankPageConfig;

use crate::error::{CoreError, CoreResult};

/// Config file looked up at the project root.
pub const CONFIG_FILE: &str = "mend.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MendConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub installer: InstallerConfig,
    #[serde(default)]
    pub visual: VisualConfig,
}

/// Iteration loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on iterations per session
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Stop as soon as a CRITICAL bug is left unresolved
    #[serde(default = "default_true")]
    pub stop_on_critical: bool,
    /// Run the package installer after each manifest fix
    #[serde(default)]
    pub run_installer: bool,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            stop_on_critical: true,
            run_installer: false,
        }
    }
}

/// External package-manager invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "npm".to_string()
}

fn default_args() -> Vec<String> {
    vec!["install".to_string()]
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl InstallerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The command line, for logs and reports.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Blank-page thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_blank_threshold")]
    pub blank_threshold: f64,
    #[serde(default = "default_min_content_pixels")]
    pub min_content_pixels: u64,
    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: u8,
}

fn default_blank_threshold() -> f64 {
    0.95
}

fn default_min_content_pixels() -> u64 {
    1000
}

fn default_color_tolerance() -> u8 {
    10
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            blank_threshold: default_blank_threshold(),
            min_content_pixels: default_min_content_pixels(),
            color_tolerance: default_color_tolerance(),
        }
    }
}

impl VisualConfig {
    pub fn blank_page(&self) -> BlankPageConfig {
        BlankPageConfig::default()
            .with_threshold(self.blank_threshold)
            .with_min_content_pixels(self.min_content_pixels)
            .with_tolerance(self.color_tolerance)
    }
}

impl MendConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> CoreResult<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(CoreError::from)
    }

    pub fn to_yaml(&self) -> CoreResult<String> {
        serde_yaml::to_string(self).map_err(CoreError::from)
    }

    /// Explicit file if given, else `<project>/mend.yaml` if present, else defaults.
    pub fn resolve(explicit: Option<&Path>, project_path: &Path) -> CoreResult<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {:?}", path);
            return Self::from_file(path);
        }

        let candidate: PathBuf = project_path.join(CONFIG_FILE);
        if candidate.is_file() {
            info!("Loading config from {:?}", candidate);
            return Self::from_file(&candidate);
        }

        debug!("No {} in {:?}, using defaults", CONFIG_FILE, project_path);
        Ok(Self::default())
    }
}
