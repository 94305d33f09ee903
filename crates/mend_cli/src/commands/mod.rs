//! CLI command definitions.
//!
//! Each subcommand exposes one component; `run` drives the full loop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

use mend_core::MendConfig;

pub mod analyze;
pub mod check_config;
pub mod run;
pub mod scan_deps;

/// mend - detect, fix and re-validate broken JavaScript builds
#[derive(Parser)]
#[command(name = "mend")]
#[command(version, about = "mend - detect, fix and re-validate broken JavaScript builds")]
#[command(long_about = r#"
mend finds what keeps a JavaScript project from building or rendering,
applies the fixes that are safe to automate, and re-checks the result
within a bounded number of iterations.

COMMANDS:
  scan-deps     → Find packages referenced by styles and build configs but not declared
  check-config  → Validate build-tool config plugins and module-system syntax
  analyze       → Classify a captured page load (screenshot, console, network)
  run           → Run the detect → fix → re-validate loop

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure (bugs remain)
  4 - Manifest error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to <project>/mend.yaml)
    #[arg(short, long, global = true, env = "MEND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            config: self.config.clone(),
            format: self.format,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find undeclared dependencies
    #[command(name = "scan-deps")]
    ScanDeps(scan_deps::ScanDepsArgs),

    /// Validate build-tool configs
    #[command(name = "check-config")]
    CheckConfig(check_config::CheckConfigArgs),

    /// Analyze a captured page load
    Analyze(analyze::AnalyzeArgs),

    /// Run the repair loop
    Run(run::RunArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
}

impl GlobalArgs {
    pub fn load_config(&self, project: &Path) -> Result<MendConfig> {
        MendConfig::resolve(self.config.as_deref(), project).context("Loading config")
    }

    /// Print the text report, or the value as pretty JSON.
    pub fn emit<T: Serialize>(&self, value: &T, report: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Text => println!("{}", report()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }
}

/// Outcomes that map to dedicated exit codes.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Validation failed: {0}")]
    BugsRemain(String),

    #[error("Manifest unavailable: {0}")]
    ManifestUnavailable(String),

    #[error("Project directory not found: {0}")]
    InvalidPath(PathBuf),
}

/// Canonical project root; it must be an existing directory.
pub fn project_root(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(CommandError::InvalidPath(path.to_path_buf()).into());
    }
    path.canonicalize()
        .with_context(|| format!("Resolving {}", path.display()))
}
