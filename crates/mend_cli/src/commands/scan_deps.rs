//! Scan-deps command - Find undeclared dependencies.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::info;

use mend_deps::DependencyResolver;

use super::{project_root, CommandError, GlobalArgs};

#[derive(Args)]
pub struct ScanDepsArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Add missing packages to devDependencies
    #[arg(long)]
    pub fix: bool,
}

pub async fn execute(args: ScanDepsArgs, global: &GlobalArgs) -> Result<()> {
    let project = project_root(&args.path)?;
    info!("Scanning dependencies in {:?}", project);

    let resolver = DependencyResolver::new();
    let scan = resolver
        .scan_project(&project)
        .await
        .context("Dependency scan failed")?;

    if !args.fix || !scan.has_missing() {
        global.emit(&scan, || scan.report())?;
        if scan.has_missing() {
            return Err(CommandError::BugsRemain(format!(
                "{} missing dependency(ies)",
                scan.missing.len()
            ))
            .into());
        }
        return Ok(());
    }

    let added = resolver
        .auto_add_missing(&scan.missing, &project)
        .context("Adding missing dependencies")?;

    let output = json!({ "scan": &scan, "fix": &added });
    global.emit(&output, || format!("{}\n\n{}", scan.report(), added.report()))?;

    if let Some(err) = &added.write_error {
        anyhow::bail!("Manifest write failed: {}", err);
    }
    Ok(())
}
