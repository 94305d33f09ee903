//! Check-config command - Validate build-tool configs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mend_deps::ConfigValidator;

use super::{project_root, CommandError, GlobalArgs};

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub async fn execute(args: CheckConfigArgs, global: &GlobalArgs) -> Result<()> {
    let project = project_root(&args.path)?;
    info!("Checking build configs in {:?}", project);

    let result = ConfigValidator::new()
        .detect_config_plugins(&project)
        .context("Config validation failed")?;

    global.emit(&result, || result.report())?;

    if !result.is_clean() {
        return Err(CommandError::BugsRemain(format!(
            "{} missing plugin(s), {} module-system issue(s)",
            result.missing.len(),
            result.module_system_issues.len()
        ))
        .into());
    }
    Ok(())
}
