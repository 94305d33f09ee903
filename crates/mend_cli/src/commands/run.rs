//! Run command - Drive the detect, fix and re-validate loop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mend_core::{CaptureFileSource, Orchestrator, StopReason};

use super::{project_root, CommandError, GlobalArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Iteration budget
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Keep iterating while CRITICAL bugs remain
    #[arg(long)]
    pub no_stop_on_critical: bool,

    /// Run the package installer after each manifest fix
    #[arg(long)]
    pub install: bool,

    /// Capture document to analyze on every iteration
    #[arg(long)]
    pub capture: Option<PathBuf>,

    /// Screenshot overriding the one the capture references
    #[arg(long, requires = "capture")]
    pub screenshot: Option<PathBuf>,

    /// Directory for session.json and report.txt
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, global: &GlobalArgs) -> Result<()> {
    let project = project_root(&args.path)?;
    let mut config = global.load_config(&project)?;

    if let Some(max) = args.max_iterations {
        config.orchestrator.max_iterations = max;
    }
    if args.no_stop_on_critical {
        config.orchestrator.stop_on_critical = false;
    }
    if args.install {
        config.orchestrator.run_installer = true;
    }

    let mut orchestrator = Orchestrator::from_config(&config)?;
    if let Some(capture) = &args.capture {
        let mut source = CaptureFileSource::new(capture);
        if let Some(screenshot) = &args.screenshot {
            source = source.with_screenshot(screenshot);
        }
        orchestrator = orchestrator.with_preview(Arc::new(source));
    }

    info!(
        "Running mend on {:?} (max {} iteration(s), installer {})",
        project,
        orchestrator.max_iterations(),
        if config.orchestrator.run_installer {
            config.installer.command_line()
        } else {
            "off".to_string()
        }
    );
    let session = orchestrator.run(&project).await;

    if let Some(dir) = &args.report_dir {
        session
            .write_artifact(dir)
            .with_context(|| format!("Writing session artifacts to {}", dir.display()))?;
    }

    global.emit(&session, || session.report())?;

    match &session.stop_reason {
        Some(StopReason::Converged) => Ok(()),
        Some(StopReason::ManifestUnavailable(err)) => {
            Err(CommandError::ManifestUnavailable(err.clone()).into())
        }
        Some(reason) => Err(CommandError::BugsRemain(reason.to_string()).into()),
        None => Err(CommandError::BugsRemain("session did not finish".to_string()).into()),
    }
}
