//! Analyze command - Classify a captured page load.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mend_visual::{CapturedArtifacts, VisualDetector};

use super::{CommandError, GlobalArgs};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Capture document written by the browser automation
    #[arg(long)]
    pub capture: PathBuf,

    /// Screenshot overriding the one the capture references
    #[arg(long)]
    pub screenshot: Option<PathBuf>,
}

pub async fn execute(args: AnalyzeArgs, global: &GlobalArgs) -> Result<()> {
    info!("Analyzing capture {:?}", args.capture);
    let config = global.load_config(&std::env::current_dir()?)?;

    let mut artifacts = CapturedArtifacts::load(&args.capture)
        .with_context(|| format!("Reading capture {}", args.capture.display()))?;
    if let Some(screenshot) = &args.screenshot {
        artifacts = artifacts
            .with_screenshot_file(screenshot)
            .with_context(|| format!("Reading screenshot {}", screenshot.display()))?;
    }

    let detector = VisualDetector::new()?.with_blank_config(config.visual.blank_page());
    let analysis = detector.analyze_results(&artifacts);

    global.emit(&analysis, || analysis.report())?;

    if analysis.should_stop {
        return Err(CommandError::BugsRemain(format!(
            "{} finding(s), aggregate severity {}",
            analysis.summary.total, analysis.severity
        ))
        .into());
    }
    Ok(())
}
