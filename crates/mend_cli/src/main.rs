//! mend CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure (bugs remain)
//! - 4: Manifest error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mend_core::CoreError;
use mend_deps::DepsError;

mod commands;

use commands::{Cli, CommandError, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const MANIFEST_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mend={},warn", level)));

    // A second init only happens under test harnesses; keep going.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let global = cli.global();
    let result = match cli.command {
        Commands::ScanDeps(args) => commands::scan_deps::execute(args, &global).await,
        Commands::CheckConfig(args) => commands::check_config::execute(args, &global).await,
        Commands::Analyze(args) => commands::analyze::execute(args, &global).await,
        Commands::Run(args) => commands::run::execute(args, &global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CommandError>() {
            return match err {
                CommandError::BugsRemain(_) => ExitCodes::VALIDATION_FAILURE,
                CommandError::ManifestUnavailable(_) => ExitCodes::MANIFEST_ERROR,
                CommandError::InvalidPath(_) => ExitCodes::INVALID_ARGS,
            };
        }
        if let Some(err) = cause.downcast_ref::<DepsError>() {
            if err.is_manifest_error() {
                return ExitCodes::MANIFEST_ERROR;
            }
        }
        if let Some(CoreError::Config { .. }) = cause.downcast_ref::<CoreError>() {
            return ExitCodes::INVALID_ARGS;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
