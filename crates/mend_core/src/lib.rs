//! # mend_core
//!
//! Bounded detect, fix and re-validate loop for JavaScript build repair.
//!
//! # Architecture
//!
//! - **Bugs**: every detector output normalized into one tagged record
//! - **Fixes**: manifest updates and module-syntax rewrites, applied one at a time
//! - **Installer**: the external package manager, behind an async trait
//! - **Preview**: captured page-load artifacts for the visual phase
//! - **Orchestrator**: the state machine that ties the phases together
//!
//! # Example
//!
//! ```rust,ignore
//! use mend_core::{MendConfig, Orchestrator};
//!
//! let config = MendConfig::resolve(None, &project)?;
//! let session = Orchestrator::from_config(&config)?.run(&project).await;
//! println!("{}", session.report());
//! ```

pub mod bug;
pub mod config;
pub mod error;
pub mod fix;
pub mod installer;
pub mod mock;
pub mod orchestrator;
pub mod preview;

pub use bug::{Bug, BugKind, CONFIG_VALIDATOR, DEPENDENCY_RESOLVER, VISUAL_DETECTOR};
pub use config::{InstallerConfig, MendConfig, OrchestratorConfig, VisualConfig, CONFIG_FILE};
pub use error::{CoreError, CoreResult};
pub use fix::{FixApplier, FixAttempt};
pub use installer::{CommandInstaller, InstallOutcome, PackageInstaller};
pub use mock::{MockInstall, MockInstaller, MockPreview};
pub use orchestrator::{
    AbortCheck, Iteration, OrchestrationSession, Orchestrator, OrchestratorState, SessionSummary,
    StopReason,
};
pub use preview::{CaptureFileSource, PreviewSource};
