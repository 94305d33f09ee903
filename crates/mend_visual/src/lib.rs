//! # mend_visual
//!
//! Classifies artifacts captured from a page load into severity-tagged findings.
//!
//! - **Artifacts**: screenshot, console entries, uncaught exceptions, failed
//!   sub-resources and the top-level HTTP status
//! - **Blank page**: pixel classifier over the decoded screenshot
//! - **Rules**: ordered first-match classification of console text
//! - **Detector**: combines all of the above into one analysis

pub mod artifacts;
pub mod blank;
pub mod detector;
pub mod error;
pub mod raster;
pub mod rules;

pub use artifacts::{CapturedArtifacts, ConsoleEntry, FailedRequest, RuntimeException, Screenshot};
pub use blank::{analyze_raster, BlankPageAnalysis, BlankPageConfig};
pub use detector::{VisualAnalysis, VisualDetector, VisualSummary};
pub use error::{VisualError, VisualResult};
pub use raster::Raster;
pub use rules::{Classification, ClassificationRule, RuleSet};
