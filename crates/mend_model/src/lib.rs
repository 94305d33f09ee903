//! # mend_model
//!
//! Records shared by the mend detectors and the orchestration loop.
//!
//! - **Severity**: the three-tier severity scale plus the aggregate `PASS` level
//! - **Dependency records**: packages referenced by the project and where
//! - **Module-system records**: config files written in the wrong import style
//! - **Findings**: classified observations from a captured page load

pub mod models;
pub mod severity;

pub use models::{
    ConversionDirection, DetectedDependency, Finding, FindingType, ModuleSystem,
    ModuleSystemIssue, ScanNote, UsageLocation, LATEST_VERSION,
};
pub use severity::{AggregateSeverity, Severity};
