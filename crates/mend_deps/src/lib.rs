//! # mend_deps
//!
//! Dependency resolution and config validation for generated web projects.
//!
//! - **Scanners**: read-only passes over stylesheets and build-tool configs
//! - **Resolver**: merges scanner output and cross-references the manifest
//! - **Config validator**: plugin references plus module-system mismatches
//! - **Rewrite**: mechanical import/require conversion for mismatching files

pub mod config;
pub mod error;
pub mod lexer;
pub mod manifest;
pub mod package;
pub mod parser;
pub mod resolver;
pub mod scanners;

pub use config::{
    apply_rewrite, ConfigScanResult, ConfigValidator, PluginMeta, RewriteOutcome,
};
pub use error::{DepsError, DepsResult};
pub use manifest::{Manifest, DEV_GROUP, MANIFEST_FILE, RUNTIME_GROUP};
pub use parser::{FallbackParser, ImportParser, RegexParser, TreeSitterParser};
pub use resolver::{
    cross_reference, AutoAddReport, DependencyResolver, DependencyScanResult, DependencySummary,
};
pub use scanners::{BuildConfigScanner, Scanner, StyleScanner};
