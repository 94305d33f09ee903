//! Config file validation: plugin references and module-system consistency.

pub mod module_system;
pub mod rewrite;
pub mod validator;

pub use module_system::{check_file, detect_markers, expected_system, SyntaxMarkers};
pub use rewrite::{apply_rewrite, rewrite_source, Rewrite, RewriteOutcome};
pub use validator::{ConfigScanResult, ConfigSummary, ConfigValidator, PluginMeta};
