//! Clap-free settings for the run pipeline.

use validate_domain::RunArgs;
use validate_types::Severity;

/// Settings for one `validate run`.
#[derive(Debug, Clone)]
pub struct RunSettings {
    // Selection
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,

    /// Plugin arguments, already merged across defaults, settings file and CLI.
    pub args: RunArgs,

    // Remediation
    pub fix: bool,
    pub dry_run: bool,

    /// Lowest severity that makes the run fail.
    pub fail_on: Severity,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            exclude_tags: Vec::new(),
            args: RunArgs::new(),
            fix: false,
            dry_run: false,
            fail_on: Severity::Info,
        }
    }
}
