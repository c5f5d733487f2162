//! Shared DTOs (schemas-as-code) for the validate workspace.
//!
//! # Design constraints
//! - These types are serialized into the machine-readable run report.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod ids;
pub mod outcome;
pub mod problem;
pub mod report;

pub use ids::{ContextType, ProblemTypeId};
pub use outcome::{OutcomeStatus, RemediationOutcome};
pub use problem::{ProblemRecord, Severity};
pub use report::{
    DuplicateWarning, FatalError, ReportCounts, RunInfo, RunReport, RunStatus, Stage, ToolInfo,
    ValidatorErrorRecord,
};

/// Schema identifiers.
pub mod schema {
    pub const VALIDATE_REPORT_V1: &str = "validate.report.v1";
}

/// Process exit codes of the `validate` binary.
pub mod exit_codes {
    pub const CLEAN: u8 = 0;
    pub const PROBLEMS_FOUND: u8 = 1;
    pub const FATAL: u8 = 2;
    pub const INTERRUPTED: u8 = 130;
}
