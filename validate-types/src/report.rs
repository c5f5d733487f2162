use crate::exit_codes;
use crate::ids::ProblemTypeId;
use crate::outcome::RemediationOutcome;
use crate::problem::{ProblemRecord, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub status: RunStatus,
    pub exit_code: u8,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_validators: Vec<String>,

    #[serde(default)]
    pub problems: Vec<ProblemRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validator_errors: Vec<ValidatorErrorRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_warnings: Vec<DuplicateWarning>,

    #[serde(default)]
    pub outcomes: Vec<RemediationOutcome>,

    /// Problem types produced by some validator but handled by no remediator, and similar
    /// registry-level notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compatibility_warnings: Vec<String>,

    pub counts: ReportCounts,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FatalError>,
}

impl RunReport {
    pub fn new(tool: ToolInfo, run: RunInfo, status: RunStatus) -> Self {
        Self {
            schema: crate::schema::VALIDATE_REPORT_V1.to_string(),
            tool,
            run,
            status,
            exit_code: status.exit_code(),
            dry_run: false,
            active_validators: Vec::new(),
            problems: Vec::new(),
            validator_errors: Vec::new(),
            duplicate_warnings: Vec::new(),
            outcomes: Vec::new(),
            compatibility_warnings: Vec::new(),
            counts: ReportCounts::default(),
            fatal: None,
        }
    }

    /// Problems not resolved by a completed, non-dry-run, locking fix.
    pub fn remaining_problems(&self) -> impl Iterator<Item = &ProblemRecord> {
        self.problems.iter().filter(|p| {
            !self.outcomes.iter().any(|o| {
                o.is_fix() && o.problem_type == p.problem_type && o.problem_key == p.identity_key
            })
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl RunInfo {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        }
    }

    pub fn finish(&mut self) {
        let now = Utc::now();
        let elapsed = now.signed_duration_since(self.started_at);
        self.ended_at = Some(now);
        self.duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Validators ran and no problem remains.
    Clean,
    /// No validator was selected.
    NothingToValidate,
    /// At least one problem remains at or above the fail-on severity.
    ProblemsFound,
    /// The run aborted before validation could complete.
    Fatal,
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Clean | RunStatus::NothingToValidate => exit_codes::CLEAN,
            RunStatus::ProblemsFound => exit_codes::PROBLEMS_FOUND,
            RunStatus::Fatal => exit_codes::FATAL,
            RunStatus::Interrupted => exit_codes::INTERRUPTED,
        }
    }
}

/// Pipeline stage, used to say where a fatal error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovery,
    Configuration,
    Selection,
    ContextBuild,
    Validation,
    Remediation,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Configuration => "configuration",
            Stage::Selection => "selection",
            Stage::ContextBuild => "context build",
            Stage::Validation => "validation",
            Stage::Remediation => "remediation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatalError {
    pub stage: Stage,
    pub message: String,
}

/// Non-fatal failure of a single validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorErrorRecord {
    pub domain: String,
    pub validator: String,
    pub message: String,
}

/// Emitted once per suppressed duplicate problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateWarning {
    pub problem_type: ProblemTypeId,
    pub identity_key: String,

    /// Validator whose instance was kept.
    pub kept_from: String,

    /// Validator whose instance was dropped.
    pub suppressed_from: String,
}

impl DuplicateWarning {
    /// One validator emitted the same problem more than once.
    pub fn is_repeat(&self) -> bool {
        self.kept_from == self.suppressed_from
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub problems: u64,
    pub errors: u64,
    pub warnings: u64,
    pub info: u64,
    pub remaining: u64,
    pub fixed: u64,
    pub failed: u64,
    pub unfixable: u64,
    pub validator_errors: u64,
}

impl ReportCounts {
    pub fn tally(report: &RunReport) -> Self {
        let count_sev = |s: Severity| report.problems.iter().filter(|p| p.severity == s).count() as u64;
        Self {
            problems: report.problems.len() as u64,
            errors: count_sev(Severity::Error),
            warnings: count_sev(Severity::Warning),
            info: count_sev(Severity::Info),
            remaining: report.remaining_problems().count() as u64,
            fixed: report.outcomes.iter().filter(|o| o.is_fix()).count() as u64,
            failed: report
                .outcomes
                .iter()
                .filter(|o| o.status == crate::OutcomeStatus::Failed)
                .count() as u64,
            unfixable: report
                .outcomes
                .iter()
                .filter(|o| o.status == crate::OutcomeStatus::Unfixable)
                .count() as u64,
            validator_errors: report.validator_errors.len() as u64,
        }
    }
}
