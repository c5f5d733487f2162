use crate::ids::ProblemTypeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The remediator ran and returned a reply (successful or not).
    Attempted,
    /// The remediator raised an error, panicked, or could not be instantiated.
    Failed,
    /// No registered remediator handles the problem type.
    Unfixable,
}

/// Record of one (problem, remediator) attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub problem_type: ProblemTypeId,
    pub problem_key: String,

    /// `None` for unfixable outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediator: Option<String>,

    pub status: OutcomeStatus,
    pub success: bool,
    pub message: String,
    pub dry_run: bool,
    pub locked: bool,

    #[serde(default)]
    pub skipped: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Set when the run was interrupted; such outcomes never count as fixes.
    #[serde(default)]
    pub incomplete: bool,
}

impl RemediationOutcome {
    pub fn unfixable(problem_type: ProblemTypeId, problem_key: impl Into<String>, dry_run: bool) -> Self {
        Self {
            problem_type,
            problem_key: problem_key.into(),
            remediator: None,
            status: OutcomeStatus::Unfixable,
            success: false,
            message: "no remediator available".to_string(),
            dry_run,
            locked: false,
            skipped: false,
            error: None,
            incomplete: false,
        }
    }

    /// True for an outcome that actually resolved its problem.
    pub fn is_fix(&self) -> bool {
        self.status == OutcomeStatus::Attempted
            && self.success
            && self.locked
            && !self.dry_run
            && !self.skipped
            && !self.incomplete
    }
}
