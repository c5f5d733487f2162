use crate::ids::ProblemTypeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Problem severity. Ordered `Info < Warning < Error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Serializable snapshot of one collected problem.
///
/// The live problem object stays inside the engine; this is what reporters see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub problem_type: ProblemTypeId,
    pub severity: Severity,

    /// Plugin-defined identity; same key means same underlying issue across runs.
    pub identity_key: String,

    /// sha256 over `problem_type` and `identity_key`, hex encoded.
    pub fingerprint: String,

    pub description: String,
    pub location: String,

    /// Validator that produced the problem.
    pub validator: String,
    pub domain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}
