use sha2::{Digest, Sha256};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use validate_types::{ProblemRecord, ProblemTypeId, Severity};

/// A self-contained, immutable report of one issue.
///
/// Problems are shared behind `Arc` between the validator runner, the remediator runner and
/// the report; nothing gets mutable access after a validator returns them. Remediators that
/// need the concrete shape use `<dyn Problem>::downcast_ref`.
pub trait Problem: fmt::Debug + Send + Sync + Any {
    fn problem_type(&self) -> ProblemTypeId;

    fn severity(&self) -> Severity;

    /// Stable key: the same underlying issue yields the same key across runs.
    fn identity_key(&self) -> String;

    fn description(&self) -> String;

    fn location(&self) -> String {
        String::new()
    }

    /// Structured payload published in the JSON report.
    fn data(&self) -> Option<serde_json::Value> {
        None
    }
}

impl dyn Problem {
    pub fn downcast_ref<T: Problem>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Generic problem for plugins that do not need a bespoke type.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicProblem {
    pub problem_type: ProblemTypeId,
    pub severity: Severity,
    pub identity_key: String,
    pub description: String,
    pub location: String,
    pub data: Option<serde_json::Value>,
}

impl BasicProblem {
    pub fn new(
        problem_type: impl Into<ProblemTypeId>,
        severity: Severity,
        identity_key: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            problem_type: problem_type.into(),
            severity,
            identity_key: identity_key.into(),
            description: description.into(),
            location: String::new(),
            data: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl Problem for BasicProblem {
    fn problem_type(&self) -> ProblemTypeId {
        self.problem_type.clone()
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn identity_key(&self) -> String {
        self.identity_key.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn data(&self) -> Option<serde_json::Value> {
        self.data.clone()
    }
}

/// Deduplication key: `(problem type, identity key)`.
pub type DedupKey = (ProblemTypeId, String);

/// A problem annotated with the validator and domain that produced it.
#[derive(Debug, Clone)]
pub struct CollectedProblem {
    pub problem: Arc<dyn Problem>,
    pub problem_type: ProblemTypeId,
    pub identity_key: String,
    pub validator: String,
    pub domain: String,
}

impl CollectedProblem {
    pub fn new(
        problem: Arc<dyn Problem>,
        validator: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        let problem_type = problem.problem_type();
        let identity_key = problem.identity_key();
        Self {
            problem,
            problem_type,
            identity_key,
            validator: validator.into(),
            domain: domain.into(),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        (self.problem_type.clone(), self.identity_key.clone())
    }

    pub fn severity(&self) -> Severity {
        self.problem.severity()
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.problem_type, &self.identity_key)
    }

    pub fn to_record(&self) -> ProblemRecord {
        ProblemRecord {
            problem_type: self.problem_type.clone(),
            severity: self.problem.severity(),
            identity_key: self.identity_key.clone(),
            fingerprint: self.fingerprint(),
            description: self.problem.description(),
            location: self.problem.location(),
            validator: self.validator.clone(),
            domain: self.domain.clone(),
            data: self.problem.data(),
        }
    }
}

/// sha256 over `"{problem_type}\n{identity_key}"`, hex encoded.
pub fn fingerprint(problem_type: &ProblemTypeId, identity_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(problem_type.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(identity_key.as_bytes());
    hex::encode(hasher.finalize())
}
