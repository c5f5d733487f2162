use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a context type, e.g. `fieldmap.pair`.
///
/// Context types are declared explicitly by plugins at registration; the engine never
/// derives them from Rust types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextType(pub String);

impl ContextType {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContextType {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Stable identifier of a problem type, e.g. `fieldmap.schema_mismatch`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemTypeId(pub String);

impl ProblemTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProblemTypeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProblemTypeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
