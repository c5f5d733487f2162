use crate::model::{MappingKey, Section, Side};
use crate::{
    DUPLICATE_MAPPING, FIELD_MISSING_FROM_SOURCE, FIELD_MISSING_FROM_TARGET,
    REQUIRED_FIELD_UNMAPPED, SCHEMA_MISMATCH,
};
use camino::Utf8PathBuf;
use validate_domain::Problem;
use validate_types::{ProblemTypeId, Severity};

/// The same (source, target, types) tuple appears more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMapping {
    pub config_path: Utf8PathBuf,
    pub key: MappingKey,
    pub count: usize,
}

impl Problem for DuplicateMapping {
    fn problem_type(&self) -> ProblemTypeId {
        ProblemTypeId::new(DUPLICATE_MAPPING)
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn identity_key(&self) -> String {
        self.key.to_string()
    }

    fn description(&self) -> String {
        format!("mapping {} is declared {} times", self.key, self.count)
    }

    fn location(&self) -> String {
        self.config_path.to_string()
    }

    fn data(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({ "mapping": self.key, "count": self.count }))
    }
}

/// A configured field does not exist on one side of a mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMissing {
    pub side: Side,
    pub field: String,
    pub section: Section,
    pub mapping: MappingKey,
    pub project: String,
    pub issue_type: String,
    pub config_path: Utf8PathBuf,
    pub location: String,
}

impl Problem for FieldMissing {
    fn problem_type(&self) -> ProblemTypeId {
        match self.side {
            Side::Source => ProblemTypeId::new(FIELD_MISSING_FROM_SOURCE),
            Side::Target => ProblemTypeId::new(FIELD_MISSING_FROM_TARGET),
        }
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn identity_key(&self) -> String {
        format!("{}:{}:{}", self.mapping, self.section, self.field)
    }

    fn description(&self) -> String {
        format!(
            "field '{}' ({}) does not exist on {}/{}",
            self.field, self.section, self.project, self.issue_type
        )
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn data(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "side": self.side,
            "field": self.field,
            "section": self.section,
            "mapping": self.mapping,
        }))
    }
}

/// A mirrored field has different types on each side and the target cannot take text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub field: String,
    pub mapping: MappingKey,
    pub source_type: String,
    pub target_type: String,
    pub location: String,
}

impl Problem for SchemaMismatch {
    fn problem_type(&self) -> ProblemTypeId {
        ProblemTypeId::new(SCHEMA_MISMATCH)
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn identity_key(&self) -> String {
        format!("{}:{}", self.mapping, self.field)
    }

    fn description(&self) -> String {
        format!(
            "mirrored field '{}' is '{}' on {} but '{}' on {}",
            self.field,
            self.source_type,
            self.mapping.source_project,
            self.target_type,
            self.mapping.target_project
        )
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn data(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "field": self.field,
            "source_type": self.source_type,
            "target_type": self.target_type,
        }))
    }
}

/// A field the target requires on create is neither mirrored, mapped nor given an
/// initial value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredFieldUnmapped {
    pub field_id: String,
    pub field_name: String,
    pub mapping: MappingKey,
    pub location: String,
}

impl Problem for RequiredFieldUnmapped {
    fn problem_type(&self) -> ProblemTypeId {
        ProblemTypeId::new(REQUIRED_FIELD_UNMAPPED)
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn identity_key(&self) -> String {
        format!("{}:{}", self.mapping, self.field_id)
    }

    fn description(&self) -> String {
        format!(
            "field '{}' is required on {}/{} but gets no value from the mapping",
            self.field_name, self.mapping.target_project, self.mapping.target_issue_type
        )
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn data(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "field_id": self.field_id,
            "field_name": self.field_name,
            "mapping": self.mapping,
        }))
    }
}
