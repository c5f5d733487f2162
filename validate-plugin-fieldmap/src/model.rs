//! On-disk formats: the mapping config and the field-catalog snapshot.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source_project: String,
    pub target_project: String,
    pub source_issue_type: String,
    pub target_issue_type: String,

    #[serde(default)]
    pub mirrored_fields: Vec<String>,

    /// Source field -> target field.
    #[serde(default)]
    pub mapped_fields: BTreeMap<String, String>,

    /// Target field -> value set on creation.
    #[serde(default)]
    pub initial_values: BTreeMap<String, serde_json::Value>,
}

impl MappingEntry {
    pub fn key(&self) -> MappingKey {
        MappingKey {
            source_project: self.source_project.clone(),
            target_project: self.target_project.clone(),
            source_issue_type: self.source_issue_type.clone(),
            target_issue_type: self.target_issue_type.clone(),
        }
    }
}

/// The (source, target, source type, target type) tuple identifying a mapping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MappingKey {
    pub source_project: String,
    pub target_project: String,
    pub source_issue_type: String,
    pub target_issue_type: String,
}

impl MappingKey {
    /// True when the JSON object describes this mapping.
    pub fn matches(&self, entry: &serde_json::Value) -> bool {
        let field = |name: &str| entry.get(name).and_then(|v| v.as_str());
        field("source_project") == Some(self.source_project.as_str())
            && field("target_project") == Some(self.target_project.as_str())
            && field("source_issue_type") == Some(self.source_issue_type.as_str())
            && field("target_issue_type") == Some(self.target_issue_type.as_str())
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}:{}->{}",
            self.source_project, self.target_project, self.source_issue_type, self.target_issue_type
        )
    }
}

/// Which config section a field reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    MirroredFields,
    MappedFields,
    InitialValues,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::MirroredFields => "mirrored_fields",
            Section::MappedFields => "mapped_fields",
            Section::InitialValues => "initial_values",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,

    /// The target project refuses to create an issue without this field.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// `{"projects": {PROJECT: {ISSUE_TYPE: [field, ...]}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    #[serde(default)]
    pub projects: BTreeMap<String, BTreeMap<String, Vec<CatalogField>>>,
}

impl FieldCatalog {
    pub fn fields(&self, project: &str, issue_type: &str) -> Option<FieldSet> {
        self.projects
            .get(project)
            .and_then(|types| types.get(issue_type))
            .map(|fields| FieldSet {
                fields: fields.clone(),
            })
    }
}

/// Fields available on one project/issue type. Lookups match by id or by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub fields: Vec<CatalogField>,
}

impl FieldSet {
    pub fn find(&self, id_or_name: &str) -> Option<&CatalogField> {
        self.fields
            .iter()
            .find(|f| f.id == id_or_name)
            .or_else(|| self.fields.iter().find(|f| f.name == id_or_name))
    }

    pub fn contains(&self, id_or_name: &str) -> bool {
        self.find(id_or_name).is_some()
    }

    pub fn required(&self) -> impl Iterator<Item = &CatalogField> {
        self.fields.iter().filter(|f| f.required)
    }
}

pub fn load_mapping_config(path: &Utf8Path) -> anyhow::Result<MappingConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("read mapping config {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parse mapping config {}", path))
}

pub fn load_field_catalog(path: &Utf8Path) -> anyhow::Result<FieldCatalog> {
    let text = fs::read_to_string(path).with_context(|| format!("read field catalog {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parse field catalog {}", path))
}

/// Context value for `fieldmap.config`.
#[derive(Debug, Clone)]
pub struct MappingConfigContext {
    pub path: Utf8PathBuf,
    pub config: MappingConfig,
}

/// Context value for `fieldmap.pair`: one mapping joined with both field sets.
#[derive(Debug, Clone)]
pub struct MappingPair {
    pub config_path: Utf8PathBuf,
    pub index: usize,
    pub entry: MappingEntry,
    pub source_fields: FieldSet,
    pub target_fields: FieldSet,
}

impl MappingPair {
    pub fn key(&self) -> MappingKey {
        self.entry.key()
    }

    pub fn location(&self, section: Section) -> String {
        format!("{}#mappings[{}].{}", self.config_path, self.index, section)
    }
}
