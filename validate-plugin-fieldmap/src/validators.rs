use crate::model::{MappingConfigContext, MappingKey, MappingPair, Section, Side};
use crate::problems::{DuplicateMapping, FieldMissing, RequiredFieldUnmapped, SchemaMismatch};
use crate::{CONFIG_CONTEXT, PAIR_CONTEXT};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use validate_domain::{ContextView, Problem, Validator};

/// Flags (source, target, source type, target type) tuples declared more than once.
pub struct DuplicateMappingValidator;

impl Validator for DuplicateMappingValidator {
    fn validate(&self, contexts: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
        let ctx = contexts.first::<MappingConfigContext>(CONFIG_CONTEXT)?;

        let mut counts: BTreeMap<MappingKey, usize> = BTreeMap::new();
        for entry in &ctx.config.mappings {
            *counts.entry(entry.key()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, count)| {
                Arc::new(DuplicateMapping {
                    config_path: ctx.path.clone(),
                    key,
                    count,
                }) as Arc<dyn Problem>
            })
            .collect())
    }
}

/// Checks every configured field against the catalog on the side it is used.
pub struct FieldExistenceValidator;

impl FieldExistenceValidator {
    fn missing(pair: &MappingPair, side: Side, field: &str, section: Section) -> Arc<dyn Problem> {
        let (project, issue_type) = match side {
            Side::Source => (&pair.entry.source_project, &pair.entry.source_issue_type),
            Side::Target => (&pair.entry.target_project, &pair.entry.target_issue_type),
        };
        Arc::new(FieldMissing {
            side,
            field: field.to_string(),
            section,
            mapping: pair.key(),
            project: project.clone(),
            issue_type: issue_type.clone(),
            config_path: pair.config_path.clone(),
            location: pair.location(section),
        })
    }
}

impl Validator for FieldExistenceValidator {
    fn validate(&self, contexts: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
        let mut problems = Vec::new();

        for pair in contexts.iter_as::<MappingPair>(PAIR_CONTEXT)? {
            let entry = &pair.entry;

            for field in &entry.mirrored_fields {
                if !pair.source_fields.contains(field) {
                    problems.push(Self::missing(pair, Side::Source, field, Section::MirroredFields));
                }
                if !pair.target_fields.contains(field) {
                    problems.push(Self::missing(pair, Side::Target, field, Section::MirroredFields));
                }
            }

            for (source, target) in &entry.mapped_fields {
                if !pair.source_fields.contains(source) {
                    problems.push(Self::missing(pair, Side::Source, source, Section::MappedFields));
                }
                if !pair.target_fields.contains(target) {
                    problems.push(Self::missing(pair, Side::Target, target, Section::MappedFields));
                }
            }

            // Initial values are only ever written on the target side.
            for field in entry.initial_values.keys() {
                if !pair.target_fields.contains(field) {
                    problems.push(Self::missing(pair, Side::Target, field, Section::InitialValues));
                }
            }
        }

        Ok(problems)
    }
}

/// Mirrored fields must carry the same type on both sides unless the target is plain text.
pub struct SchemaCompatibilityValidator;

impl Validator for SchemaCompatibilityValidator {
    fn validate(&self, contexts: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
        let mut problems: Vec<Arc<dyn Problem>> = Vec::new();

        for pair in contexts.iter_as::<MappingPair>(PAIR_CONTEXT)? {
            for field in &pair.entry.mirrored_fields {
                let (Some(source), Some(target)) =
                    (pair.source_fields.find(field), pair.target_fields.find(field))
                else {
                    continue;
                };
                if source.field_type != target.field_type && target.field_type != "string" {
                    problems.push(Arc::new(SchemaMismatch {
                        field: field.clone(),
                        mapping: pair.key(),
                        source_type: source.field_type.clone(),
                        target_type: target.field_type.clone(),
                        location: pair.location(Section::MirroredFields),
                    }));
                }
            }
        }

        Ok(problems)
    }
}

/// Set by the target system on every create; never expected in the config.
const SYSTEM_FIELDS: &[&str] = &["Project", "Issue Type", "Summary", "Reporter"];

/// Every required target field must be mirrored, mapped onto, or given an initial value.
pub struct RequiredFieldCoverageValidator;

impl Validator for RequiredFieldCoverageValidator {
    fn validate(&self, contexts: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
        let mut problems: Vec<Arc<dyn Problem>> = Vec::new();

        for pair in contexts.iter_as::<MappingPair>(PAIR_CONTEXT)? {
            let entry = &pair.entry;
            let covered: BTreeSet<&str> = entry
                .mirrored_fields
                .iter()
                .chain(entry.mapped_fields.values())
                .chain(entry.initial_values.keys())
                .map(String::as_str)
                .collect();

            for field in pair.target_fields.required() {
                if SYSTEM_FIELDS.contains(&field.name.as_str())
                    || covered.contains(field.id.as_str())
                    || covered.contains(field.name.as_str())
                {
                    continue;
                }
                problems.push(Arc::new(RequiredFieldUnmapped {
                    field_id: field.id.clone(),
                    field_name: field.name.clone(),
                    mapping: pair.key(),
                    location: pair.location(Section::InitialValues),
                }));
            }
        }

        Ok(problems)
    }
}
