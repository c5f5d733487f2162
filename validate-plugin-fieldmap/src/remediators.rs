use crate::model::{MappingKey, Section, Side};
use crate::problems::{DuplicateMapping, FieldMissing};
use crate::{ARG_AUDIT_LOG, ARG_MAPPING_CONFIG};
use anyhow::Context;
use camino::Utf8PathBuf;
use chrono::Utc;
use fs_err as fs;
use std::io::Write;
use tracing::{debug, info};
use validate_domain::{ContextView, Problem, RemediationReply, Remediator, RunArgs};

/// Removes offending entries from the mapping config file.
#[derive(Debug)]
pub struct ConfigPruneRemediator {
    config_path: Utf8PathBuf,
}

impl ConfigPruneRemediator {
    pub fn from_args(args: &RunArgs) -> anyhow::Result<Self> {
        let config_path = args
            .get(ARG_MAPPING_CONFIG)
            .map(Utf8PathBuf::from)
            .with_context(|| format!("config-prune needs --{ARG_MAPPING_CONFIG}"))?;
        Ok(Self { config_path })
    }

    fn load(&self) -> anyhow::Result<serde_json::Value> {
        let text = fs::read_to_string(&self.config_path)
            .with_context(|| format!("read mapping config {}", self.config_path))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse mapping config {}", self.config_path))
    }

    fn store(&self, value: &serde_json::Value) -> anyhow::Result<()> {
        let mut text = serde_json::to_string_pretty(value).context("serialize mapping config")?;
        text.push('\n');
        fs::write(&self.config_path, text)
            .with_context(|| format!("write mapping config {}", self.config_path))
    }
}

impl Remediator for ConfigPruneRemediator {
    fn remediate(
        &mut self,
        problem: &dyn Problem,
        _contexts: &ContextView<'_>,
        dry_run: bool,
    ) -> anyhow::Result<RemediationReply> {
        let mut config = self.load()?;

        let (key, removed, what) = if let Some(dup) = problem.downcast_ref::<DuplicateMapping>() {
            (
                &dup.key,
                prune_duplicates(&mut config, &dup.key),
                format!("duplicate mapping {}", dup.key),
            )
        } else if let Some(missing) = problem.downcast_ref::<FieldMissing>() {
            (
                &missing.mapping,
                prune_field(&mut config, missing),
                format!(
                    "'{}' from {} of {}",
                    missing.field, missing.section, missing.mapping
                ),
            )
        } else {
            return Ok(RemediationReply::skipped("not a mapping-config problem"));
        };

        if !has_mapping(&config, key) {
            return Ok(RemediationReply::skipped(format!(
                "mapping {key} is no longer in {}",
                self.config_path
            )));
        }

        // An earlier fix (e.g. the other side of the same field) already did the work.
        if removed == 0 {
            return Ok(RemediationReply::fixed(format!("{what} already removed")));
        }

        if dry_run {
            debug!(path = %self.config_path, removed, "dry run; config untouched");
            return Ok(RemediationReply::fixed(format!("would remove {what}")));
        }

        self.store(&config)?;
        info!(path = %self.config_path, removed, "mapping config pruned");
        Ok(RemediationReply::fixed(format!("removed {what}")))
    }
}

fn has_mapping(config: &serde_json::Value, key: &MappingKey) -> bool {
    config
        .get("mappings")
        .and_then(|m| m.as_array())
        .is_some_and(|mappings| mappings.iter().any(|m| key.matches(m)))
}

/// Drop every occurrence of `key` after the first. Returns the number removed.
fn prune_duplicates(config: &mut serde_json::Value, key: &MappingKey) -> usize {
    let Some(mappings) = config.get_mut("mappings").and_then(|m| m.as_array_mut()) else {
        return 0;
    };
    let before = mappings.len();
    let mut seen = false;
    mappings.retain(|m| {
        if !key.matches(m) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });
    before - mappings.len()
}

/// Remove the missing field from its section in every matching mapping.
fn prune_field(config: &mut serde_json::Value, missing: &FieldMissing) -> usize {
    let Some(mappings) = config.get_mut("mappings").and_then(|m| m.as_array_mut()) else {
        return 0;
    };

    let mut removed = 0;
    for mapping in mappings.iter_mut().filter(|m| missing.mapping.matches(m)) {
        let Some(section) = mapping.get_mut(missing.section.as_str()) else {
            continue;
        };
        match missing.section {
            Section::MirroredFields => {
                if let Some(fields) = section.as_array_mut() {
                    let before = fields.len();
                    fields.retain(|f| f.as_str() != Some(missing.field.as_str()));
                    removed += before - fields.len();
                }
            }
            Section::MappedFields => {
                if let Some(map) = section.as_object_mut() {
                    let before = map.len();
                    map.retain(|source, target| match missing.side {
                        Side::Source => source != &missing.field,
                        Side::Target => target.as_str() != Some(missing.field.as_str()),
                    });
                    removed += before - map.len();
                }
            }
            Section::InitialValues => {
                if let Some(map) = section.as_object_mut()
                    && map.remove(&missing.field).is_some()
                {
                    removed += 1;
                }
            }
        }
    }
    removed
}

/// Appends unresolved problems to a JSON-lines follow-up log. Never claims a problem.
#[derive(Debug)]
pub struct AuditTrailRemediator {
    log_path: Option<Utf8PathBuf>,
}

impl AuditTrailRemediator {
    pub fn from_args(args: &RunArgs) -> Self {
        Self {
            log_path: args.get(ARG_AUDIT_LOG).map(Utf8PathBuf::from),
        }
    }
}

impl Remediator for AuditTrailRemediator {
    fn remediate(
        &mut self,
        problem: &dyn Problem,
        _contexts: &ContextView<'_>,
        dry_run: bool,
    ) -> anyhow::Result<RemediationReply> {
        let Some(path) = &self.log_path else {
            return Ok(RemediationReply::skipped(format!(
                "no --{ARG_AUDIT_LOG} configured"
            )));
        };

        if dry_run {
            return Ok(RemediationReply::passed_on(format!("would record in {path}")));
        }

        let line = serde_json::json!({
            "recorded_at": Utc::now().to_rfc3339(),
            "problem_type": problem.problem_type(),
            "identity_key": problem.identity_key(),
            "severity": problem.severity(),
            "description": problem.description(),
            "location": problem.location(),
        });

        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open audit log {path}"))?;
        writeln!(file, "{line}").with_context(|| format!("append to {path}"))?;

        Ok(RemediationReply::passed_on(format!("recorded in {path}")))
    }
}
