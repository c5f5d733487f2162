use crate::model::{
    FieldSet, MappingConfigContext, MappingPair, load_field_catalog, load_mapping_config,
};
use crate::{ARG_FIELD_CATALOG, ARG_MAPPING_CONFIG, ARG_SOURCE_PROJECT, ARG_TARGET_PROJECT};
use anyhow::Context;
use camino::Utf8PathBuf;
use tracing::{debug, warn};
use validate_domain::{ContextProvider, ContextValue, RunArgs};

fn path_arg(args: &RunArgs, name: &str) -> anyhow::Result<Utf8PathBuf> {
    args.get(name)
        .map(Utf8PathBuf::from)
        .with_context(|| format!("missing --{name}"))
}

/// An empty filter lets every project through.
fn passes(filter: &[String], project: &str) -> bool {
    filter.is_empty() || filter.iter().any(|p| p == project)
}

/// Provides `fieldmap.config`: the parsed mapping file.
pub struct MappingConfigProvider;

impl ContextProvider for MappingConfigProvider {
    fn build(&self, args: &RunArgs) -> anyhow::Result<Vec<ContextValue>> {
        let path = path_arg(args, ARG_MAPPING_CONFIG)?;
        let config = load_mapping_config(&path)?;
        debug!(path = %path, mappings = config.mappings.len(), "mapping config loaded");
        Ok(vec![ContextValue::new(MappingConfigContext { path, config })])
    }
}

/// Provides `fieldmap.pair`: one context per mapping that passes the project filters.
pub struct MappingPairProvider;

impl ContextProvider for MappingPairProvider {
    fn build(&self, args: &RunArgs) -> anyhow::Result<Vec<ContextValue>> {
        let config_path = path_arg(args, ARG_MAPPING_CONFIG)?;
        let catalog_path = path_arg(args, ARG_FIELD_CATALOG)?;
        let config = load_mapping_config(&config_path)?;
        let catalog = load_field_catalog(&catalog_path)?;

        let source_filter = args.get_all(ARG_SOURCE_PROJECT);
        let target_filter = args.get_all(ARG_TARGET_PROJECT);

        let mut out = Vec::new();
        for (index, entry) in config.mappings.into_iter().enumerate() {
            if !passes(source_filter, &entry.source_project)
                || !passes(target_filter, &entry.target_project)
            {
                debug!(index, mapping = %entry.key(), "mapping filtered out");
                continue;
            }

            let source_fields = catalog
                .fields(&entry.source_project, &entry.source_issue_type)
                .unwrap_or_else(|| {
                    warn!(
                        project = %entry.source_project,
                        issue_type = %entry.source_issue_type,
                        "no catalog entry; treating as having no fields"
                    );
                    FieldSet::default()
                });
            let target_fields = catalog
                .fields(&entry.target_project, &entry.target_issue_type)
                .unwrap_or_else(|| {
                    warn!(
                        project = %entry.target_project,
                        issue_type = %entry.target_issue_type,
                        "no catalog entry; treating as having no fields"
                    );
                    FieldSet::default()
                });

            out.push(ContextValue::new(MappingPair {
                config_path: config_path.clone(),
                index,
                entry,
                source_fields,
                target_fields,
            }));
        }

        debug!(pairs = out.len(), "mapping pairs built");
        Ok(out)
    }
}
