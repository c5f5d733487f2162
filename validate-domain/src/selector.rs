use crate::args::RunArgs;
use crate::registry::{PluginRegistry, ValidatorEntry};
use std::collections::BTreeSet;
use tracing::debug;

/// How the active validator set is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Validators sharing at least one tag with the filter.
    Tags(BTreeSet<String>),
    /// Validators whose providers received caller-supplied arguments.
    Auto,
}

impl Selection {
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            Selection::Auto
        } else {
            Selection::Tags(tags)
        }
    }
}

/// Pick the active validators, in registration order.
pub fn select<'r>(
    registry: &'r PluginRegistry,
    selection: &Selection,
    exclude_tags: &BTreeSet<String>,
    args: &RunArgs,
) -> Vec<&'r ValidatorEntry> {
    registry
        .validators()
        .iter()
        .filter(|v| match selection {
            Selection::Tags(filter) => !v.descriptor.tags.is_disjoint(filter),
            Selection::Auto => auto_detected(registry, v, args),
        })
        .filter(|v| {
            let excluded = !v.descriptor.tags.is_disjoint(exclude_tags);
            if excluded {
                debug!(validator = %v.descriptor.name, "excluded by tag");
            }
            !excluded
        })
        .collect()
}

/// Active iff, for every required context type, the bound provider declares arguments,
/// at least one of them was supplied by the caller, and all required ones are present.
fn auto_detected(registry: &PluginRegistry, validator: &ValidatorEntry, args: &RunArgs) -> bool {
    validator.descriptor.required_context_types.iter().all(|ct| {
        let Some(provider) = registry.provider_for(ct) else {
            debug!(validator = %validator.descriptor.name, context_type = %ct, "no provider; not auto-detected");
            return false;
        };
        let declared = &provider.descriptor.args;
        !declared.is_empty()
            && declared.iter().any(|a| args.is_supplied(&a.name))
            && declared
                .iter()
                .filter(|a| a.required)
                .all(|a| args.is_supplied(&a.name))
    })
}
