use crate::args::RunArgs;
use crate::descriptor::{ArgSpec, CapabilityDescriptor, PluginKind};
use crate::error::ConfigError;
use crate::plugin::{
    ContextProvider, PluginEntry, PluginFactory, ProviderFactory, Remediator, RemediatorFactory,
    Validator, ValidatorFactory,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use validate_types::{ContextType, ProblemTypeId};

pub struct ProviderEntry {
    pub descriptor: CapabilityDescriptor,
    factory: ProviderFactory,
}

impl ProviderEntry {
    pub fn instantiate(&self) -> Box<dyn ContextProvider> {
        (self.factory)()
    }
}

pub struct ValidatorEntry {
    pub descriptor: CapabilityDescriptor,
    factory: ValidatorFactory,
}

impl ValidatorEntry {
    pub fn instantiate(&self) -> Box<dyn Validator> {
        (self.factory)()
    }
}

pub struct RemediatorEntry {
    pub descriptor: CapabilityDescriptor,
    factory: RemediatorFactory,
}

impl RemediatorEntry {
    pub fn instantiate(&self, args: &RunArgs) -> anyhow::Result<Box<dyn Remediator>> {
        (self.factory)(args)
    }
}

/// Validated set of plugins for one process. Each list keeps registration order.
#[derive(Default)]
pub struct PluginRegistry {
    providers: Vec<ProviderEntry>,
    validators: Vec<ValidatorEntry>,
    remediators: Vec<RemediatorEntry>,
    bindings: BTreeMap<ContextType, usize>,
}

impl PluginRegistry {
    /// Check every descriptor and binding, failing on the first inconsistency.
    pub fn from_entries(entries: Vec<PluginEntry>) -> Result<Self, ConfigError> {
        let mut registry = PluginRegistry::default();
        let mut names: BTreeSet<(PluginKind, String)> = BTreeSet::new();

        for entry in entries {
            let PluginEntry {
                descriptor,
                factory,
            } = entry;
            descriptor.check()?;

            if descriptor.kind != factory.kind() {
                return Err(ConfigError::KindMismatch {
                    plugin: descriptor.name.clone(),
                    declared: descriptor.kind,
                    registered: factory.kind(),
                });
            }

            if !names.insert((descriptor.kind, descriptor.name.clone())) {
                return Err(ConfigError::DuplicateName {
                    kind: descriptor.kind,
                    name: descriptor.name.clone(),
                });
            }

            debug!(plugin = %descriptor.name, kind = %descriptor.kind, "registering plugin");

            match factory {
                PluginFactory::Provider(factory) => {
                    if let Some(ct) = descriptor.provided_context_type.clone() {
                        if let Some(&existing) = registry.bindings.get(&ct) {
                            return Err(ConfigError::AmbiguousProvider {
                                context_type: ct,
                                first: registry.providers[existing].descriptor.name.clone(),
                                second: descriptor.name.clone(),
                            });
                        }
                        registry.bindings.insert(ct, registry.providers.len());
                    }
                    registry.providers.push(ProviderEntry {
                        descriptor,
                        factory,
                    });
                }
                PluginFactory::Validator(factory) => registry.validators.push(ValidatorEntry {
                    descriptor,
                    factory,
                }),
                PluginFactory::Remediator(factory) => {
                    registry.remediators.push(RemediatorEntry {
                        descriptor,
                        factory,
                    })
                }
            }
        }

        Ok(registry)
    }

    pub fn providers(&self) -> &[ProviderEntry] {
        &self.providers
    }

    pub fn validators(&self) -> &[ValidatorEntry] {
        &self.validators
    }

    pub fn remediators(&self) -> &[RemediatorEntry] {
        &self.remediators
    }

    pub fn provider_for(&self, context_type: &ContextType) -> Option<&ProviderEntry> {
        self.bindings
            .get(context_type)
            .and_then(|&i| self.providers.get(i))
    }

    /// Every descriptor, providers first, then validators, then remediators.
    pub fn descriptors(&self) -> impl Iterator<Item = &CapabilityDescriptor> {
        self.providers
            .iter()
            .map(|p| &p.descriptor)
            .chain(self.validators.iter().map(|v| &v.descriptor))
            .chain(self.remediators.iter().map(|r| &r.descriptor))
    }

    pub fn arg_specs(&self) -> impl Iterator<Item = &ArgSpec> {
        self.descriptors().flat_map(|d| d.args.iter())
    }

    /// Cross-plugin coverage notes. Never fatal.
    pub fn compatibility(&self) -> CompatibilityReport {
        let produced: BTreeSet<ProblemTypeId> = self
            .validators
            .iter()
            .flat_map(|v| v.descriptor.produced_problem_types.iter().cloned())
            .collect();
        let handled: BTreeSet<ProblemTypeId> = self
            .remediators
            .iter()
            .flat_map(|r| r.descriptor.handled_problem_types.iter().cloned())
            .collect();

        let mut unprovided: BTreeMap<ContextType, Vec<String>> = BTreeMap::new();
        let consumers = self
            .validators
            .iter()
            .map(|v| &v.descriptor)
            .chain(self.remediators.iter().map(|r| &r.descriptor));
        for d in consumers {
            for ct in &d.required_context_types {
                if !self.bindings.contains_key(ct) {
                    unprovided.entry(ct.clone()).or_default().push(d.name.clone());
                }
            }
        }

        CompatibilityReport {
            unhandled: produced.difference(&handled).cloned().collect(),
            unproduced: handled.difference(&produced).cloned().collect(),
            unprovided,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatibilityReport {
    /// Produced by some validator, handled by no remediator.
    pub unhandled: BTreeSet<ProblemTypeId>,
    /// Handled by some remediator, produced by no validator.
    pub unproduced: BTreeSet<ProblemTypeId>,
    /// Required context types nobody provides, with their consumers.
    pub unprovided: BTreeMap<ContextType, Vec<String>>,
}

impl CompatibilityReport {
    pub fn is_clean(&self) -> bool {
        self.unhandled.is_empty() && self.unproduced.is_empty() && self.unprovided.is_empty()
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for pt in &self.unhandled {
            out.push(format!("problem type '{pt}' has no remediator"));
        }
        for pt in &self.unproduced {
            out.push(format!("problem type '{pt}' is handled but never produced"));
        }
        for (ct, consumers) in &self.unprovided {
            out.push(format!(
                "context type '{ct}' has no provider (required by {})",
                consumers.join(", ")
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextValue, ContextView};
    use crate::plugin::RemediationReply;
    use crate::problem::Problem;
    use std::sync::Arc;

    struct NullProvider;
    impl ContextProvider for NullProvider {
        fn build(&self, _args: &RunArgs) -> anyhow::Result<Vec<ContextValue>> {
            Ok(Vec::new())
        }
    }

    struct NullValidator;
    impl Validator for NullValidator {
        fn validate(&self, _: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
            Ok(Vec::new())
        }
    }

    struct NullRemediator;
    impl Remediator for NullRemediator {
        fn remediate(
            &mut self,
            _: &dyn Problem,
            _: &ContextView<'_>,
            _: bool,
        ) -> anyhow::Result<RemediationReply> {
            Ok(RemediationReply::skipped("noop"))
        }
    }

    fn provider(name: &str, ct: &str) -> PluginEntry {
        PluginEntry::provider(CapabilityDescriptor::provider(name, "t", ct), || NullProvider)
    }

    fn validator(name: &str, ct: &str, produces: &str) -> PluginEntry {
        PluginEntry::validator(
            CapabilityDescriptor::validator(name, "t")
                .requires(ct)
                .produces(produces),
            || NullValidator,
        )
    }

    fn remediator(name: &str, handles: &str) -> PluginEntry {
        PluginEntry::remediator(
            CapabilityDescriptor::remediator(name, "t").handles(handles),
            |_| Ok(NullRemediator),
        )
    }

    #[test]
    fn two_providers_for_one_type_is_ambiguous() {
        let err = PluginRegistry::from_entries(vec![provider("a", "x"), provider("b", "x")])
            .err()
            .expect("ambiguous");
        assert_eq!(
            err,
            ConfigError::AmbiguousProvider {
                context_type: ContextType::new("x"),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_names_within_a_kind_are_rejected() {
        let err = PluginRegistry::from_entries(vec![
            validator("v", "x", "p"),
            validator("v", "x", "q"),
        ])
        .err()
        .expect("duplicate");
        assert!(matches!(err, ConfigError::DuplicateName { .. }));
    }

    #[test]
    fn same_name_across_kinds_is_allowed() {
        let registry = PluginRegistry::from_entries(vec![
            provider("same", "x"),
            validator("same", "x", "p"),
            remediator("same", "p"),
        ])
        .expect("registry");
        assert_eq!(registry.descriptors().count(), 3);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let entry = PluginEntry::validator(
            CapabilityDescriptor::remediator("r", "t").handles("p"),
            || NullValidator,
        );
        let err = PluginRegistry::from_entries(vec![entry]).err().expect("mismatch");
        assert!(matches!(err, ConfigError::KindMismatch { .. }));
    }

    #[test]
    fn compatibility_lists_uncovered_types() {
        let registry = PluginRegistry::from_entries(vec![
            provider("px", "x"),
            validator("v1", "x", "p"),
            validator("v2", "y", "q"),
            remediator("r1", "p"),
            remediator("r2", "z"),
        ])
        .expect("registry");

        let report = registry.compatibility();
        assert!(!report.is_clean());
        assert_eq!(
            report.unhandled.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            vec!["q"]
        );
        assert_eq!(
            report.unproduced.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            vec!["z"]
        );
        assert_eq!(
            report.unprovided.get(&ContextType::new("y")),
            Some(&vec!["v2".to_string()])
        );
        assert_eq!(report.warnings().len(), 3);
    }
}
