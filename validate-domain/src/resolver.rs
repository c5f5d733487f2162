use crate::args::RunArgs;
use crate::context::ContextCache;
use crate::error::{ConfigError, RunError};
use crate::registry::PluginRegistry;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use validate_types::ContextType;

/// Builds each required context type once per run and keeps the result.
pub struct ContextResolver<'r> {
    registry: &'r PluginRegistry,
    cache: ContextCache,
    builds: BTreeMap<ContextType, u32>,
}

impl<'r> ContextResolver<'r> {
    pub fn new(registry: &'r PluginRegistry) -> Self {
        Self {
            registry,
            cache: ContextCache::new(),
            builds: BTreeMap::new(),
        }
    }

    /// Check that every type in `required` has a provider whose required arguments are
    /// present, without building anything.
    pub fn check(
        &self,
        required: &BTreeMap<ContextType, String>,
        args: &RunArgs,
    ) -> Result<(), ConfigError> {
        for (ct, consumer) in required {
            let Some(provider) = self.registry.provider_for(ct) else {
                return Err(ConfigError::MissingProvider {
                    context_type: ct.clone(),
                    consumer: consumer.clone(),
                });
            };
            if let Some(missing) = provider
                .descriptor
                .args
                .iter()
                .find(|a| a.required && !args.contains(&a.name))
            {
                return Err(ConfigError::MissingArgument {
                    provider: provider.descriptor.name.clone(),
                    arg: missing.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build every type in `required` that is not cached yet, in sorted order.
    ///
    /// `required` maps each type to the first consumer that asked for it, for error messages.
    pub fn resolve(
        &mut self,
        required: &BTreeMap<ContextType, String>,
        args: &RunArgs,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        self.check(required, args)?;

        for ct in required.keys() {
            if self.cache.contains(ct) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(RunError::Interrupted);
            }
            let Some(provider) = self.registry.provider_for(ct) else {
                continue;
            };
            let name = provider.descriptor.name.clone();

            debug!(context_type = %ct, provider = %name, "building context");
            let built = catch_unwind(AssertUnwindSafe(|| provider.instantiate().build(args)));
            *self.builds.entry(ct.clone()).or_default() += 1;

            let values = match built {
                Ok(Ok(values)) => values,
                Ok(Err(err)) => {
                    return Err(RunError::ContextBuild {
                        context_type: ct.clone(),
                        provider: name,
                        message: format!("{err:#}"),
                    });
                }
                Err(payload) => {
                    return Err(RunError::ContextBuild {
                        context_type: ct.clone(),
                        provider: name,
                        message: crate::panic_message(payload.as_ref()),
                    });
                }
            };

            info!(context_type = %ct, provider = %name, count = values.len(), "context ready");
            self.cache.insert(ct.clone(), values);
        }

        Ok(())
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// How many times each type was built this run.
    pub fn build_counts(&self) -> &BTreeMap<ContextType, u32> {
        &self.builds
    }
}

/// Map every required type to the first plugin requiring it.
pub fn required_types<'a>(
    consumers: impl IntoIterator<Item = (&'a str, &'a [ContextType])>,
) -> BTreeMap<ContextType, String> {
    let mut out = BTreeMap::new();
    for (name, types) in consumers {
        for ct in types {
            out.entry(ct.clone()).or_insert_with(|| name.to_string());
        }
    }
    out
}

