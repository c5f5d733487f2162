//! The three plugin contracts and their registration entries.

use crate::args::RunArgs;
use crate::context::{ContextValue, ContextView};
use crate::descriptor::{CapabilityDescriptor, PluginKind};
use crate::problem::Problem;
use std::fmt;
use std::sync::Arc;

/// Builds all values of one context type.
pub trait ContextProvider: Send + Sync {
    fn build(&self, args: &RunArgs) -> anyhow::Result<Vec<ContextValue>>;
}

/// Inspects contexts and reports problems. Never fixes anything.
pub trait Validator: Send + Sync {
    fn validate(&self, contexts: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>>;
}

/// Attempts to resolve problems of the types it handles.
pub trait Remediator: Send {
    /// Whether to attempt `problem`. `attempted_by` names the remediators that already
    /// recorded an outcome for it this run, in order. Declining records nothing.
    fn should_remediate(&self, _problem: &dyn Problem, _attempted_by: &[String]) -> bool {
        true
    }

    fn remediate(
        &mut self,
        problem: &dyn Problem,
        contexts: &ContextView<'_>,
        dry_run: bool,
    ) -> anyhow::Result<RemediationReply>;
}

/// What a remediator reports for one attempt. The core stamps the dry-run flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationReply {
    pub success: bool,
    pub message: String,

    /// Claims the problem: no later remediator sees it.
    pub locked: bool,
    pub skipped: bool,
    pub error: Option<String>,
}

impl RemediationReply {
    /// Resolved (or, under dry-run, would be resolved). Locks the problem.
    pub fn fixed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            locked: true,
            skipped: false,
            error: None,
        }
    }

    /// Did something useful but leaves the problem for later remediators.
    pub fn passed_on(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            locked: false,
            skipped: false,
            error: None,
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            locked: false,
            skipped: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            locked: false,
            skipped: false,
            error: Some(error.into()),
        }
    }
}

pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn ContextProvider> + Send + Sync>;
pub type ValidatorFactory = Arc<dyn Fn() -> Box<dyn Validator> + Send + Sync>;
pub type RemediatorFactory =
    Arc<dyn Fn(&RunArgs) -> anyhow::Result<Box<dyn Remediator>> + Send + Sync>;

#[derive(Clone)]
pub enum PluginFactory {
    Provider(ProviderFactory),
    Validator(ValidatorFactory),
    Remediator(RemediatorFactory),
}

impl PluginFactory {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginFactory::Provider(_) => PluginKind::Provider,
            PluginFactory::Validator(_) => PluginKind::Validator,
            PluginFactory::Remediator(_) => PluginKind::Remediator,
        }
    }
}

/// What discovery hands to the core: descriptor plus factory.
#[derive(Clone)]
pub struct PluginEntry {
    pub descriptor: CapabilityDescriptor,
    pub factory: PluginFactory,
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.descriptor.name)
            .field("kind", &self.factory.kind())
            .finish_non_exhaustive()
    }
}

impl PluginEntry {
    pub fn provider<P, F>(descriptor: CapabilityDescriptor, factory: F) -> Self
    where
        P: ContextProvider + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        Self {
            descriptor,
            factory: PluginFactory::Provider(Arc::new(move || {
                Box::new(factory()) as Box<dyn ContextProvider>
            })),
        }
    }

    pub fn validator<V, F>(descriptor: CapabilityDescriptor, factory: F) -> Self
    where
        V: Validator + 'static,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            descriptor,
            factory: PluginFactory::Validator(Arc::new(move || {
                Box::new(factory()) as Box<dyn Validator>
            })),
        }
    }

    pub fn remediator<R, F>(descriptor: CapabilityDescriptor, factory: F) -> Self
    where
        R: Remediator + 'static,
        F: Fn(&RunArgs) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            factory: PluginFactory::Remediator(Arc::new(move |args: &RunArgs| {
                factory(args).map(|r| Box::new(r) as Box<dyn Remediator>)
            })),
        }
    }
}
