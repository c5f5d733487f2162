//! Domain logic: plugin contracts, context resolution and the validate/remediate engine.
//!
//! This crate owns *what* runs and in which order. It does no I/O of its own: plugins bring
//! their data in through context providers, and the surrounding pipeline owns reporting.

mod args;
mod context;
mod descriptor;
mod engine;
mod error;
mod plugin;
mod problem;
mod registry;
mod remediation;
mod resolver;
mod runner;
mod selector;

use std::any::Any;

pub use args::{ArgSource, ArgValue, RunArgs};
pub use context::{ContextAccessError, ContextCache, ContextValue, ContextView};
pub use descriptor::{ArgSpec, CapabilityDescriptor, DEFAULT_PRIORITY, DescriptorError, PluginKind};
pub use engine::{Engine, RemediationMode, RunRequest, RunResult};
pub use error::{ConfigError, RunError};
pub use plugin::{
    ContextProvider, PluginEntry, PluginFactory, RemediationReply, Remediator, Validator,
};
pub use problem::{BasicProblem, CollectedProblem, DedupKey, Problem, fingerprint};
pub use registry::{
    CompatibilityReport, PluginRegistry, ProviderEntry, RemediatorEntry, ValidatorEntry,
};
pub use remediation::{RemediationOutput, run_remediators};
pub use resolver::{ContextResolver, required_types};
pub use runner::{ValidationOutput, run_validator, run_validators};
pub use selector::{Selection, select};

pub use tokio_util::sync::CancellationToken;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
