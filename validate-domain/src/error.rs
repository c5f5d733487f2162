use crate::descriptor::{DescriptorError, PluginKind};
use validate_types::{ContextType, Stage};

/// Startup and resolution configuration failures. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("plugin '{plugin}' is declared as a {declared} but registered with a {registered} factory")]
    KindMismatch {
        plugin: String,
        declared: PluginKind,
        registered: PluginKind,
    },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: PluginKind, name: String },

    #[error("context type '{context_type}' is provided by both '{first}' and '{second}'")]
    AmbiguousProvider {
        context_type: ContextType,
        first: String,
        second: String,
    },

    #[error("no provider for context type '{context_type}' (required by '{consumer}')")]
    MissingProvider {
        context_type: ContextType,
        consumer: String,
    },

    #[error("provider '{provider}' requires argument '--{arg}'")]
    MissingArgument { provider: String, arg: String },
}

/// Why a run stopped before producing a result.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("building context '{context_type}' with provider '{provider}' failed: {message}")]
    ContextBuild {
        context_type: ContextType,
        provider: String,
        message: String,
    },

    #[error("interrupted")]
    Interrupted,
}

impl RunError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunError::Config(_) => Some(Stage::Configuration),
            RunError::ContextBuild { .. } => Some(Stage::ContextBuild),
            RunError::Interrupted => None,
        }
    }
}
