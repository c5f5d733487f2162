//! Static capability metadata attached to every plugin.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use validate_types::{ContextType, ProblemTypeId};

pub const DEFAULT_PRIORITY: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Provider,
    Validator,
    Remediator,
}

impl PluginKind {
    pub fn label(self) -> &'static str {
        match self {
            PluginKind::Provider => "provider",
            PluginKind::Validator => "validator",
            PluginKind::Remediator => "remediator",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A plugin-declared argument, surfaced as `--<name>` on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub domain: String,
    pub kind: PluginKind,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provided_context_type: Option<ContextType>,

    /// Ordered; no duplicates.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_context_types: Vec<ContextType>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub produced_problem_types: BTreeSet<ProblemTypeId>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub handled_problem_types: BTreeSet<ProblemTypeId>,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Remediators only. Lower runs earlier.
    pub priority: i32,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgSpec>,
}

impl CapabilityDescriptor {
    fn base(kind: PluginKind, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            kind,
            description: String::new(),
            provided_context_type: None,
            required_context_types: Vec::new(),
            produced_problem_types: BTreeSet::new(),
            handled_problem_types: BTreeSet::new(),
            tags: BTreeSet::new(),
            priority: DEFAULT_PRIORITY,
            args: Vec::new(),
        }
    }

    pub fn provider(
        name: impl Into<String>,
        domain: impl Into<String>,
        provides: impl Into<ContextType>,
    ) -> Self {
        let mut d = Self::base(PluginKind::Provider, name, domain);
        d.provided_context_type = Some(provides.into());
        d
    }

    pub fn validator(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::base(PluginKind::Validator, name, domain)
    }

    pub fn remediator(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::base(PluginKind::Remediator, name, domain)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requires(mut self, context_type: impl Into<ContextType>) -> Self {
        self.required_context_types.push(context_type.into());
        self
    }

    pub fn produces(mut self, problem_type: impl Into<ProblemTypeId>) -> Self {
        self.produced_problem_types.insert(problem_type.into());
        self
    }

    pub fn handles(mut self, problem_type: impl Into<ProblemTypeId>) -> Self {
        self.handled_problem_types.insert(problem_type.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    pub fn handles_type(&self, problem_type: &ProblemTypeId) -> bool {
        self.handled_problem_types.contains(problem_type)
    }

    /// Check the descriptor contract for its kind.
    pub fn check(&self) -> Result<(), DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyName { kind: self.kind });
        }

        let mut seen = BTreeSet::new();
        for ct in &self.required_context_types {
            if !seen.insert(ct) {
                return Err(DescriptorError::DuplicateRequiredContext {
                    plugin: self.name.clone(),
                    context_type: ct.clone(),
                });
            }
        }

        let mut arg_names = BTreeSet::new();
        for arg in &self.args {
            if arg.name.trim().is_empty() {
                return Err(DescriptorError::EmptyArgName {
                    plugin: self.name.clone(),
                });
            }
            if !arg_names.insert(arg.name.as_str()) {
                return Err(DescriptorError::DuplicateArg {
                    plugin: self.name.clone(),
                    arg: arg.name.clone(),
                });
            }
        }

        match self.kind {
            PluginKind::Provider => {
                if self.provided_context_type.is_none() {
                    return Err(DescriptorError::MissingProvidedType {
                        plugin: self.name.clone(),
                    });
                }
            }
            PluginKind::Validator => {
                if self.required_context_types.is_empty() {
                    return Err(DescriptorError::NoRequiredContexts {
                        plugin: self.name.clone(),
                    });
                }
            }
            PluginKind::Remediator => {
                if self.handled_problem_types.is_empty() {
                    return Err(DescriptorError::NoHandledProblems {
                        plugin: self.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("{kind} declared with an empty name")]
    EmptyName { kind: PluginKind },

    #[error("provider '{plugin}' does not declare the context type it provides")]
    MissingProvidedType { plugin: String },

    #[error("validator '{plugin}' must require at least one context type")]
    NoRequiredContexts { plugin: String },

    #[error("plugin '{plugin}' lists context type '{context_type}' more than once")]
    DuplicateRequiredContext {
        plugin: String,
        context_type: ContextType,
    },

    #[error("remediator '{plugin}' must handle at least one problem type")]
    NoHandledProblems { plugin: String },

    #[error("plugin '{plugin}' declares an argument with an empty name")]
    EmptyArgName { plugin: String },

    #[error("plugin '{plugin}' declares argument '{arg}' more than once")]
    DuplicateArg { plugin: String, arg: String },
}
