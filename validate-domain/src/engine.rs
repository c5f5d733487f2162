use crate::args::RunArgs;
use crate::error::RunError;
use crate::problem::CollectedProblem;
use crate::registry::PluginRegistry;
use crate::remediation::run_remediators;
use crate::resolver::{ContextResolver, required_types};
use crate::runner::run_validators;
use crate::selector::{Selection, select};
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;
use tracing::info;
use validate_types::{
    ContextType, DuplicateWarning, ProblemTypeId, RemediationOutcome, ValidatorErrorRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemediationMode {
    #[default]
    Off,
    DryRun,
    Apply,
}

impl RemediationMode {
    /// `--dry-run` wins over `--fix`.
    pub fn from_flags(fix: bool, dry_run: bool) -> Self {
        match (fix, dry_run) {
            (_, true) => RemediationMode::DryRun,
            (true, false) => RemediationMode::Apply,
            (false, false) => RemediationMode::Off,
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == RemediationMode::DryRun
    }
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub selection: Selection,
    pub exclude_tags: BTreeSet<String>,
    pub args: RunArgs,
    pub remediation: RemediationMode,
}

#[derive(Debug, Default)]
pub struct RunResult {
    /// Selected validators, in registration order.
    pub active_validators: Vec<String>,
    /// Validators that actually ran (fewer than active when interrupted).
    pub executed_validators: Vec<String>,
    pub problems: Vec<CollectedProblem>,
    pub validator_errors: Vec<ValidatorErrorRecord>,
    pub duplicate_warnings: Vec<DuplicateWarning>,
    pub outcomes: Vec<RemediationOutcome>,
    pub dry_run: bool,
    pub interrupted: bool,
    pub build_counts: BTreeMap<ContextType, u32>,
}

impl RunResult {
    pub fn nothing_to_validate(&self) -> bool {
        self.active_validators.is_empty()
    }
}

/// Sequences one run: select, resolve, validate, remediate.
pub struct Engine {
    registry: PluginRegistry,
}

impl Engine {
    pub fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Context needs of the remediators handling any of `problem_types`.
    fn remediator_consumers<'a>(
        &'a self,
        problem_types: &BTreeSet<ProblemTypeId>,
    ) -> Vec<(&'a str, &'a [ContextType])> {
        self.registry
            .remediators()
            .iter()
            .filter(|r| {
                r.descriptor
                    .handled_problem_types
                    .iter()
                    .any(|p| problem_types.contains(p))
            })
            .map(|r| {
                (
                    r.descriptor.name.as_str(),
                    r.descriptor.required_context_types.as_slice(),
                )
            })
            .collect()
    }

    pub fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunError> {
        let mut args = request.args.clone();
        args.apply_defaults(self.registry.arg_specs());

        let active = select(
            &self.registry,
            &request.selection,
            &request.exclude_tags,
            &args,
        );
        let mut result = RunResult {
            active_validators: active.iter().map(|v| v.descriptor.name.clone()).collect(),
            dry_run: request.remediation.is_dry_run(),
            ..RunResult::default()
        };

        if active.is_empty() {
            info!("no validators selected; nothing to validate");
            return Ok(result);
        }
        info!(validators = active.len(), "validators selected");

        let mut consumers: Vec<(&str, &[ContextType])> = active
            .iter()
            .map(|v| {
                (
                    v.descriptor.name.as_str(),
                    v.descriptor.required_context_types.as_slice(),
                )
            })
            .collect();

        let remediating = request.remediation != RemediationMode::Off;
        let produced: BTreeSet<ProblemTypeId> = active
            .iter()
            .flat_map(|v| v.descriptor.produced_problem_types.iter().cloned())
            .collect();
        if remediating {
            consumers.extend(self.remediator_consumers(&produced));
        }

        let required = required_types(consumers);
        let mut resolver = ContextResolver::new(&self.registry);
        if !resolve_until_cancelled(&mut resolver, &required, &args, cancel)? {
            result.build_counts = resolver.build_counts().clone();
            result.interrupted = true;
            return Ok(result);
        }

        let validation = run_validators(&active, resolver.cache(), cancel);
        info!(
            problems = validation.problems.len(),
            errors = validation.errors.len(),
            duplicates = validation.duplicates.len(),
            "validation finished"
        );
        result.executed_validators = validation.executed;
        result.problems = validation.problems;
        result.validator_errors = validation.errors;
        result.duplicate_warnings = validation.duplicates;
        result.interrupted = validation.interrupted;

        // Validators may emit types they never declared; their remediators still need
        // their contexts.
        if remediating && !result.interrupted {
            let undeclared: BTreeSet<ProblemTypeId> = result
                .problems
                .iter()
                .filter(|p| !produced.contains(&p.problem_type))
                .map(|p| p.problem_type.clone())
                .collect();
            if !undeclared.is_empty() {
                let late = required_types(self.remediator_consumers(&undeclared));
                if !resolve_until_cancelled(&mut resolver, &late, &args, cancel)? {
                    result.interrupted = true;
                }
            }
        }

        if remediating && !result.interrupted {
            let remediation = run_remediators(
                self.registry.remediators(),
                &result.problems,
                resolver.cache(),
                &args,
                result.dry_run,
                cancel,
            );
            info!(
                outcomes = remediation.outcomes.len(),
                dry_run = result.dry_run,
                "remediation finished"
            );
            result.outcomes = remediation.outcomes;
            result.interrupted = remediation.interrupted;
        }
        result.build_counts = resolver.build_counts().clone();

        if result.interrupted {
            for outcome in &mut result.outcomes {
                outcome.incomplete = true;
            }
        }

        Ok(result)
    }
}

/// Resolve `required`; `Ok(false)` when the run was cancelled first.
fn resolve_until_cancelled(
    resolver: &mut ContextResolver<'_>,
    required: &BTreeMap<ContextType, String>,
    args: &RunArgs,
    cancel: &CancellationToken,
) -> Result<bool, RunError> {
    match resolver.resolve(required, args, cancel) {
        Ok(()) => Ok(true),
        Err(RunError::Interrupted) => Ok(false),
        Err(err) => Err(err),
    }
}
