use crate::context::ContextCache;
use crate::problem::{CollectedProblem, DedupKey};
use crate::registry::ValidatorEntry;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use validate_types::{DuplicateWarning, ValidatorErrorRecord};

#[derive(Debug, Default)]
pub struct ValidationOutput {
    /// Deduplicated, in validator-registration order then emission order.
    pub problems: Vec<CollectedProblem>,
    pub errors: Vec<ValidatorErrorRecord>,
    pub duplicates: Vec<DuplicateWarning>,

    /// Validators that actually ran.
    pub executed: Vec<String>,
    pub interrupted: bool,
}

/// Run one validator against its declared contexts. Errors and panics come back as `Err`.
pub fn run_validator(
    entry: &ValidatorEntry,
    cache: &ContextCache,
) -> Result<Vec<CollectedProblem>, String> {
    let descriptor = &entry.descriptor;
    let view = cache.view(&descriptor.required_context_types);

    let result = catch_unwind(AssertUnwindSafe(|| entry.instantiate().validate(&view)));
    let problems = match result {
        Ok(Ok(problems)) => problems,
        Ok(Err(err)) => return Err(format!("{err:#}")),
        Err(payload) => return Err(crate::panic_message(payload.as_ref())),
    };

    let collected = problems
        .into_iter()
        .map(|p| CollectedProblem::new(p, &descriptor.name, &descriptor.domain))
        .inspect(|p| {
            if !descriptor.produced_problem_types.contains(&p.problem_type) {
                warn!(
                    validator = %descriptor.name,
                    problem_type = %p.problem_type,
                    "validator emitted an undeclared problem type"
                );
            }
        })
        .collect();
    Ok(collected)
}

/// Run validators in order, isolating failures and deduplicating across the run.
pub fn run_validators(
    validators: &[&ValidatorEntry],
    cache: &ContextCache,
    cancel: &CancellationToken,
) -> ValidationOutput {
    let mut out = ValidationOutput::default();
    let mut seen: HashMap<DedupKey, String> = HashMap::new();

    for entry in validators {
        if cancel.is_cancelled() {
            out.interrupted = true;
            break;
        }

        let name = &entry.descriptor.name;
        debug!(validator = %name, "running validator");
        out.executed.push(name.clone());

        let problems = match run_validator(entry, cache) {
            Ok(problems) => problems,
            Err(message) => {
                warn!(validator = %name, error = %message, "validator failed");
                out.errors.push(ValidatorErrorRecord {
                    domain: entry.descriptor.domain.clone(),
                    validator: name.clone(),
                    message,
                });
                continue;
            }
        };

        for problem in problems {
            let key = problem.dedup_key();
            if let Some(kept_from) = seen.get(&key) {
                if *kept_from == problem.validator {
                    warn!(
                        validator = %kept_from,
                        problem_type = %problem.problem_type,
                        identity_key = %problem.identity_key,
                        "validator reported the same problem twice; repeat suppressed"
                    );
                } else {
                    warn!(
                        problem_type = %problem.problem_type,
                        identity_key = %problem.identity_key,
                        kept_from = %kept_from,
                        suppressed_from = %problem.validator,
                        "duplicate problem suppressed"
                    );
                }
                out.duplicates.push(DuplicateWarning {
                    problem_type: problem.problem_type.clone(),
                    identity_key: problem.identity_key.clone(),
                    kept_from: kept_from.clone(),
                    suppressed_from: problem.validator.clone(),
                });
                continue;
            }
            seen.insert(key, problem.validator.clone());
            out.problems.push(problem);
        }
    }

    out
}
