use crate::args::RunArgs;
use crate::context::ContextCache;
use crate::plugin::Remediator;
use crate::problem::CollectedProblem;
use crate::registry::RemediatorEntry;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use validate_types::{OutcomeStatus, RemediationOutcome};

#[derive(Debug, Default)]
pub struct RemediationOutput {
    pub outcomes: Vec<RemediationOutcome>,
    pub interrupted: bool,
}

/// Per-problem progress through the remediator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProblemState {
    Pending,
    Attempted,
    Locked,
}

enum Slot {
    Ready(Box<dyn Remediator>),
    Broken(String),
}

fn instantiate(entry: &RemediatorEntry, args: &RunArgs) -> Slot {
    let name = &entry.descriptor.name;
    match catch_unwind(AssertUnwindSafe(|| entry.instantiate(args))) {
        Ok(Ok(remediator)) => {
            debug!(remediator = %name, "remediator ready");
            Slot::Ready(remediator)
        }
        Ok(Err(err)) => {
            warn!(remediator = %name, error = %format!("{err:#}"), "remediator factory failed");
            Slot::Broken(format!("{err:#}"))
        }
        Err(payload) => {
            let message = crate::panic_message(payload.as_ref());
            warn!(remediator = %name, error = %message, "remediator factory panicked");
            Slot::Broken(message)
        }
    }
}

fn failed(
    problem: &CollectedProblem,
    remediator: &str,
    message: &str,
    error: String,
) -> RemediationOutcome {
    RemediationOutcome {
        problem_type: problem.problem_type.clone(),
        problem_key: problem.identity_key.clone(),
        remediator: Some(remediator.to_string()),
        status: OutcomeStatus::Failed,
        success: false,
        message: message.to_string(),
        dry_run: false,
        locked: false,
        skipped: false,
        error: Some(error),
        incomplete: false,
    }
}

/// Ask the remediator whether it wants `problem`. A panic comes back as `Err`.
fn consult(
    remediator: &dyn Remediator,
    problem: &CollectedProblem,
    attempted_by: &[String],
) -> Result<bool, String> {
    catch_unwind(AssertUnwindSafe(|| {
        remediator.should_remediate(problem.problem.as_ref(), attempted_by)
    }))
    .map_err(|payload| crate::panic_message(payload.as_ref()))
}

fn attempt(
    remediator: &mut Box<dyn Remediator>,
    entry: &RemediatorEntry,
    problem: &CollectedProblem,
    cache: &ContextCache,
    dry_run: bool,
) -> RemediationOutcome {
    let name = &entry.descriptor.name;
    let view = cache.view(&entry.descriptor.required_context_types);
    let result = catch_unwind(AssertUnwindSafe(|| {
        remediator.remediate(problem.problem.as_ref(), &view, dry_run)
    }));

    match result {
        Ok(Ok(reply)) => RemediationOutcome {
            problem_type: problem.problem_type.clone(),
            problem_key: problem.identity_key.clone(),
            remediator: Some(name.clone()),
            status: OutcomeStatus::Attempted,
            success: reply.success,
            message: reply.message,
            dry_run,
            locked: reply.locked,
            skipped: reply.skipped,
            error: reply.error,
            incomplete: false,
        },
        Ok(Err(err)) => {
            let error = format!("{err:#}");
            warn!(
                remediator = %name,
                problem_key = %problem.identity_key,
                error = %error,
                "remediation failed"
            );
            failed(problem, name, "remediation failed", error)
        }
        Err(payload) => {
            let error = crate::panic_message(payload.as_ref());
            warn!(
                remediator = %name,
                problem_key = %problem.identity_key,
                error = %error,
                "remediator panicked"
            );
            failed(problem, name, "remediator panicked", error)
        }
    }
}

/// Dispatch each problem to the remediators handling its type, lowest priority first,
/// until one locks it.
///
/// Remediators are created at most once per run, on first use, and may decline a problem
/// through `should_remediate`. Every outcome's `dry_run` equals the `dry_run` argument.
pub fn run_remediators(
    remediators: &[RemediatorEntry],
    problems: &[CollectedProblem],
    cache: &ContextCache,
    args: &RunArgs,
    dry_run: bool,
    cancel: &CancellationToken,
) -> RemediationOutput {
    let mut order: Vec<&RemediatorEntry> = remediators.iter().collect();
    order.sort_by_key(|r| r.descriptor.priority);

    let mut slots: Vec<Option<Slot>> = order.iter().map(|_| None).collect();
    let mut out = RemediationOutput::default();

    'problems: for problem in problems {
        let mut state = ProblemState::Pending;
        let mut attempted_by: Vec<String> = Vec::new();

        for (i, entry) in order.iter().enumerate() {
            if !entry.descriptor.handles_type(&problem.problem_type) {
                continue;
            }
            if cancel.is_cancelled() {
                out.interrupted = true;
                break 'problems;
            }

            let name = &entry.descriptor.name;
            let slot = slots[i].get_or_insert_with(|| instantiate(entry, args));
            let mut outcome = match slot {
                Slot::Ready(remediator) => {
                    match consult(&**remediator, problem, &attempted_by) {
                        Ok(true) => attempt(remediator, entry, problem, cache, dry_run),
                        Ok(false) => {
                            debug!(
                                problem_key = %problem.identity_key,
                                remediator = %name,
                                "remediator declined problem"
                            );
                            continue;
                        }
                        Err(error) => {
                            warn!(
                                remediator = %name,
                                problem_key = %problem.identity_key,
                                error = %error,
                                "remediator panicked"
                            );
                            failed(problem, name, "remediator panicked", error)
                        }
                    }
                }
                Slot::Broken(error) => {
                    failed(problem, name, "remediator unavailable", error.clone())
                }
            };
            outcome.dry_run = dry_run;
            attempted_by.push(name.clone());

            state = if outcome.locked {
                ProblemState::Locked
            } else {
                ProblemState::Attempted
            };
            debug!(
                problem_type = %problem.problem_type,
                problem_key = %problem.identity_key,
                remediator = %name,
                state = ?state,
                "remediation attempt recorded"
            );
            out.outcomes.push(outcome);

            if state == ProblemState::Locked {
                break;
            }
        }

        if state == ProblemState::Pending {
            out.outcomes.push(RemediationOutcome::unfixable(
                problem.problem_type.clone(),
                problem.identity_key.clone(),
                dry_run,
            ));
        }
    }

    out
}
