//! Property-based tests for ordering and locking in the engine.
//!
//! These tests verify that:
//! - Remediators see each problem in non-decreasing priority order
//! - Nothing runs after a lock
//! - Dry-run never yields a non-dry-run outcome
//! - Repeated runs over the same input produce identical problem lists

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use validate_domain::{
    BasicProblem, CancellationToken, CapabilityDescriptor, ContextProvider, ContextValue,
    ContextView, Engine, PluginEntry, PluginRegistry, Problem, RemediationMode, RemediationReply,
    Remediator, RunArgs, RunRequest, Selection, Validator,
};
use validate_types::Severity;

type Log = Arc<Mutex<Vec<(String, i32, bool)>>>;

struct UnitProvider;

impl ContextProvider for UnitProvider {
    fn build(&self, _: &RunArgs) -> anyhow::Result<Vec<ContextValue>> {
        Ok(vec![ContextValue::new(())])
    }
}

#[derive(Clone)]
struct KeysValidator(Vec<String>);

impl Validator for KeysValidator {
    fn validate(&self, _: &ContextView<'_>) -> anyhow::Result<Vec<Arc<dyn Problem>>> {
        Ok(self
            .0
            .iter()
            .map(|k| Arc::new(BasicProblem::new("P", Severity::Error, k.clone(), k.clone())) as Arc<dyn Problem>)
            .collect())
    }
}

struct Logged {
    priority: i32,
    lock: bool,
    log: Log,
}

impl Remediator for Logged {
    fn remediate(
        &mut self,
        problem: &dyn Problem,
        _: &ContextView<'_>,
        _: bool,
    ) -> anyhow::Result<RemediationReply> {
        self.log
            .lock()
            .expect("lock")
            .push((problem.identity_key(), self.priority, self.lock));
        Ok(if self.lock {
            RemediationReply::fixed("fixed")
        } else {
            RemediationReply::passed_on("seen")
        })
    }
}

fn build_engine(keys: &[String], remediators: &[(i32, bool)], log: &Log) -> Engine {
    let mut entries = vec![
        PluginEntry::provider(CapabilityDescriptor::provider("p", "t", "X"), || UnitProvider),
    ];
    let validator = KeysValidator(keys.to_vec());
    entries.push(PluginEntry::validator(
        CapabilityDescriptor::validator("v", "t")
            .requires("X")
            .produces("P")
            .tag("t"),
        move || validator.clone(),
    ));
    for (i, &(priority, lock)) in remediators.iter().enumerate() {
        let log = log.clone();
        entries.push(PluginEntry::remediator(
            CapabilityDescriptor::remediator(format!("r{i}"), "t")
                .handles("P")
                .priority(priority),
            move |_| {
                Ok(Logged {
                    priority,
                    lock,
                    log: log.clone(),
                })
            },
        ));
    }
    Engine::new(PluginRegistry::from_entries(entries).expect("registry"))
}

fn request(mode: RemediationMode) -> RunRequest {
    RunRequest {
        selection: Selection::from_tags(["t"]),
        exclude_tags: BTreeSet::new(),
        args: RunArgs::new(),
        remediation: mode,
    }
}

fn arb_keys() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-d]{1,2}", 1..8)
}

fn arb_remediators() -> impl Strategy<Value = Vec<(i32, bool)>> {
    prop::collection::vec((0i32..5, any::<bool>()), 0..6)
}

proptest! {
    #[test]
    fn priorities_non_decreasing_and_nothing_after_lock(
        keys in arb_keys(),
        remediators in arb_remediators(),
    ) {
        let log: Log = Arc::default();
        let engine = build_engine(&keys, &remediators, &log);
        engine.run(&request(RemediationMode::Apply), &CancellationToken::new()).unwrap();

        let entries = log.lock().unwrap().clone();
        let unique: BTreeSet<&String> = keys.iter().collect();
        for key in unique {
            let attempts: Vec<_> = entries.iter().filter(|(k, _, _)| k == key).collect();
            for pair in attempts.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].1);
                prop_assert!(!pair[0].2, "attempt after a lock");
            }
        }
    }

    #[test]
    fn dry_run_outcomes_are_all_dry(
        keys in arb_keys(),
        remediators in arb_remediators(),
    ) {
        let log: Log = Arc::default();
        let engine = build_engine(&keys, &remediators, &log);
        let result = engine.run(&request(RemediationMode::DryRun), &CancellationToken::new()).unwrap();
        prop_assert!(!result.outcomes.is_empty());
        prop_assert!(result.outcomes.iter().all(|o| o.dry_run));
    }

    #[test]
    fn repeated_runs_yield_identical_problems(keys in arb_keys()) {
        let log: Log = Arc::default();
        let engine = build_engine(&keys, &[], &log);
        let first = engine.run(&request(RemediationMode::Off), &CancellationToken::new()).unwrap();
        let second = engine.run(&request(RemediationMode::Off), &CancellationToken::new()).unwrap();

        let a: Vec<_> = first.problems.iter().map(|p| p.dedup_key()).collect();
        let b: Vec<_> = second.problems.iter().map(|p| p.dedup_key()).collect();
        prop_assert_eq!(&a, &b);

        let unique: BTreeSet<&String> = keys.iter().collect();
        prop_assert_eq!(a.len(), unique.len());
        prop_assert_eq!(first.duplicate_warnings.len(), keys.len() - unique.len());
    }
}
