use pretty_assertions::assert_eq;
use validate_types::{
    OutcomeStatus, ProblemRecord, ProblemTypeId, RemediationOutcome, ReportCounts, RunInfo,
    RunReport, RunStatus, Severity, Stage, ToolInfo,
};

fn tool() -> ToolInfo {
    ToolInfo {
        name: "validate".to_string(),
        version: "0.1.0".to_string(),
    }
}

fn problem(ty: &str, key: &str, severity: Severity) -> ProblemRecord {
    ProblemRecord {
        problem_type: ProblemTypeId::new(ty),
        severity,
        identity_key: key.to_string(),
        fingerprint: "00".to_string(),
        description: format!("{ty} at {key}"),
        location: key.to_string(),
        validator: "v".to_string(),
        domain: "d".to_string(),
        data: None,
    }
}

fn fix(ty: &str, key: &str) -> RemediationOutcome {
    RemediationOutcome {
        problem_type: ProblemTypeId::new(ty),
        problem_key: key.to_string(),
        remediator: Some("r".to_string()),
        status: OutcomeStatus::Attempted,
        success: true,
        message: "fixed".to_string(),
        dry_run: false,
        locked: true,
        skipped: false,
        error: None,
        incomplete: false,
    }
}

#[test]
fn run_status_serializes_snake_case() {
    let v = serde_json::to_value(RunStatus::NothingToValidate).expect("serialize");
    assert_eq!(v, serde_json::json!("nothing_to_validate"));
    let v = serde_json::to_value(RunStatus::ProblemsFound).expect("serialize");
    assert_eq!(v, serde_json::json!("problems_found"));
}

#[test]
fn run_status_exit_codes() {
    assert_eq!(RunStatus::Clean.exit_code(), 0);
    assert_eq!(RunStatus::NothingToValidate.exit_code(), 0);
    assert_eq!(RunStatus::ProblemsFound.exit_code(), 1);
    assert_eq!(RunStatus::Fatal.exit_code(), 2);
    assert_eq!(RunStatus::Interrupted.exit_code(), 130);
}

#[test]
fn severity_orders_info_warning_error() {
    assert!(Severity::Info < Severity::Warning);
    assert!(Severity::Warning < Severity::Error);
    assert_eq!("warn".parse::<Severity>().expect("parse"), Severity::Warning);
    assert!("fatal".parse::<Severity>().is_err());
}

#[test]
fn stage_serializes_snake_case() {
    let v = serde_json::to_value(Stage::ContextBuild).expect("serialize");
    assert_eq!(v, serde_json::json!("context_build"));
}

#[test]
fn new_report_carries_schema_and_omits_empty_sections() {
    let report = RunReport::new(tool(), RunInfo::start(), RunStatus::Clean);
    let value = serde_json::to_value(&report).expect("serialize report");

    assert_eq!(value["schema"], serde_json::json!("validate.report.v1"));
    assert_eq!(value["exit_code"], serde_json::json!(0));
    assert!(value.get("fatal").is_none());
    assert!(value.get("validator_errors").is_none());
    assert!(value.get("duplicate_warnings").is_none());
}

#[test]
fn unfixable_outcome_has_no_remediator_and_no_error() {
    let o = RemediationOutcome::unfixable(ProblemTypeId::new("p"), "k", true);
    assert_eq!(o.status, OutcomeStatus::Unfixable);
    assert!(!o.success);
    assert!(o.dry_run);
    assert!(o.error.is_none());

    let value = serde_json::to_value(&o).expect("serialize");
    assert!(value.get("remediator").is_none());
}

#[test]
fn dry_run_and_incomplete_outcomes_are_not_fixes() {
    let mut dry = fix("p", "k");
    dry.dry_run = true;
    assert!(!dry.is_fix());

    let mut cut = fix("p", "k");
    cut.incomplete = true;
    assert!(!cut.is_fix());

    let mut unlocked = fix("p", "k");
    unlocked.locked = false;
    assert!(!unlocked.is_fix());

    assert!(fix("p", "k").is_fix());
}

#[test]
fn remaining_problems_exclude_locked_fixes() {
    let mut report = RunReport::new(tool(), RunInfo::start(), RunStatus::Clean);
    report.problems = vec![
        problem("p", "k1", Severity::Error),
        problem("p", "k2", Severity::Warning),
        problem("q", "k1", Severity::Info),
    ];
    report.outcomes = vec![fix("p", "k1")];

    let remaining: Vec<_> = report
        .remaining_problems()
        .map(|p| (p.problem_type.as_str(), p.identity_key.as_str()))
        .collect();
    assert_eq!(remaining, vec![("p", "k2"), ("q", "k1")]);

    let counts = ReportCounts::tally(&report);
    assert_eq!(counts.problems, 3);
    assert_eq!(counts.errors, 1);
    assert_eq!(counts.warnings, 1);
    assert_eq!(counts.info, 1);
    assert_eq!(counts.remaining, 2);
    assert_eq!(counts.fixed, 1);
}

#[test]
fn run_info_finish_sets_duration() {
    let mut info = RunInfo::start();
    info.finish();
    assert!(info.ended_at.is_some());
    assert!(info.duration_ms.is_some());
}

#[test]
fn report_roundtrips_through_json() {
    let mut report = RunReport::new(tool(), RunInfo::start(), RunStatus::ProblemsFound);
    report.problems.push(problem("p", "k", Severity::Error));
    report.counts = ReportCounts::tally(&report);

    let json = serde_json::to_string(&report).expect("serialize");
    let back: RunReport = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.problems, report.problems);
    assert_eq!(back.status, RunStatus::ProblemsFound);
    assert_eq!(back.counts, report.counts);
}
