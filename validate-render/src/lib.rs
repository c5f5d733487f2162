//! Rendering helpers for run reports: human-readable console text and JSON.

use anyhow::Context;
use std::fmt::Write as _;
use std::str::FromStr;
use validate_types::{OutcomeStatus, RemediationOutcome, RunReport, RunStatus, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Every problem with description, location and identity, plus all report sections.
    #[default]
    Detailed,
    /// One line per problem and a closing summary.
    Summary,
    /// Nothing; the exit code carries the result.
    Silent,
    /// The full report as pretty-printed JSON.
    Json,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detailed" | "verbose" => Ok(OutputMode::Detailed),
            "summary" | "brief" => Ok(OutputMode::Summary),
            "silent" | "quiet" => Ok(OutputMode::Silent),
            "json" => Ok(OutputMode::Json),
            other => Err(format!("unknown output mode '{other}'")),
        }
    }
}

pub fn render(report: &RunReport, mode: OutputMode) -> anyhow::Result<String> {
    Ok(match mode {
        OutputMode::Detailed => render_detailed(report),
        OutputMode::Summary => render_summary(report),
        OutputMode::Silent => String::new(),
        OutputMode::Json => render_json(report)?,
    })
}

pub fn render_json(report: &RunReport) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(report).context("serialize report")?;
    out.push('\n');
    Ok(out)
}

pub fn render_detailed(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", headline(report));

    if let Some(fatal) = &report.fatal {
        let _ = writeln!(out, "Fatal error during {}: {}", fatal.stage, fatal.message);
        return out;
    }

    if report.status == RunStatus::NothingToValidate {
        out.push_str("No validators selected. Pass --tags or plugin arguments to choose some.\n");
        return out;
    }

    if !report.active_validators.is_empty() {
        let _ = writeln!(
            out,
            "Active validators: {}\n",
            report.active_validators.join(", ")
        );
    }

    let _ = writeln!(out, "Problems ({})", report.problems.len());
    if report.problems.is_empty() {
        out.push_str("  none\n");
    }
    for p in &report.problems {
        let _ = writeln!(
            out,
            "  [{}] {} ({}/{})",
            p.severity, p.problem_type, p.domain, p.validator
        );
        let _ = writeln!(out, "    {}", p.description);
        if !p.location.is_empty() {
            let _ = writeln!(out, "    at: {}", p.location);
        }
        let _ = writeln!(out, "    key: {}", p.identity_key);
    }

    if !report.validator_errors.is_empty() {
        let _ = writeln!(out, "\nValidator errors ({})", report.validator_errors.len());
        for e in &report.validator_errors {
            let _ = writeln!(out, "  - {}/{}: {}", e.domain, e.validator, e.message);
        }
    }

    if !report.duplicate_warnings.is_empty() {
        let _ = writeln!(
            out,
            "\nDuplicates suppressed ({})",
            report.duplicate_warnings.len()
        );
        for d in &report.duplicate_warnings {
            if d.is_repeat() {
                let _ = writeln!(
                    out,
                    "  - {} {}: reported more than once by {}",
                    d.problem_type, d.identity_key, d.kept_from
                );
            } else {
                let _ = writeln!(
                    out,
                    "  - {} {}: kept from {}, dropped from {}",
                    d.problem_type, d.identity_key, d.kept_from, d.suppressed_from
                );
            }
        }
    }

    if !report.outcomes.is_empty() {
        let title = if report.dry_run {
            "Remediation (dry run)"
        } else {
            "Remediation"
        };
        let _ = writeln!(out, "\n{title}");
        for o in &report.outcomes {
            let _ = writeln!(out, "  - {}", outcome_line(o));
        }
    }

    if !report.compatibility_warnings.is_empty() {
        out.push_str("\nCompatibility\n");
        for w in &report.compatibility_warnings {
            let _ = writeln!(out, "  - {w}");
        }
    }

    let _ = writeln!(out, "\n{}", summary_line(report));
    out
}

pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    if let Some(fatal) = &report.fatal {
        let _ = writeln!(out, "fatal ({}): {}", fatal.stage, fatal.message);
        return out;
    }
    for p in &report.problems {
        let _ = writeln!(
            out,
            "{} {} {}",
            severity_tag(p.severity),
            p.problem_type,
            p.identity_key
        );
    }
    for e in &report.validator_errors {
        let _ = writeln!(out, "ERR  {} failed: {}", e.validator, e.message);
    }
    let _ = writeln!(out, "{}", summary_line(report));
    out
}

fn headline(report: &RunReport) -> String {
    let status = match report.status {
        RunStatus::Clean => "clean",
        RunStatus::NothingToValidate => "nothing to validate",
        RunStatus::ProblemsFound => "problems found",
        RunStatus::Fatal => "fatal error",
        RunStatus::Interrupted => "interrupted",
    };
    format!("validate: {status} (exit {})", report.exit_code)
}

fn summary_line(report: &RunReport) -> String {
    let c = &report.counts;
    let mut line = format!(
        "{} problem(s): {} error, {} warning, {} info; {} remaining",
        c.problems, c.errors, c.warnings, c.info, c.remaining
    );
    if !report.outcomes.is_empty() {
        let _ = write!(
            line,
            "; {} fixed, {} failed, {} unfixable",
            c.fixed, c.failed, c.unfixable
        );
    }
    if c.validator_errors > 0 {
        let _ = write!(line, "; {} validator error(s)", c.validator_errors);
    }
    if report.status == RunStatus::Interrupted {
        line.push_str(" (interrupted)");
    }
    line
}

fn outcome_line(o: &RemediationOutcome) -> String {
    let who = o.remediator.as_deref().unwrap_or("-");
    let status = match o.status {
        OutcomeStatus::Attempted if o.skipped => "skipped",
        OutcomeStatus::Attempted if o.success => "ok",
        OutcomeStatus::Attempted => "not fixed",
        OutcomeStatus::Failed => "failed",
        OutcomeStatus::Unfixable => "unfixable",
    };
    let mut line = format!(
        "{} {} -> {}: {} ({})",
        o.problem_type, o.problem_key, who, status, o.message
    );
    if o.locked {
        line.push_str(" [locked]");
    }
    if let Some(err) = &o.error {
        let _ = write!(line, " error: {err}");
    }
    if o.incomplete {
        line.push_str(" [incomplete]");
    }
    line
}

fn severity_tag(s: Severity) -> &'static str {
    match s {
        Severity::Error => "ERR ",
        Severity::Warning => "WARN",
        Severity::Info => "INFO",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use validate_types::{
        DuplicateWarning, FatalError, ProblemRecord, ProblemTypeId, ReportCounts, RunInfo, Stage,
        ToolInfo,
    };

    fn report(status: RunStatus) -> RunReport {
        let mut r = RunReport::new(
            ToolInfo {
                name: "validate".into(),
                version: "0.0.0".into(),
            },
            RunInfo::start(),
            status,
        );
        r.active_validators = vec!["field-existence".into()];
        r
    }

    fn problem() -> ProblemRecord {
        ProblemRecord {
            problem_type: ProblemTypeId::new("fieldmap.field_missing_from_target"),
            severity: Severity::Error,
            identity_key: "ENG->OPS:Bug:customfield_1".into(),
            fingerprint: "ab".into(),
            description: "field 'customfield_1' missing from OPS/Bug".into(),
            location: "mapping.json#mappings[0]".into(),
            validator: "field-existence".into(),
            domain: "fieldmap".into(),
            data: None,
        }
    }

    #[test]
    fn output_mode_accepts_aliases() {
        assert_eq!("verbose".parse::<OutputMode>().unwrap(), OutputMode::Detailed);
        assert_eq!("brief".parse::<OutputMode>().unwrap(), OutputMode::Summary);
        assert_eq!("JSON".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert!("xml".parse::<OutputMode>().is_err());
    }

    #[test]
    fn detailed_lists_problem_fields() {
        let mut r = report(RunStatus::ProblemsFound);
        r.exit_code = 1;
        r.problems.push(problem());
        r.counts = ReportCounts::tally(&r);

        let text = render_detailed(&r);
        assert!(text.starts_with("validate: problems found (exit 1)"));
        assert!(text.contains("[error] fieldmap.field_missing_from_target (fieldmap/field-existence)"));
        assert!(text.contains("at: mapping.json#mappings[0]"));
        assert!(text.contains("1 problem(s): 1 error, 0 warning, 0 info; 1 remaining"));
    }

    #[test]
    fn detailed_shows_fatal_stage() {
        let mut r = report(RunStatus::Fatal);
        r.fatal = Some(FatalError {
            stage: Stage::ContextBuild,
            message: "catalog unreadable".into(),
        });
        let text = render_detailed(&r);
        assert!(text.contains("Fatal error during context build: catalog unreadable"));
    }

    #[test]
    fn detailed_distinguishes_repeats_from_cross_validator_duplicates() {
        let mut r = report(RunStatus::ProblemsFound);
        r.problems.push(problem());
        r.duplicate_warnings = vec![
            DuplicateWarning {
                problem_type: ProblemTypeId::new("p"),
                identity_key: "k1".into(),
                kept_from: "field-existence".into(),
                suppressed_from: "field-existence".into(),
            },
            DuplicateWarning {
                problem_type: ProblemTypeId::new("p"),
                identity_key: "k2".into(),
                kept_from: "first".into(),
                suppressed_from: "second".into(),
            },
        ];

        let text = render_detailed(&r);
        assert!(text.contains("p k1: reported more than once by field-existence"));
        assert!(text.contains("p k2: kept from first, dropped from second"));
    }

    #[test]
    fn summary_is_one_line_per_problem() {
        let mut r = report(RunStatus::ProblemsFound);
        r.problems.push(problem());
        r.counts = ReportCounts::tally(&r);
        let text = render_summary(&r);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "ERR  fieldmap.field_missing_from_target ENG->OPS:Bug:customfield_1"
        );
    }

    #[test]
    fn silent_renders_nothing() {
        let r = report(RunStatus::Clean);
        assert_eq!(render(&r, OutputMode::Silent).unwrap(), "");
    }

    #[test]
    fn json_parses_back() {
        let mut r = report(RunStatus::ProblemsFound);
        r.problems.push(problem());
        let text = render(&r, OutputMode::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["status"], "problems_found");
        assert_eq!(v["problems"][0]["validator"], "field-existence");
    }
}
