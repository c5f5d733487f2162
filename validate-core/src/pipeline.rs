//! The run pipeline, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: plugin discovery and report writing go through the
//! port traits. Every failure ends up in the returned report; nothing here panics or exits.

use crate::ports::{PluginSource, WritePort};
use crate::settings::RunSettings;
use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};
use validate_domain::{
    CancellationToken, CapabilityDescriptor, ConfigError, Engine, PluginRegistry,
    RemediationMode, RunError, RunRequest, RunResult, Selection,
};
use validate_types::{
    FatalError, ReportCounts, RunInfo, RunReport, RunStatus, Severity, Stage, ToolInfo,
};

/// Error type for pipeline stages. Every variant is fatal (exit 2).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("plugin discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("invalid plugin configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Run(#[from] RunError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Discovery(_) => Stage::Discovery,
            PipelineError::Config(_) => Stage::Configuration,
            PipelineError::Run(err) => err.stage().unwrap_or(Stage::Validation),
        }
    }

    pub fn exit_code(&self) -> u8 {
        validate_types::exit_codes::FATAL
    }
}

/// Outcome of `run_pipeline`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub exit_code: u8,
}

/// Discover plugins and validate the registry.
pub fn load_registry(source: &dyn PluginSource) -> Result<PluginRegistry, PipelineError> {
    let entries = source.discover().map_err(PipelineError::Discovery)?;
    info!(plugins = entries.len(), "plugins discovered");
    Ok(PluginRegistry::from_entries(entries)?)
}

/// Run validators (and, when requested, remediators) and assemble the report.
pub fn run_pipeline(
    settings: &RunSettings,
    source: &dyn PluginSource,
    tool: ToolInfo,
    cancel: &CancellationToken,
) -> RunOutcome {
    let mut run = RunInfo::start();

    let (result, compatibility) = match execute(settings, source, cancel) {
        Ok(ok) => ok,
        Err(err) => {
            warn!(stage = %err.stage(), error = %err, "run aborted");
            run.finish();
            let mut report = RunReport::new(tool, run, RunStatus::Fatal);
            report.dry_run = settings.dry_run;
            report.fatal = Some(FatalError {
                stage: err.stage(),
                message: err.to_string(),
            });
            let exit_code = err.exit_code();
            report.exit_code = exit_code;
            return RunOutcome { report, exit_code };
        }
    };

    run.finish();
    let report = assemble_report(tool, run, result, compatibility, settings.fail_on);
    let exit_code = report.exit_code;
    info!(status = ?report.status, exit_code, "run finished");
    RunOutcome { report, exit_code }
}

fn execute(
    settings: &RunSettings,
    source: &dyn PluginSource,
    cancel: &CancellationToken,
) -> Result<(RunResult, Vec<String>), PipelineError> {
    let registry = load_registry(source)?;
    let compatibility = registry.compatibility().warnings();
    for w in &compatibility {
        warn!("{w}");
    }

    let request = RunRequest {
        selection: Selection::from_tags(settings.tags.iter().cloned()),
        exclude_tags: settings.exclude_tags.iter().cloned().collect(),
        args: settings.args.clone(),
        remediation: RemediationMode::from_flags(settings.fix, settings.dry_run),
    };

    let engine = Engine::new(registry);
    let result = engine.run(&request, cancel)?;
    Ok((result, compatibility))
}

/// Turn an engine result into a report with status and exit code.
pub fn assemble_report(
    tool: ToolInfo,
    run: RunInfo,
    result: RunResult,
    compatibility_warnings: Vec<String>,
    fail_on: Severity,
) -> RunReport {
    let mut report = RunReport::new(tool, run, RunStatus::Clean);
    report.dry_run = result.dry_run;
    report.active_validators = result.active_validators.clone();
    report.problems = result.problems.iter().map(|p| p.to_record()).collect();
    report.validator_errors = result.validator_errors;
    report.duplicate_warnings = result.duplicate_warnings;
    report.outcomes = result.outcomes;
    report.compatibility_warnings = compatibility_warnings;
    report.counts = ReportCounts::tally(&report);

    report.status = if result.interrupted {
        RunStatus::Interrupted
    } else if result.active_validators.is_empty() {
        RunStatus::NothingToValidate
    } else if report.remaining_problems().any(|p| p.severity >= fail_on) {
        RunStatus::ProblemsFound
    } else {
        RunStatus::Clean
    };
    report.exit_code = report.status.exit_code();
    report
}

/// Write the JSON report through the write port.
pub fn write_report(
    report: &RunReport,
    path: &camino::Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(report).context("serialize report")?;
    json.push('\n');
    writer.write_file(path, json.as_bytes())
}

/// Descriptor listing for `validate plugins`.
#[derive(Debug, Clone, Serialize)]
pub struct PluginCatalog {
    pub plugins: Vec<CapabilityDescriptor>,
    pub compatibility_warnings: Vec<String>,
}

pub fn describe_plugins(source: &dyn PluginSource) -> Result<PluginCatalog, PipelineError> {
    let registry = load_registry(source)?;
    Ok(PluginCatalog {
        plugins: registry.descriptors().cloned().collect(),
        compatibility_warnings: registry.compatibility().warnings(),
    })
}
