mod config;
mod plugin_args;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use config::{ConfigMerger, RunFlags};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use validate_core::adapters::{FsWritePort, StaticPluginSource};
use validate_core::pipeline::{RunOutcome, describe_plugins, run_pipeline, write_report};
use validate_core::ports::PluginSource;
use validate_core::settings::RunSettings;
use validate_domain::{ArgSpec, CancellationToken};
use validate_render::OutputMode;
use validate_types::{Severity, ToolInfo, exit_codes};

#[derive(Debug, Parser)]
#[command(
    name = "validate",
    version,
    about = "Plugin-driven validation with optional remediation."
)]
struct Cli {
    /// Log at debug level (otherwise RUST_LOG, defaulting to warnings only).
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the selected validators and, optionally, remediators.
    Run(RunArgs),
    /// List registered plugins and coverage notes.
    Plugins(PluginsArgs),
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// Only run validators with one of these tags (repeatable). Omit to auto-detect.
    #[arg(long = "tags")]
    tags: Vec<String>,

    /// Never run validators with one of these tags (repeatable).
    #[arg(long = "exclude-tags")]
    exclude_tags: Vec<String>,

    /// Output mode: detailed, summary, silent, json.
    #[arg(long)]
    output: Option<OutputMode>,

    /// Ask remediators what they would do; change nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Run remediators on the problems found.
    #[arg(long, default_value_t = false)]
    fix: bool,

    /// Lowest severity that fails the run: info, warning, error.
    #[arg(long)]
    fail_on: Option<Severity>,

    /// Settings file (default: ./validate.toml when present).
    #[arg(long, env = "VALIDATE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Secrets file loaded into the environment (default: ./.validate.env when present).
    #[arg(long)]
    env_file: Option<Utf8PathBuf>,

    /// Also write the JSON report to this path.
    #[arg(long)]
    report_out: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct PluginsArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    match real_main().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            eprintln!("validate: {e:#}");
            ExitCode::from(exit_codes::FATAL)
        }
    }
}

async fn real_main() -> anyhow::Result<ExitCode> {
    let source = StaticPluginSource::from_families([validate_plugin_fieldmap::builtin_plugins()]);

    let (cli, plugin_values) = parse_cli(&source);
    init_tracing(cli.debug);

    match cli.cmd {
        Command::Run(args) => cmd_run(args, plugin_values, source).await,
        Command::Plugins(args) => cmd_plugins(args, &source),
    }
}

/// Parse the fixed surface plus one flag per plugin-declared argument.
///
/// A discovery failure here only means no plugin flags; the run reports it properly.
fn parse_cli(source: &dyn PluginSource) -> (Cli, Vec<(String, Vec<String>)>) {
    let specs: Vec<ArgSpec> = source
        .discover()
        .map(|entries| {
            entries
                .into_iter()
                .flat_map(|e| e.descriptor.args)
                .collect()
        })
        .unwrap_or_default();

    let (mut cmd, names) = plugin_args::extend_run_command(Cli::command(), &specs);
    let matches = cmd.get_matches_mut();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.format(&mut cmd).exit(),
    };
    let values = matches
        .subcommand_matches("run")
        .map(|run| plugin_args::collect_values(run, &names))
        .unwrap_or_default();
    (cli, values)
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_run(
    args: RunArgs,
    plugin_values: Vec<(String, Vec<String>)>,
    source: StaticPluginSource,
) -> anyhow::Result<ExitCode> {
    let cwd = current_dir()?;

    let env_loaded = config::load_env_file(&cwd, args.env_file.as_deref())?;
    let file_config = config::load_or_default(&cwd, args.config.as_deref())
        .context("load validate.toml config")?;

    let flags = RunFlags {
        tags: args.tags,
        exclude_tags: args.exclude_tags,
        output: args.output,
        fail_on: args.fail_on,
        fix: args.fix,
        dry_run: args.dry_run,
        report_out: args.report_out,
        plugin_args: plugin_values,
    };
    let merged = ConfigMerger::new(file_config).merge_run_args(&flags)?;
    debug!(
        "merged config: tags={:?}, exclude_tags={:?}, fix={}, dry_run={}, fail_on={}, env_file={}",
        merged.tags, merged.exclude_tags, merged.fix, merged.dry_run, merged.fail_on, env_loaded
    );

    let settings = RunSettings {
        tags: merged.tags,
        exclude_tags: merged.exclude_tags,
        args: merged.args,
        fix: merged.fix,
        dry_run: merged.dry_run,
        fail_on: merged.fail_on,
    };
    let outcome = run_interruptible(settings, source).await?;

    let rendered = validate_render::render(&outcome.report, merged.output)?;
    print!("{rendered}");

    if let Some(path) = &merged.report_out {
        write_report(&outcome.report, path, &FsWritePort)
            .with_context(|| format!("write report to {}", path))?;
        info!("wrote report to {}", path);
    }

    Ok(ExitCode::from(outcome.exit_code))
}

/// Run the pipeline on a blocking thread while Ctrl-C cancels the shared token.
async fn run_interruptible(
    settings: RunSettings,
    source: StaticPluginSource,
) -> anyhow::Result<RunOutcome> {
    let cancel = CancellationToken::new();

    let watcher = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            watcher.cancel();
        }
    });

    let tool = tool_info();
    let outcome =
        tokio::task::spawn_blocking(move || run_pipeline(&settings, &source, tool, &cancel))
            .await
            .context("run pipeline")?;

    interrupt.abort();
    Ok(outcome)
}

fn cmd_plugins(args: PluginsArgs, source: &dyn PluginSource) -> anyhow::Result<ExitCode> {
    let catalog = match describe_plugins(source) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!(stage = %err.stage(), "{err}");
            eprintln!("validate: {err}");
            return Ok(ExitCode::from(err.exit_code()));
        }
    };

    match args.format {
        OutputFormat::Text => {
            println!("Registered plugins:\n");
            println!("  {:<11} {:<24} {:<10} DESCRIPTION", "KIND", "NAME", "DOMAIN");
            println!("  {:<11} {:<24} {:<10} -----------", "----", "----", "------");
            for p in &catalog.plugins {
                println!(
                    "  {:<11} {:<24} {:<10} {}",
                    p.kind, p.name, p.domain, p.description
                );
                if let Some(ct) = &p.provided_context_type {
                    println!("  {:<47}provides: {}", "", ct);
                }
                if !p.required_context_types.is_empty() {
                    println!(
                        "  {:<47}requires: {}",
                        "",
                        join(p.required_context_types.iter())
                    );
                }
                if !p.produced_problem_types.is_empty() {
                    println!(
                        "  {:<47}produces: {}",
                        "",
                        join(p.produced_problem_types.iter())
                    );
                }
                if !p.handled_problem_types.is_empty() {
                    println!(
                        "  {:<47}handles:  {} (priority {})",
                        "",
                        join(p.handled_problem_types.iter()),
                        p.priority
                    );
                }
                if !p.tags.is_empty() {
                    println!("  {:<47}tags:     {}", "", join(p.tags.iter()));
                }
                for a in &p.args {
                    let req = if a.required { "required" } else { "optional" };
                    println!("  {:<47}--{} ({req}): {}", "", a.name, a.description);
                }
            }
            if !catalog.compatibility_warnings.is_empty() {
                println!("\nCompatibility notes:");
                for w in &catalog.compatibility_warnings {
                    println!("  - {w}");
                }
            }
            println!();
            println!("Use 'validate run --help' for plugin arguments.");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
    }
    Ok(ExitCode::from(exit_codes::CLEAN))
}

fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn current_dir() -> anyhow::Result<Utf8PathBuf> {
    let dir = std::env::current_dir().context("read current directory")?;
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|p| anyhow::anyhow!("current directory is not UTF-8: {}", p.display()))
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "validate".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
