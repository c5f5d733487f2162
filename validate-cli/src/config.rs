//! Configuration file loading for validate.
//!
//! Discovers and loads `validate.toml` from the working directory (or `--config`),
//! loads `.validate.env` secrets into the process environment, and merges file
//! settings with CLI arguments (CLI takes precedence, lists extend).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;
use validate_domain::{ArgSource, RunArgs};
use validate_render::OutputMode;
use validate_types::Severity;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "validate.toml";

/// The secrets file name to search for.
pub const ENV_FILE_NAME: &str = ".validate.env";

/// Top-level configuration from validate.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Run settings (selection, output, remediation).
    pub run: RunConfig,

    /// Plugin argument values, keyed by argument name.
    pub args: BTreeMap<String, ArgSetting>,
}

/// `[run]` section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Only run validators carrying one of these tags. Empty means auto-detect.
    pub tags: Vec<String>,

    /// Never run validators carrying one of these tags.
    pub exclude_tags: Vec<String>,

    /// Output mode (detailed, summary, silent, json).
    pub output: Option<String>,

    /// Lowest severity that fails the run.
    pub fail_on: Option<String>,

    /// Apply remediations.
    pub fix: bool,

    /// Ask remediators what they would do, without changing anything.
    pub dry_run: bool,

    /// Where to write the JSON report.
    pub report_out: Option<Utf8PathBuf>,
}

/// A plugin argument value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArgSetting {
    One(String),
    Many(Vec<String>),
}

impl ArgSetting {
    pub fn values(&self) -> &[String] {
        match self {
            ArgSetting::One(v) => std::slice::from_ref(v),
            ArgSetting::Many(vs) => vs,
        }
    }
}

/// Discover the validate.toml config file in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a validate.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<ValidateConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ValidateConfig> {
    let config: ValidateConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config if given (it must exist), else discover one in `dir`,
/// else return the default.
pub fn load_or_default(
    dir: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> anyhow::Result<ValidateConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(ValidateConfig::default()),
    }
}

/// Load secrets into the process environment. Existing variables are never overridden.
///
/// An explicit `--env-file` must exist; the default `.validate.env` is optional.
/// Returns whether a file was loaded.
pub fn load_env_file(dir: &Utf8Path, explicit: Option<&Utf8Path>) -> anyhow::Result<bool> {
    if let Some(path) = explicit {
        dotenvy::from_path(path).with_context(|| format!("load env file {}", path))?;
        debug!("loaded env file {}", path);
        return Ok(true);
    }

    let path = dir.join(ENV_FILE_NAME);
    let loaded = dotenvy::from_path(&path)
        .map(|_| true)
        .or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(err),
        })
        .with_context(|| format!("load env file {}", path))?;
    if loaded {
        debug!("loaded env file {}", path);
    }
    Ok(loaded)
}

/// Run flags as given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RunFlags {
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub output: Option<OutputMode>,
    pub fail_on: Option<Severity>,
    pub fix: bool,
    pub dry_run: bool,
    pub report_out: Option<Utf8PathBuf>,

    /// Plugin arguments in command-line order.
    pub plugin_args: Vec<(String, Vec<String>)>,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub output: OutputMode,
    pub fail_on: Severity,
    pub fix: bool,
    pub dry_run: bool,
    pub report_out: Option<Utf8PathBuf>,

    /// Settings-file values tagged `Settings`, overridden per name by `Cli` values.
    pub args: RunArgs,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: ValidateConfig,
}

impl ConfigMerger {
    pub fn new(config: ValidateConfig) -> Self {
        Self { config }
    }

    /// Merge with `run` CLI arguments.
    ///
    /// Tag lists extend the config file lists. Boolean flags turn on what the file
    /// leaves off. Everything else: CLI wins when given.
    pub fn merge_run_args(self, flags: &RunFlags) -> anyhow::Result<MergedConfig> {
        let run = self.config.run;

        let output = match (flags.output, &run.output) {
            (Some(mode), _) => mode,
            (None, Some(raw)) => raw
                .parse::<OutputMode>()
                .map_err(anyhow::Error::msg)
                .context("[run].output")?,
            (None, None) => OutputMode::default(),
        };
        let fail_on = match (flags.fail_on, &run.fail_on) {
            (Some(sev), _) => sev,
            (None, Some(raw)) => raw
                .parse::<Severity>()
                .map_err(anyhow::Error::msg)
                .context("[run].fail_on")?,
            (None, None) => Severity::Info,
        };

        let mut args = RunArgs::new();
        for (name, setting) in &self.config.args {
            for value in setting.values() {
                args.push(name.clone(), value.clone(), ArgSource::Settings);
            }
        }
        for (name, values) in &flags.plugin_args {
            for value in values {
                args.push(name.clone(), value.clone(), ArgSource::Cli);
            }
        }

        Ok(MergedConfig {
            tags: extend_unique(run.tags, &flags.tags),
            exclude_tags: extend_unique(run.exclude_tags, &flags.exclude_tags),
            output,
            fail_on,
            fix: flags.fix || run.fix,
            dry_run: flags.dry_run || run.dry_run,
            report_out: flags.report_out.clone().or(run.report_out),
            args,
        })
    }
}

fn extend_unique(mut base: Vec<String>, extra: &[String]) -> Vec<String> {
    for item in extra {
        if !base.contains(item) {
            base.push(item.clone());
        }
    }
    base
}
