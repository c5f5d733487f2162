//! Plugin-declared arguments surfaced as `--<name>` flags on `validate run`.

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeSet;
use tracing::warn;
use validate_domain::ArgSpec;

/// Append one repeatable `--<name> VALUE` flag per distinct plugin argument name.
///
/// Names already taken by a built-in `run` flag are skipped. Returns the command and the
/// names actually added, in declaration order.
pub fn extend_run_command(cmd: Command, specs: &[ArgSpec]) -> (Command, Vec<String>) {
    let mut added = Vec::new();
    let cmd = cmd.mut_subcommand("run", |mut run| {
        let mut taken: BTreeSet<String> = run
            .get_arguments()
            .filter_map(|a| a.get_long().map(str::to_string))
            .collect();
        taken.insert("help".to_string());

        for spec in specs {
            if taken.contains(&spec.name) {
                if !added.contains(&spec.name) {
                    warn!(arg = %spec.name, "plugin argument shadows a built-in flag; ignored");
                }
                continue;
            }
            taken.insert(spec.name.clone());
            added.push(spec.name.clone());

            run = run.arg(
                Arg::new(spec.name.clone())
                    .long(spec.name.clone())
                    .value_name("VALUE")
                    .action(ArgAction::Append)
                    .help(help_text(spec))
                    .help_heading("Plugin arguments"),
            );
        }
        run
    });
    (cmd, added)
}

fn help_text(spec: &ArgSpec) -> String {
    match &spec.default {
        Some(default) => format!("{} [default: {default}]", spec.description),
        None => spec.description.clone(),
    }
}

/// Pull the plugin argument values out of the `run` matches, in name order.
pub fn collect_values(run: &ArgMatches, names: &[String]) -> Vec<(String, Vec<String>)> {
    names
        .iter()
        .filter_map(|name| {
            let values: Vec<String> = run.get_many::<String>(name)?.cloned().collect();
            Some((name.clone(), values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Command {
        Command::new("validate").subcommand(
            Command::new("run").arg(Arg::new("tags").long("tags").action(ArgAction::Append)),
        )
    }

    #[test]
    fn shared_names_become_one_flag() {
        let specs = vec![
            ArgSpec::required("mapping-config", "config"),
            ArgSpec::optional("mapping-config", "config again"),
            ArgSpec::optional("audit-log", "log"),
        ];
        let (_, added) = extend_run_command(base(), &specs);
        assert_eq!(added, vec!["mapping-config", "audit-log"]);
    }

    #[test]
    fn builtin_names_are_not_shadowed() {
        let specs = vec![ArgSpec::optional("tags", "clash")];
        let (_, added) = extend_run_command(base(), &specs);
        assert!(added.is_empty());
    }

    #[test]
    fn repeated_flags_accumulate() {
        let specs = vec![ArgSpec::optional("source-project", "filter")];
        let (cmd, added) = extend_run_command(base(), &specs);
        let matches = cmd
            .try_get_matches_from([
                "validate",
                "run",
                "--source-project",
                "ENG",
                "--source-project",
                "OPS",
            ])
            .expect("parse");
        let run = matches.subcommand_matches("run").expect("run matches");
        assert_eq!(
            collect_values(run, &added),
            vec![(
                "source-project".to_string(),
                vec!["ENG".to_string(), "OPS".to_string()]
            )]
        );
    }

    #[test]
    fn absent_flags_are_skipped() {
        let specs = vec![ArgSpec::optional("audit-log", "log")];
        let (cmd, added) = extend_run_command(base(), &specs);
        let matches = cmd
            .try_get_matches_from(["validate", "run"])
            .expect("parse");
        let run = matches.subcommand_matches("run").expect("run matches");
        assert!(collect_values(run, &added).is_empty());
    }
}
