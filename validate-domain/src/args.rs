use crate::descriptor::ArgSpec;
use std::collections::BTreeMap;

/// Where an argument value came from. Later sources win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgSource {
    Default,
    Settings,
    Cli,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgValue {
    pub values: Vec<String>,
    pub source: ArgSource,
}

/// Flat, name-keyed argument set shared by every plugin in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    values: BTreeMap<String, ArgValue>,
}

impl RunArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value, replacing whatever a lower-or-equal source put there.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>, source: ArgSource) {
        let name = name.into();
        if let Some(existing) = self.values.get(&name)
            && existing.source > source
        {
            return;
        }
        self.values.insert(
            name,
            ArgValue {
                values: vec![value.into()],
                source,
            },
        );
    }

    /// Append a value. Repeated values from the same source accumulate.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>, source: ArgSource) {
        let name = name.into();
        let value = value.into();
        match self.values.get_mut(&name) {
            Some(existing) if existing.source == source => existing.values.push(value),
            Some(existing) if existing.source > source => {}
            _ => {
                self.values.insert(
                    name,
                    ArgValue {
                        values: vec![value],
                        source,
                    },
                );
            }
        }
    }

    /// Fill declared defaults for arguments nobody supplied.
    pub fn apply_defaults<'a>(&mut self, specs: impl IntoIterator<Item = &'a ArgSpec>) {
        for spec in specs {
            if let Some(default) = &spec.default
                && !self.values.contains_key(&spec.name)
            {
                self.set(spec.name.clone(), default.clone(), ArgSource::Default);
            }
        }
    }

    /// Last value supplied for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.values.last())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.values
            .get(name)
            .map(|v| v.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn source(&self, name: &str) -> Option<ArgSource> {
        self.values.get(name).map(|v| v.source)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Supplied by the caller (settings file or command line), not a plugin default.
    pub fn is_supplied(&self, name: &str) -> bool {
        matches!(
            self.source(name),
            Some(ArgSource::Settings | ArgSource::Cli)
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_overrides_settings_overrides_default() {
        let mut args = RunArgs::new();
        args.apply_defaults([&ArgSpec::optional("level", "").with_default("1")]);
        assert_eq!(args.get("level"), Some("1"));
        assert!(!args.is_supplied("level"));

        args.set("level", "2", ArgSource::Settings);
        assert_eq!(args.get("level"), Some("2"));

        args.set("level", "3", ArgSource::Cli);
        args.set("level", "4", ArgSource::Settings);
        assert_eq!(args.get("level"), Some("3"));
        assert_eq!(args.source("level"), Some(ArgSource::Cli));
    }

    #[test]
    fn defaults_do_not_replace_supplied_values() {
        let mut args = RunArgs::new();
        args.set("path", "given", ArgSource::Settings);
        args.apply_defaults([&ArgSpec::optional("path", "").with_default("fallback")]);
        assert_eq!(args.get("path"), Some("given"));
    }

    #[test]
    fn push_accumulates_within_one_source() {
        let mut args = RunArgs::new();
        args.push("tag", "a", ArgSource::Settings);
        args.push("tag", "b", ArgSource::Cli);
        args.push("tag", "c", ArgSource::Cli);
        assert_eq!(args.get_all("tag"), ["b".to_string(), "c".to_string()]);
        assert_eq!(args.get("tag"), Some("c"));
        assert!(args.get_all("missing").is_empty());
    }
}
