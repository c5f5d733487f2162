//! Default port implementations.

use crate::ports::{PluginSource, WritePort};
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use tracing::debug;
use validate_domain::PluginEntry;

/// Compiled-in plugin list.
#[derive(Debug, Clone, Default)]
pub struct StaticPluginSource {
    entries: Vec<PluginEntry>,
}

impl StaticPluginSource {
    pub fn new(entries: Vec<PluginEntry>) -> Self {
        Self { entries }
    }

    /// Concatenate several plugin families, keeping each family's order.
    pub fn from_families<I>(families: I) -> Self
    where
        I: IntoIterator<Item = Vec<PluginEntry>>,
    {
        Self {
            entries: families.into_iter().flatten().collect(),
        }
    }
}

impl PluginSource for StaticPluginSource {
    fn discover(&self) -> anyhow::Result<Vec<PluginEntry>> {
        debug!(plugins = self.entries.len(), "discovered static plugins");
        Ok(self.entries.clone())
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
