//! Port traits abstracting all I/O away from the pipeline.

use camino::Utf8Path;
use validate_domain::PluginEntry;

/// Where plugins come from. Returns a flat list of descriptor + factory pairs.
pub trait PluginSource {
    fn discover(&self) -> anyhow::Result<Vec<PluginEntry>>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
