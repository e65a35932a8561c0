//! Atomic file writes using a temp-and-rename strategy.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use super::paths::ensure_dir;

/// Writes `content` to `path` atomically.
///
/// The content goes to a sibling temporary file which is synced and then
/// renamed over the destination, so readers never observe a half-written
/// generated cache. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    ensure_dir(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}
