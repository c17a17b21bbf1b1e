//! Whole-file replacement via temp file + rename.
//!
//! Readers see either the old content or the new content, never a torn
//! write. The temp file lives next to the target so the rename stays on the
//! same filesystem.

// Author: kelexine (https://github.com/kelexine)

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace the contents of `path` with `bytes`.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Atomically wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
