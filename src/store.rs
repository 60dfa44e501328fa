use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replaces `path` with `bytes` through a temp file in the same directory.
/// Readers see either the old content or the new content, never a torn write.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("cannot write temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("cannot sync temp file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("cannot persist {}", path.display()))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &data)
}

/// `Ok(None)` when the file does not exist; parse errors are returned to the caller.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value = serde_json::from_str(&data)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    Ok(Some(value))
}

/// Presence-only flag file. The content is a note for humans and never read back.
#[derive(Debug, Clone, Copy)]
pub struct Sentinel<'a> {
    path: &'a Path,
}

impl<'a> Sentinel<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    pub fn raise(&self, note: &str) -> anyhow::Result<()> {
        write_atomic(self.path, note.as_bytes())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(self.path)
                .with_context(|| format!("cannot remove {}", self.path.display()))?;
            debug!("Cleared stale flag {}", self.path.display());
        }
        Ok(())
    }

    pub fn is_raised(&self) -> bool {
        self.path.exists()
    }
}
