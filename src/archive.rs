use crate::ledger::Ledger;
use anyhow::Context;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const FINAL_SUFFIX: &str = "_final.png";
const GENERATED_SUFFIX: &str = "_generated.png";

/// Sequence number of a run's archived artifacts, shown as 4 digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveIndex(pub u32);

impl ArchiveIndex {
    pub fn after(existing: usize) -> anyhow::Result<Self> {
        let n = u32::try_from(existing).context("archive count does not fit in u32")?;
        Ok(Self(n + 1))
    }

    pub fn generated_name(&self) -> String {
        format!("{self}{GENERATED_SUFFIX}")
    }

    pub fn final_name(&self) -> String {
        format!("{self}{FINAL_SUFFIX}")
    }
}

impl fmt::Display for ArchiveIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Allocates the next archive index. The value is derived from what already
/// exists each time it is asked; there is no stored counter.
pub trait IndexSource {
    fn next_index(&self) -> anyhow::Result<ArchiveIndex>;
}

/// Counts finished thumbnails (`NNNN_final.png`) in the archive directory.
/// A pruned archive hands out an index again; nothing here detects that.
pub struct ArchiveDirectory {
    dir: PathBuf,
}

impl ArchiveDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn count_finals(&self) -> anyhow::Result<usize> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create archive dir {}", self.dir.display()))?;
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("cannot list archive dir {}", self.dir.display()))?
        {
            let entry = entry.with_context(|| format!("cannot list archive dir {}", self.dir.display()))?;
            if entry.file_name().to_string_lossy().ends_with(FINAL_SUFFIX) {
                count += 1;
            }
        }
        debug!("Found {} archived thumbnails in {}", count, self.dir.display());
        Ok(count)
    }
}

impl IndexSource for ArchiveDirectory {
    fn next_index(&self) -> anyhow::Result<ArchiveIndex> {
        ArchiveIndex::after(self.count_finals()?)
    }
}

/// Derives the index from how many selections the ledger already holds.
pub struct LedgerLength<'a>(pub &'a Ledger);

impl IndexSource for LedgerLength<'_> {
    fn next_index(&self) -> anyhow::Result<ArchiveIndex> {
        ArchiveIndex::after(self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::{SelectedComment, sample};

    #[test]
    fn index_formats_with_four_digits() {
        assert_eq!(ArchiveIndex(4).to_string(), "0004");
        assert_eq!(ArchiveIndex(123).final_name(), "0123_final.png");
        assert_eq!(ArchiveIndex(9).generated_name(), "0009_generated.png");
        assert_eq!(ArchiveIndex(12345).to_string(), "12345");
    }

    #[test]
    fn empty_or_missing_directory_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let archives = dir.path().join("archives");
        let archive = ArchiveDirectory::new(&archives);
        assert_eq!(archive.next_index().unwrap(), ArchiveIndex(1));
        assert!(archives.is_dir());
    }

    #[test]
    fn counts_only_final_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ArchiveDirectory::new(dir.path());
        for name in ["0001_final.png", "0001_generated.png", "0002_final.png", "0003_final.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let next = archive.next_index().unwrap();
        assert_eq!(next.to_string(), "0004");

        fs::write(dir.path().join(next.final_name()), b"").unwrap();
        assert_eq!(archive.next_index().unwrap().to_string(), "0005");
    }

    #[test]
    fn unreadable_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("archives");
        fs::write(&not_a_dir, b"file in the way").unwrap();
        assert!(ArchiveDirectory::new(not_a_dir).next_index().is_err());
    }

    #[test]
    fn ledger_length_source_follows_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(dir.path().join("selected_comments.json"));
        assert_eq!(LedgerLength(&ledger).next_index().unwrap(), ArchiveIndex(1));

        for i in 0..3 {
            ledger.append(&SelectedComment::pending(sample("a", 1, i))).unwrap();
        }
        assert_eq!(LedgerLength(&ledger).next_index().unwrap().to_string(), "0004");
    }
}
