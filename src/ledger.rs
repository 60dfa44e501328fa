use crate::comment::SelectedComment;
use crate::store::{load_json, save_json};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

/// Every selection ever rendered, in selection order.
///
/// Entries are kept as raw JSON so that whatever earlier runs wrote is
/// rewritten unchanged. The whole document is rewritten on each append.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<Value>,
}

impl Ledger {
    /// A missing, unparsable or non-array document loads as an empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_json::<Value>(&path) {
            Ok(Some(Value::Array(entries))) => entries,
            Ok(Some(_)) => {
                warn!("{} is not a list, starting a fresh ledger", path.display());
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Ignoring unreadable ledger ({e:#}), starting a fresh ledger");
                Vec::new()
            }
        };
        Self { path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that still parse as selections, in order.
    pub fn selections(&self) -> Vec<SelectedComment> {
        self.entries
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect()
    }

    pub fn append(&mut self, entry: &SelectedComment) -> anyhow::Result<()> {
        let mut entries = self.entries.clone();
        entries.push(serde_json::to_value(entry)?);
        save_json(&self.path, &entries)?;
        self.entries = entries;
        info!("Ledger {} now holds {} selections", self.path.display(), self.len());
        Ok(())
    }
}
