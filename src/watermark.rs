use crate::store::{load_json, save_json};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Epoch seconds of the last run that produced a final thumbnail. Zero means none yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Watermark {
    #[serde(default)]
    pub timestamp: i64,
}

impl Watermark {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp }
    }

    /// Unbounded history mode: no time cut, first-run cap applies instead.
    pub fn is_unset(&self) -> bool {
        self.timestamp <= 0
    }

    /// Never moves backwards, even if the clock does.
    pub fn advanced_to(self, now: i64) -> Self {
        Self::new(self.timestamp.max(now))
    }

    pub fn describe(&self) -> String {
        if self.is_unset() {
            return "none".to_string();
        }
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable state falls back to timestamp 0.
    pub fn load(&self) -> Watermark {
        match load_json::<Watermark>(&self.path) {
            Ok(Some(w)) => {
                info!("Last update loaded: {}", w.describe());
                w
            }
            Ok(None) => {
                let w = Watermark::default();
                match save_json(&self.path, &w) {
                    Ok(()) => info!("Created {} with timestamp 0", self.path.display()),
                    Err(e) => warn!("Cannot create {} ({e:#}), continuing with timestamp 0", self.path.display()),
                }
                w
            }
            Err(e) => {
                warn!("Ignoring unreadable watermark ({e:#}), using timestamp 0");
                Watermark::default()
            }
        }
    }

    /// Call only once the run's final artifact is on disk.
    pub fn commit(&self, watermark: Watermark) -> anyhow::Result<()> {
        save_json(&self.path, &watermark)?;
        info!("Watermark moved to {}", watermark.describe());
        Ok(())
    }
}
