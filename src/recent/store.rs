//! JSON-file persistence for recency lists keyed by category.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::RecencyList;
use crate::{AppError, Result};

/// On-disk layout of the recency file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecentFile {
    /// Last write time.
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    /// Lists keyed by category.
    #[serde(default)]
    lists: BTreeMap<String, RecencyList>,
}

/// Recency lists persisted to a single JSON file.
///
/// Writes go through a temporary file in the same directory and are renamed
/// into place, so a crash never leaves a truncated file.
#[derive(Debug)]
pub struct RecentStore {
    path: PathBuf,
    lists: BTreeMap<String, RecencyList>,
}

impl RecentStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields empty lists. A corrupt file is logged and
    /// treated as empty; it is replaced on the next write.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lists = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<RecentFile>(&raw) {
                Ok(file) => file.lists,
                Err(err) => {
                    warn!(path = %path.display(), %err, "recent store unreadable, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(AppError::Io(format!(
                    "failed to read recent store {}: {err}",
                    path.display()
                )))
            }
        };
        Ok(Self { path, lists })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries for `category`, most recent first.
    #[must_use]
    pub fn list(&self, category: &str) -> &[String] {
        self.lists
            .get(category)
            .map(RecencyList::items)
            .unwrap_or_default()
    }

    /// Record `value` under `category` and persist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be written.
    pub fn record(&mut self, category: &str, value: &str) -> Result<()> {
        self.lists
            .entry(category.to_owned())
            .or_default()
            .insert(value);
        self.save()
    }

    /// Persist all lists atomically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the directory or file cannot be written.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Io(format!("failed to create {}: {e}", dir.display()))
        })?;

        let file = RecentFile {
            updated_at: Some(Utc::now()),
            lists: self.lists.clone(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| {
            AppError::Io(format!(
                "failed to persist recent store {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        debug!(path = %self.path.display(), "recent store saved");
        Ok(())
    }
}
