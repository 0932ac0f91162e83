//! Bounded most-recently-used lists of prior input values.
//!
//! Used for input assistance only: recent meeting identifiers and
//! repository slugs. [`store::RecentStore`] persists the lists across runs.

pub mod store;

use serde::{Deserialize, Serialize};

/// Maximum entries kept per list.
pub const RECENT_CAP: usize = 10;

/// Category key for recent meeting identifiers.
pub const RECENT_MEETINGS: &str = "recentMeetings";

/// Category key for recent repository slugs.
pub const RECENT_REPOS: &str = "recentRepos";

/// Deduplicated, most-recent-first list capped at [`RECENT_CAP`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RecencyList {
    items: Vec<String>,
}

impl RecencyList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `value` to the front, evicting the oldest entry past the cap.
    ///
    /// Blank values are ignored.
    pub fn insert(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.items.retain(|existing| *existing != value);
        self.items.insert(0, value);
        self.items.truncate(RECENT_CAP);
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<String>> for RecencyList {
    /// Rebuild from persisted order, dropping duplicates and overflow.
    fn from(values: Vec<String>) -> Self {
        let mut items: Vec<String> = Vec::with_capacity(values.len().min(RECENT_CAP));
        for value in values {
            if value.trim().is_empty() || items.contains(&value) {
                continue;
            }
            items.push(value);
            if items.len() == RECENT_CAP {
                break;
            }
        }
        Self { items }
    }
}

impl From<RecencyList> for Vec<String> {
    fn from(list: RecencyList) -> Self {
        list.items
    }
}
