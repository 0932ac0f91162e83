//! Issue preview and creation outcomes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::task::Task;

/// Status reported for a freshly created issue.
pub const STATUS_CREATED: &str = "created";

/// Status reported when the tracker already holds an equivalent issue.
pub const STATUS_SKIPPED_DUPLICATE: &str = "skipped-duplicate";

/// Request body shared by `/issues/preview` and `/issues`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IssueRequest {
    /// Target repository slug (`owner/name`).
    pub repo: String,
    /// Meeting the tasks were extracted from.
    pub meeting_id: String,
    /// Tasks to turn into issues.
    pub tasks: Vec<Task>,
    /// Assignee hint to tracker username mapping.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub assignee_map: HashMap<String, String>,
}

/// A proposed issue returned by the dry-run preview. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreviewItem {
    /// Proposed title.
    #[serde(default)]
    pub title: String,
    /// Proposed body.
    #[serde(default)]
    pub body: String,
    /// Proposed labels.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Outcome of one real creation attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedItem {
    /// Tracker issue number, when one was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    /// Issue URL, when one was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Issue title.
    #[serde(default)]
    pub title: String,
    /// Status discriminator (`created`, `skipped-duplicate`, ...).
    #[serde(default)]
    pub status: String,
}

/// Classification of a [`CreatedItem::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Status was exactly `created`.
    Created,
    /// Status was exactly `skipped-duplicate`.
    SkippedDuplicate,
    /// Any other status.
    Skipped,
}

impl CreatedItem {
    /// Classify this item's status.
    #[must_use]
    pub fn outcome(&self) -> CreateOutcome {
        match self.status.as_str() {
            STATUS_CREATED => CreateOutcome::Created,
            STATUS_SKIPPED_DUPLICATE => CreateOutcome::SkippedDuplicate,
            _ => CreateOutcome::Skipped,
        }
    }
}

/// Summary counts over a creation result.
///
/// `skipped` counts every non-created item, duplicates included;
/// `duplicates` breaks those out for the user-facing message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreateSummary {
    /// Items with status `created`.
    pub created: usize,
    /// Items with status `skipped-duplicate`.
    pub duplicates: usize,
    /// Total minus created.
    pub skipped: usize,
}

impl CreateSummary {
    /// Derive the counts from a creation result.
    #[must_use]
    pub fn from_items(items: &[CreatedItem]) -> Self {
        let created = items
            .iter()
            .filter(|i| i.outcome() == CreateOutcome::Created)
            .count();
        let duplicates = items
            .iter()
            .filter(|i| i.outcome() == CreateOutcome::SkippedDuplicate)
            .count();
        Self {
            created,
            duplicates,
            skipped: items.len() - created,
        }
    }

    /// User-facing message, e.g. `Created 2, skipped 2 (1 duplicates)`.
    #[must_use]
    pub fn message(&self) -> String {
        let mut msg = format!("Created {}, skipped {}", self.created, self.skipped);
        if self.duplicates > 0 {
            msg.push_str(&format!(" ({} duplicates)", self.duplicates));
        }
        msg
    }
}
