//! Candidate work items extracted from a transcript.

use serde::{Deserialize, Serialize};

/// A candidate unit of work extracted from a transcript.
///
/// Every field is optional: partial extraction results must still render.
/// The producer guarantees no identity field, so deduplication works on
/// [`Task::dedup_key`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    /// Short issue title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Tracker labels, in producer order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// Free-form hint naming who should own the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_hint: Option<String>,
    /// Free-form due-date hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_hint: Option<String>,
    /// Index of the transcript chunk that produced this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_i: Option<i64>,
    /// Upstream confidence score; range is not constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Task {
    /// Construct a task carrying only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Normalized title used as the deduplication key.
    ///
    /// Missing titles normalize to the empty string.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        normalize_title(self.title.as_deref().unwrap_or_default())
    }
}

/// Lowercase, collapse whitespace runs to one space, and trim.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
