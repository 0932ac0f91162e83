//! Preview and create flows for extracted tasks.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, info_span, warn, Instrument};

use crate::backend::TaskBackend;
use crate::issues::slug::{looks_like_slug, validate_repo_slug};
use crate::models::issue::{CreateSummary, CreatedItem, IssueRequest, PreviewItem};
use crate::models::task::Task;
use crate::notify::Notifier;
use crate::recent::store::RecentStore;
use crate::recent::RECENT_REPOS;
use crate::Result;

/// Notification title used when the slug guard rejects a create.
pub const INVALID_REPO_TITLE: &str = "Please enter a real GitHub repo like yourname/yourrepo";

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReport {
    /// Per-task outcomes, in submission order.
    pub items: Vec<CreatedItem>,
    /// Counts derived from `items`.
    pub summary: CreateSummary,
}

/// Preview/create pipeline holding the last successful results.
pub struct IssuePipeline {
    backend: Arc<dyn TaskBackend>,
    notifier: Arc<dyn Notifier>,
    assignee_map: HashMap<String, String>,
    recent: Option<RecentStore>,
    preview: Option<Vec<PreviewItem>>,
    created: Option<Vec<CreatedItem>>,
}

impl IssuePipeline {
    /// Create a pipeline with no prior results.
    #[must_use]
    pub fn new(backend: Arc<dyn TaskBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            assignee_map: HashMap::new(),
            recent: None,
            preview: None,
            created: None,
        }
    }

    /// Forward an assignee-hint mapping with every request.
    #[must_use]
    pub fn with_assignees(mut self, assignee_map: HashMap<String, String>) -> Self {
        self.assignee_map = assignee_map;
        self
    }

    /// Record well-formed repository slugs in `store`.
    #[must_use]
    pub fn with_recent(mut self, store: RecentStore) -> Self {
        self.recent = Some(store);
        self
    }

    /// Last successful preview, if any.
    #[must_use]
    pub fn preview_items(&self) -> Option<&[PreviewItem]> {
        self.preview.as_deref()
    }

    /// Last successful creation result, if any.
    #[must_use]
    pub fn created_items(&self) -> Option<&[CreatedItem]> {
        self.created.as_deref()
    }

    /// Recency store, when attached.
    #[must_use]
    pub fn recent(&self) -> Option<&RecentStore> {
        self.recent.as_ref()
    }

    /// Dry-run issue creation for `tasks`.
    ///
    /// The previous preview is only replaced on success.
    ///
    /// # Errors
    ///
    /// Returns the backend or transport error; the detail is also sent to
    /// the notifier.
    pub async fn preview(
        &mut self,
        repo: &str,
        meeting_id: &str,
        tasks: &[Task],
    ) -> Result<&[PreviewItem]> {
        self.remember_repo(repo);
        let request = self.request(repo.trim(), meeting_id, tasks);

        let result = self
            .backend
            .preview_issues(&request)
            .instrument(info_span!("preview_issues", repo = %request.repo))
            .await;

        match result {
            Ok(items) => {
                info!(items = items.len(), "issue preview received");
                Ok(self.preview.insert(items).as_slice())
            }
            Err(err) => {
                warn!(error = %err, "issue preview failed");
                self.notifier.error("Preview failed", Some(&err.detail()));
                Err(err)
            }
        }
    }

    /// Create issues for `tasks` in `repo`.
    ///
    /// The slug guard runs first; a rejected slug never reaches the
    /// network and leaves all state unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a bad slug, or the backend or
    /// transport error. Both are also sent to the notifier.
    pub async fn create(
        &mut self,
        repo: &str,
        meeting_id: &str,
        tasks: &[Task],
    ) -> Result<CreateReport> {
        let repo = match validate_repo_slug(repo) {
            Ok(repo) => repo,
            Err(err) => {
                self.notifier.error(INVALID_REPO_TITLE, None);
                return Err(err);
            }
        };
        self.remember_repo(repo);
        let request = self.request(repo, meeting_id, tasks);

        let result = self
            .backend
            .create_issues(&request)
            .instrument(info_span!("create_issues", repo = %request.repo))
            .await;

        match result {
            Ok(items) => {
                let summary = CreateSummary::from_items(&items);
                info!(
                    created = summary.created,
                    skipped = summary.skipped,
                    duplicates = summary.duplicates,
                    "issues submitted"
                );
                self.notifier.success(
                    &summary.message(),
                    Some(&json!({ "repo": request.repo, "summary": summary })),
                );
                self.created = Some(items.clone());
                Ok(CreateReport { items, summary })
            }
            Err(err) => {
                warn!(error = %err, "issue creation failed");
                self.notifier
                    .error("Failed to create issues", Some(&err.detail()));
                Err(err)
            }
        }
    }

    fn request(&self, repo: &str, meeting_id: &str, tasks: &[Task]) -> IssueRequest {
        IssueRequest {
            repo: repo.to_owned(),
            meeting_id: meeting_id.to_owned(),
            tasks: tasks.to_vec(),
            assignee_map: self.assignee_map.clone(),
        }
    }

    fn remember_repo(&mut self, repo: &str) {
        if !looks_like_slug(repo) {
            return;
        }
        if let Some(store) = self.recent.as_mut() {
            if let Err(err) = store.record(RECENT_REPOS, repo.trim()) {
                warn!(error = %err, "failed to record recent repository");
            }
        }
    }
}
