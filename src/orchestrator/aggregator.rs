//! Sequential multi-query extraction with duplicate suppression.
//!
//! Queries run one after another through the same [`ExtractionSession`] so
//! the backend model is never asked for two extractions at once and a single
//! progress indicator stays meaningful. Once every query has finished the
//! collected tasks are merged and deduplicated by normalized title.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::backend::ExtractRequest;
use crate::models::event::ResultMode;
use crate::models::state::{SessionState, Stage, MAX_PROGRESS};
use crate::models::task::Task;
use crate::orchestrator::session::ExtractionSession;
use crate::{AppError, Result};

/// Progress shown while the first query is being submitted.
pub const AGGREGATE_START_PROGRESS: u8 = 10;

/// Trim queries and drop blanks and repeats, keeping first-seen order.
#[must_use]
pub fn distinct_queries<S: AsRef<str>>(queries: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .iter()
        .map(|q| q.as_ref().trim())
        .filter(|q| !q.is_empty() && seen.insert(q.to_string()))
        .map(str::to_owned)
        .collect()
}

/// Drop tasks with an empty normalized title and later duplicates.
///
/// The key is the lowercased title with whitespace runs collapsed and ends
/// trimmed; the first occurrence of a key wins.
#[must_use]
pub fn dedupe_tasks(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            let key = task.dedup_key();
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

/// Run one extraction per query, strictly in order, and merge the results.
///
/// A query whose stream cannot be opened contributes no tasks (the failure
/// is already reported by the session). If a sub-session is aborted the run
/// stops and the aborted state is returned without merging.
///
/// On completion the visible state becomes `done` at 100% with the merged
/// task list, regardless of the last sub-session's own stage.
///
/// # Errors
///
/// Returns `AppError::Validation` if `meeting_id` is blank or no non-blank
/// query remains after deduplication.
pub async fn run_queries<S: AsRef<str>>(
    session: &ExtractionSession,
    meeting_id: &str,
    queries: &[S],
    k: u32,
) -> Result<SessionState> {
    let queries = distinct_queries(queries);
    if meeting_id.trim().is_empty() {
        return Err(AppError::Validation("meeting id must not be empty".into()));
    }
    if queries.is_empty() {
        return Err(AppError::Validation("at least one query is required".into()));
    }
    info!(meeting_id, queries = queries.len(), "multi-query extraction started");

    let mut generation = session.replace_if_idle(SessionState {
        stage: Stage::Retrieving,
        progress: AGGREGATE_START_PROGRESS,
        active: true,
        ..SessionState::idle()
    });

    let mut collected = Vec::new();
    let mut modes: Vec<Option<ResultMode>> = Vec::new();

    for query in &queries {
        let request = ExtractRequest::new(meeting_id, query.as_str(), k);
        let (sub_generation, outcome) = session.run(&request).await;
        generation = Some(sub_generation);

        match outcome {
            Ok(state) if state.stage == Stage::Aborted => {
                info!(query = %query, "multi-query extraction aborted");
                return Ok(state);
            }
            Ok(state) => {
                modes.push(state.mode);
                collected.extend(state.tasks);
            }
            Err(err) => {
                warn!(query = %query, error = %err, "query failed, continuing with the rest");
            }
        }
    }

    let tasks = dedupe_tasks(collected);
    let merged = SessionState {
        stage: Stage::Done,
        progress: MAX_PROGRESS,
        mode: common_mode(modes),
        tasks,
        active: false,
        error: None,
    };

    if let Some(generation) = generation {
        session.replace_if_current(generation, merged.clone());
    }
    info!(tasks = merged.tasks.len(), "multi-query extraction finished");
    Ok(merged)
}

/// The mode shared by every sub-session, if they all agree.
fn common_mode(modes: Vec<Option<ResultMode>>) -> Option<ResultMode> {
    let mut iter = modes.into_iter();
    let first = iter.next()??;
    iter.all(|m| m.as_ref() == Some(&first)).then_some(first)
}
