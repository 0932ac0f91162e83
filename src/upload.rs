//! Transcript upload and indexing.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};

use crate::backend::{TaskBackend, UploadRequest};
use crate::notify::Notifier;
use crate::recent::store::RecentStore;
use crate::recent::RECENT_MEETINGS;
use crate::{AppError, Result};

/// Build an [`UploadRequest`] from a transcript file on disk.
///
/// # Errors
///
/// Returns `AppError::Validation` for a blank meeting id and `AppError::Io`
/// if the file cannot be read.
pub async fn request_from_file(
    path: &Path,
    meeting_id: &str,
    title: &str,
) -> Result<UploadRequest> {
    if meeting_id.trim().is_empty() {
        return Err(AppError::Validation("meeting id must not be empty".into()));
    }
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::Io(format!("failed to read {}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "transcript.txt".to_owned(), |n| n.to_string_lossy().into_owned());
    Ok(UploadRequest {
        meeting_id: meeting_id.trim().to_owned(),
        title: title.to_owned(),
        file_name,
        content,
    })
}

/// Upload and index a transcript, then record its meeting id as recent.
///
/// # Errors
///
/// Returns the backend or transport error; the detail is also sent to the
/// notifier. Failing to persist the recency list is logged, not returned.
pub async fn upload_transcript(
    backend: &dyn TaskBackend,
    notifier: &dyn Notifier,
    recent: Option<&mut RecentStore>,
    request: &UploadRequest,
) -> Result<Value> {
    let span = info_span!(
        "upload_transcript",
        meeting_id = %request.meeting_id,
        bytes = request.content.len()
    );

    let reply = match backend.upload_transcript(request).instrument(span).await {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %err, "transcript upload failed");
            notifier.error("Upload failed", Some(&err.detail()));
            return Err(err);
        }
    };

    info!(meeting_id = %request.meeting_id, "transcript indexed");
    notifier.success(
        "Upload & index complete",
        Some(&json!({ "meetingId": request.meeting_id, "title": request.title })),
    );

    if let Some(store) = recent {
        if let Err(err) = store.record(RECENT_MEETINGS, &request.meeting_id) {
            warn!(error = %err, "failed to record recent meeting");
        }
    }

    Ok(reply)
}
