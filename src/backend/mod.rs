//! Backend capabilities consumed by the client core.
//!
//! The [`TaskBackend`] trait decouples the extraction session, aggregator
//! and issue pipeline from the transport. [`http::HttpBackend`] is the
//! production implementation; tests substitute scripted backends.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncRead;

use crate::models::issue::{CreatedItem, IssueRequest, PreviewItem};
use crate::Result;

/// Readable body of an extraction stream.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed future returned by [`TaskBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Body of `POST /tasks/stream`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Meeting whose transcript is searched.
    pub meeting_id: String,
    /// Retrieval query.
    pub q: String,
    /// Number of transcript chunks fed to the model.
    ///
    /// The UI keeps this within `[1, 10]`; the core passes it through.
    pub k: u32,
}

impl ExtractRequest {
    /// Build a request for `query` against `meeting_id`.
    #[must_use]
    pub fn new(meeting_id: impl Into<String>, query: impl Into<String>, k: u32) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            q: query.into(),
            k,
        }
    }
}

/// Multipart body of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Meeting identifier the transcript is indexed under.
    pub meeting_id: String,
    /// Optional human-readable meeting title.
    pub title: String,
    /// File name reported to the backend.
    pub file_name: String,
    /// Raw transcript bytes.
    pub content: Vec<u8>,
}

/// Transport-agnostic interface to the extraction backend.
pub trait TaskBackend: Send + Sync {
    /// Open an extraction stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Http`](crate::AppError::Http) if the request
    /// cannot be sent, or [`AppError::Backend`](crate::AppError::Backend)
    /// for a non-success status.
    fn open_stream<'a>(&'a self, request: &'a ExtractRequest) -> BackendFuture<'a, ByteStream>;

    /// Dry-run issue creation; mutates nothing.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TaskBackend::open_stream`].
    fn preview_issues<'a>(&'a self, request: &'a IssueRequest)
        -> BackendFuture<'a, Vec<PreviewItem>>;

    /// Create issues in the tracker.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TaskBackend::open_stream`].
    fn create_issues<'a>(&'a self, request: &'a IssueRequest)
        -> BackendFuture<'a, Vec<CreatedItem>>;

    /// Upload and index a transcript; returns the backend's opaque reply.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TaskBackend::open_stream`].
    fn upload_transcript<'a>(&'a self, request: &'a UploadRequest) -> BackendFuture<'a, Value>;
}

/// Structured detail from an error response body.
///
/// Prefers the body's `detail` field, then the whole JSON body, then the
/// raw text, then an empty object.
#[must_use]
pub fn error_detail(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut map)) => match map.remove("detail") {
            Some(detail) if !detail.is_null() => detail,
            _ => Value::Object(map),
        },
        Ok(Value::Null) => Value::Object(serde_json::Map::new()),
        Ok(other) => other,
        Err(_) if body.trim().is_empty() => Value::Object(serde_json::Map::new()),
        Err(_) => Value::String(body.to_owned()),
    }
}
