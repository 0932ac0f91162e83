//! reqwest-backed [`TaskBackend`].

use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::io::StreamReader;
use tracing::{debug, info_span, warn, Instrument};

use crate::backend::{
    error_detail, BackendFuture, ByteStream, ExtractRequest, TaskBackend, UploadRequest,
};
use crate::config::ClientConfig;
use crate::models::issue::{CreatedItem, IssueRequest, PreviewItem};
use crate::{AppError, Result};

/// Extraction stream endpoint.
pub const STREAM_PATH: &str = "/tasks/stream";
/// Dry-run issue endpoint.
pub const PREVIEW_PATH: &str = "/issues/preview";
/// Issue creation endpoint.
pub const ISSUES_PATH: &str = "/issues";
/// Transcript upload endpoint.
pub const UPLOAD_PATH: &str = "/upload";

/// HTTP client for the extraction backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    api_base: String,
    request_timeout: Duration,
}

impl HttpBackend {
    /// Build a backend client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` if the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|err| AppError::Http(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            request_timeout: config.timeouts.request(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    /// POST a JSON body and read the JSON reply, bounded by the request timeout.
    async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value>
    where
        B: serde::Serialize + Sync,
    {
        let response = self
            .client
            .post(self.url(path))
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| AppError::Http(format!("POST {path} failed: {err}")))?;
        read_json(path, response).await
    }
}

impl TaskBackend for HttpBackend {
    fn open_stream<'a>(&'a self, request: &'a ExtractRequest) -> BackendFuture<'a, ByteStream> {
        let span = info_span!("open_stream", meeting_id = %request.meeting_id, q = %request.q);
        Box::pin(
            async move {
                let response = self
                    .client
                    .post(self.url(STREAM_PATH))
                    .json(request)
                    .send()
                    .await
                    .map_err(|err| AppError::Http(format!("POST {STREAM_PATH} failed: {err}")))?;

                let response = ensure_success(STREAM_PATH, response).await?;
                debug!("extraction stream opened");

                let body = response.bytes_stream().map_err(std::io::Error::other);
                let reader: ByteStream = Box::new(StreamReader::new(Box::pin(body)));
                Ok(reader)
            }
            .instrument(span),
        )
    }

    fn preview_issues<'a>(
        &'a self,
        request: &'a IssueRequest,
    ) -> BackendFuture<'a, Vec<PreviewItem>> {
        Box::pin(async move {
            let reply = self.post_json(PREVIEW_PATH, request).await?;
            items_field(reply, "would_create")
        })
    }

    fn create_issues<'a>(
        &'a self,
        request: &'a IssueRequest,
    ) -> BackendFuture<'a, Vec<CreatedItem>> {
        Box::pin(async move {
            let reply = self.post_json(ISSUES_PATH, request).await?;
            items_field(reply, "created")
        })
    }

    fn upload_transcript<'a>(&'a self, request: &'a UploadRequest) -> BackendFuture<'a, Value> {
        Box::pin(async move {
            let file = Part::bytes(request.content.clone()).file_name(request.file_name.clone());
            let form = Form::new()
                .part("file", file)
                .text("meeting_id", request.meeting_id.clone())
                .text("title", request.title.clone());

            let response = self
                .client
                .post(self.url(UPLOAD_PATH))
                .timeout(self.request_timeout)
                .multipart(form)
                .send()
                .await
                .map_err(|err| AppError::Http(format!("POST {UPLOAD_PATH} failed: {err}")))?;
            read_json(UPLOAD_PATH, response).await
        })
    }
}

/// Map a non-success status to [`AppError::Backend`] with its decoded detail.
async fn ensure_success(path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(path, status = status.as_u16(), "backend returned an error status");
    Err(AppError::Backend {
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

/// Read a JSON reply; an unreadable success body decodes as `{}`.
async fn read_json(path: &str, response: Response) -> Result<Value> {
    let response = ensure_success(path, response).await?;
    let body = response
        .text()
        .await
        .map_err(|err| AppError::Http(format!("failed to read {path} reply: {err}")))?;
    Ok(serde_json::from_str(&body).unwrap_or_else(|_| Value::Object(serde_json::Map::new())))
}

/// Decode `reply[key]` as a list; a missing or non-array field is empty.
fn items_field<T: DeserializeOwned>(mut reply: Value, key: &str) -> Result<Vec<T>> {
    match reply.get_mut(key).map(Value::take) {
        Some(items @ Value::Array(_)) => Ok(serde_json::from_value(items)?),
        _ => Ok(Vec::new()),
    }
}
