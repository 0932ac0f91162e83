//! End-to-end tests for the reqwest backend against a local axum server.
//!
//! The server streams extraction records in deliberately awkward chunks so
//! the client decodes across real network reads.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use meeting_tasks::backend::http::HttpBackend;
use meeting_tasks::backend::{ExtractRequest, TaskBackend, UploadRequest};
use meeting_tasks::config::ClientConfig;
use meeting_tasks::issues::pipeline::IssuePipeline;
use meeting_tasks::models::event::ResultMode;
use meeting_tasks::models::issue::IssueRequest;
use meeting_tasks::models::state::Stage;
use meeting_tasks::models::task::Task;
use meeting_tasks::notify::Notifier;
use meeting_tasks::orchestrator::session::ExtractionSession;
use meeting_tasks::AppError;

use super::test_helpers::RecordingNotifier;

async fn stream_handler(Json(body): Json<Value>) -> Response {
    if body["meeting_id"] == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": {"error": "meeting not indexed"}})),
        )
            .into_response();
    }

    let query = body["q"].as_str().unwrap_or_default().to_owned();
    let k = body["k"].as_u64().unwrap_or_default();
    let done = json!({
        "stage": "done",
        "mode": "ollama",
        "tasks": [{"title": format!("{query} ☕ k={k}")}]
    });
    let stream = format!(
        ": ping\n\ndata: {}\n\ndata: {{bad\n\ndata: {}\n\ndata: {done}\n\n",
        json!({"stage": "retrieving", "progress": 10}),
        json!({"stage": "ollama", "progress": 55}),
    )
    .into_bytes();

    // Split every 7 bytes so delimiters and the multi-byte cup straddle reads.
    let chunks: Vec<Result<Bytes, Infallible>> = stream
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
        .into_response()
}

async fn preview_handler(Json(body): Json<Value>) -> Json<Value> {
    let items: Vec<Value> = body["tasks"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|t| json!({"title": t["title"], "body": "", "labels": ["meeting"]}))
        .collect();
    Json(json!({"would_create": items}))
}

async fn issues_handler(Json(body): Json<Value>) -> Response {
    match body["repo"].as_str() {
        Some("octocat/broken") => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"detail": {"github": "unavailable"}})),
        )
            .into_response(),
        Some("octocat/plain") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!({
            "created": [
                {"number": 1, "url": "https://github.com/o/r/issues/1", "title": "A", "status": "created"},
                {"title": "B", "status": "skipped-duplicate"}
            ],
            "assignees_seen": body["assignee_map"],
        }))
        .into_response(),
    }
}

async fn upload_handler(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let text = String::from_utf8_lossy(&body).into_owned();
    Json(json!({
        "multipart": content_type.starts_with("multipart/form-data"),
        "has_meeting": text.contains("name=\"meeting_id\"") && text.contains("standup-01"),
        "has_file": text.contains("filename=\"standup.txt\"") && text.contains("ship it"),
    }))
}

/// Serve the fake backend on an ephemeral port and return its base URL.
async fn spawn_server() -> String {
    let app = Router::new()
        .route("/tasks/stream", post(stream_handler))
        .route("/issues/preview", post(preview_handler))
        .route("/issues", post(issues_handler))
        .route("/upload", post(upload_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });
    format!("http://{addr}")
}

async fn backend() -> Arc<HttpBackend> {
    let config = ClientConfig {
        api_base: format!("{}/", spawn_server().await),
        ..ClientConfig::default()
    };
    Arc::new(HttpBackend::new(&config).expect("client builds"))
}

fn issue_request(repo: &str) -> IssueRequest {
    IssueRequest {
        repo: repo.to_owned(),
        meeting_id: "standup-01".into(),
        tasks: vec![Task::titled("A"), Task::titled("B")],
        assignee_map: std::collections::HashMap::new(),
    }
}

#[tokio::test]
async fn streamed_extraction_decodes_across_network_reads() {
    let backend = backend().await;
    let notifier = RecordingNotifier::new();
    let session = ExtractionSession::new(
        backend as Arc<dyn TaskBackend>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    let state = session
        .extract(&ExtractRequest::new("standup-01", "action items", 6))
        .await
        .expect("stream opens");

    assert_eq!(state.stage, Stage::Done);
    assert_eq!(state.progress, 100);
    assert_eq!(state.mode, Some(ResultMode::Ollama));
    assert_eq!(state.tasks, vec![Task::titled("action items ☕ k=6")]);
    assert!(notifier.all().is_empty());
}

#[tokio::test]
async fn stream_error_status_surfaces_detail() {
    let backend = backend().await;
    let notifier = RecordingNotifier::new();
    let session = ExtractionSession::new(
        backend as Arc<dyn TaskBackend>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    let result = session
        .extract(&ExtractRequest::new("missing", "risks", 5))
        .await;

    assert!(matches!(result, Err(AppError::Backend { status: 404, .. })));
    assert_eq!(session.state().stage, Stage::Error);
    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].detail, Some(json!({"error": "meeting not indexed"})));
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    let config = ClientConfig {
        api_base: "http://127.0.0.1:9".into(),
        ..ClientConfig::default()
    };
    let backend = HttpBackend::new(&config).expect("client builds");

    let result = backend.preview_issues(&issue_request("octocat/hello-world")).await;
    assert!(matches!(result, Err(AppError::Http(_))));
}

#[tokio::test]
async fn preview_decodes_would_create() {
    let backend = backend().await;
    let items = backend
        .preview_issues(&issue_request("octocat/hello-world"))
        .await
        .expect("ok");

    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["A", "B"]);
    assert_eq!(items[0].labels, ["meeting"]);
}

#[tokio::test]
async fn create_decodes_created_and_error_detail() {
    let backend = backend().await;

    let items = backend
        .create_issues(&issue_request("octocat/hello-world"))
        .await
        .expect("ok");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].number, Some(1));
    assert_eq!(items[1].status, "skipped-duplicate");

    let err = backend
        .create_issues(&issue_request("octocat/broken"))
        .await
        .expect_err("502");
    assert!(matches!(err, AppError::Backend { status: 502, .. }));
    assert_eq!(err.detail(), json!({"github": "unavailable"}));

    let err = backend
        .create_issues(&issue_request("octocat/plain"))
        .await
        .expect_err("500");
    assert_eq!(err.detail(), json!("boom"));
}

#[tokio::test]
async fn pipeline_create_over_http_reports_summary() {
    let backend = backend().await;
    let notifier = RecordingNotifier::new();
    let mut pipeline = IssuePipeline::new(
        backend as Arc<dyn TaskBackend>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    );

    let report = pipeline
        .create("octocat/hello-world", "standup-01", &[Task::titled("A")])
        .await
        .expect("ok");

    assert_eq!(report.summary.created, 1);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(notifier.all()[0].title, "Created 1, skipped 1 (1 duplicates)");
}

#[tokio::test]
async fn upload_sends_multipart_form() {
    let backend = backend().await;
    let request = UploadRequest {
        meeting_id: "standup-01".into(),
        title: "Daily".into(),
        file_name: "standup.txt".into(),
        content: b"Bob: ship it".to_vec(),
    };

    let reply = backend.upload_transcript(&request).await.expect("ok");
    assert_eq!(
        reply,
        json!({"multipart": true, "has_meeting": true, "has_file": true})
    );
}
