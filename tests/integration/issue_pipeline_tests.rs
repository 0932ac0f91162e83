//! Integration tests for the preview/create pipeline and transcript upload.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use meeting_tasks::backend::TaskBackend;
use meeting_tasks::issues::pipeline::{IssuePipeline, INVALID_REPO_TITLE};
use meeting_tasks::models::issue::{CreateSummary, CreatedItem, PreviewItem};
use meeting_tasks::models::task::Task;
use meeting_tasks::notify::{Notifier, Severity};
use meeting_tasks::recent::store::RecentStore;
use meeting_tasks::recent::{RECENT_MEETINGS, RECENT_REPOS};
use meeting_tasks::upload::{request_from_file, upload_transcript};
use meeting_tasks::AppError;

use super::test_helpers::{RecordingNotifier, ScriptedBackend};

fn pipeline(backend: &Arc<ScriptedBackend>, notifier: &Arc<RecordingNotifier>) -> IssuePipeline {
    IssuePipeline::new(
        Arc::clone(backend) as Arc<dyn TaskBackend>,
        Arc::clone(notifier) as Arc<dyn Notifier>,
    )
}

fn preview_item(title: &str) -> PreviewItem {
    PreviewItem {
        title: title.to_owned(),
        body: format!("{title} body"),
        labels: vec!["meeting".into()],
    }
}

fn created(title: &str, status: &str, number: Option<u64>) -> CreatedItem {
    CreatedItem {
        number,
        url: number.map(|n| format!("https://github.com/octocat/hello-world/issues/{n}")),
        title: title.to_owned(),
        status: status.to_owned(),
    }
}

fn tasks() -> Vec<Task> {
    vec![Task::titled("Fix bug"), Task::titled("Write docs")]
}

#[tokio::test]
async fn invalid_slug_blocks_the_network_call() {
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    let mut pipeline = pipeline(&backend, &notifier);

    for repo in ["owner/repo", "no-slash", "a/b/c"] {
        let result = pipeline.create(repo, "m1", &tasks()).await;
        assert!(matches!(result, Err(AppError::Validation(_))), "{repo}");
    }

    assert!(backend.issue_requests().is_empty());
    assert!(pipeline.created_items().is_none());
    let errors = notifier.errors();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|n| n.title == INVALID_REPO_TITLE));
}

#[tokio::test]
async fn create_reports_summary_and_records_repo() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RecentStore::open(dir.path().join("recent.json")).expect("open");
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_create(Ok(vec![
        created("Fix bug", "created", Some(11)),
        created("Write docs", "created", Some(12)),
        created("Old task", "skipped-duplicate", None),
        created("Empty", "skipped-other", None),
    ]));
    let assignees = HashMap::from([("alice".to_owned(), "alice-gh".to_owned())]);
    let mut pipeline = pipeline(&backend, &notifier)
        .with_assignees(assignees.clone())
        .with_recent(store);

    let report = pipeline
        .create(" octocat/hello-world ", "m1", &tasks())
        .await
        .expect("ok");

    assert_eq!(
        report.summary,
        CreateSummary {
            created: 2,
            duplicates: 1,
            skipped: 2,
        }
    );
    assert_eq!(report.items.len(), 4);
    assert_eq!(pipeline.created_items().map(<[_]>::len), Some(4));

    let sent = backend.issue_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].repo, "octocat/hello-world");
    assert_eq!(sent[0].meeting_id, "m1");
    assert_eq!(sent[0].tasks, tasks());
    assert_eq!(sent[0].assignee_map, assignees);

    let all = notifier.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].severity, Severity::Success);
    assert_eq!(all[0].title, "Created 2, skipped 2 (1 duplicates)");

    let recent = pipeline.recent().expect("store attached");
    assert_eq!(recent.list(RECENT_REPOS), ["octocat/hello-world"]);
}

#[tokio::test]
async fn create_failure_notifies_detail_and_keeps_previous_result() {
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_create(Ok(vec![created("Fix bug", "created", Some(1))]));
    backend.push_create(Err(AppError::Backend {
        status: 502,
        detail: json!({"github": "rate limited"}),
    }));
    let mut pipeline = pipeline(&backend, &notifier);

    pipeline
        .create("octocat/hello-world", "m1", &tasks())
        .await
        .expect("first create succeeds");
    let result = pipeline.create("octocat/hello-world", "m1", &tasks()).await;

    assert!(matches!(result, Err(AppError::Backend { status: 502, .. })));
    assert_eq!(pipeline.created_items().map(<[_]>::len), Some(1));
    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Failed to create issues");
    assert_eq!(errors[0].detail, Some(json!({"github": "rate limited"})));
}

#[tokio::test]
async fn preview_success_replaces_stored_preview() {
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_preview(Ok(vec![preview_item("Fix bug")]));
    backend.push_preview(Ok(vec![preview_item("Fix bug"), preview_item("Write docs")]));
    let mut pipeline = pipeline(&backend, &notifier);

    pipeline.preview("octocat/hello-world", "m1", &tasks()).await.expect("ok");
    let items = pipeline
        .preview("octocat/hello-world", "m1", &tasks())
        .await
        .expect("ok")
        .to_vec();

    assert_eq!(items.len(), 2);
    assert_eq!(pipeline.preview_items(), Some(items.as_slice()));
    assert!(notifier.all().is_empty());
}

#[tokio::test]
async fn preview_failure_keeps_prior_preview() {
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_preview(Ok(vec![preview_item("Fix bug")]));
    backend.push_preview(Err(AppError::Http("connection reset".into())));
    let mut pipeline = pipeline(&backend, &notifier);

    pipeline.preview("octocat/hello-world", "m1", &tasks()).await.expect("ok");
    let result = pipeline.preview("octocat/hello-world", "m1", &tasks()).await;

    assert!(matches!(result, Err(AppError::Http(_))));
    assert_eq!(pipeline.preview_items(), Some(&[preview_item("Fix bug")][..]));
    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Preview failed");
}

/// Preview is a dry run: the slug guard only applies to create.
#[tokio::test]
async fn preview_does_not_apply_slug_guard_or_record_bad_slugs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = RecentStore::open(dir.path().join("recent.json")).expect("open");
    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_preview(Ok(Vec::new()));
    let mut pipeline = pipeline(&backend, &notifier).with_recent(store);

    pipeline.preview("no-slash", "m1", &tasks()).await.expect("ok");

    assert_eq!(backend.issue_requests().len(), 1);
    let recent = pipeline.recent().expect("store attached");
    assert!(recent.list(RECENT_REPOS).is_empty());
}

#[tokio::test]
async fn upload_reads_file_and_records_meeting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transcript = dir.path().join("standup.txt");
    std::fs::write(&transcript, "Alice: ship v2 on Friday").expect("write transcript");
    let mut store = RecentStore::open(dir.path().join("recent.json")).expect("open");

    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_upload(Ok(json!({"ok": true, "chunks": 3})));

    let request = request_from_file(&transcript, " standup-01 ", "Daily standup")
        .await
        .expect("request builds");
    assert_eq!(request.meeting_id, "standup-01");
    assert_eq!(request.file_name, "standup.txt");

    let reply = upload_transcript(backend.as_ref(), notifier.as_ref(), Some(&mut store), &request)
        .await
        .expect("ok");

    assert_eq!(reply, json!({"ok": true, "chunks": 3}));
    let sent = backend.upload_requests();
    assert_eq!(sent[0].content, b"Alice: ship v2 on Friday");
    assert_eq!(store.list(RECENT_MEETINGS), ["standup-01"]);

    let all = notifier.all();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Upload & index complete");
    assert_eq!(
        all[0].detail,
        Some(json!({"meetingId": "standup-01", "title": "Daily standup"}))
    );
}

#[tokio::test]
async fn upload_failure_notifies_and_records_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let transcript = dir.path().join("t.txt");
    std::fs::write(&transcript, "x").expect("write");
    let mut store = RecentStore::open(dir.path().join("recent.json")).expect("open");

    let backend = ScriptedBackend::new();
    let notifier = RecordingNotifier::new();
    backend.push_upload(Err(AppError::Backend {
        status: 413,
        detail: json!("file too large"),
    }));

    let request = request_from_file(&transcript, "m1", "").await.expect("ok");
    let result =
        upload_transcript(backend.as_ref(), notifier.as_ref(), Some(&mut store), &request).await;

    assert!(matches!(result, Err(AppError::Backend { status: 413, .. })));
    assert!(store.list(RECENT_MEETINGS).is_empty());
    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Upload failed");
    assert_eq!(errors[0].detail, Some(json!("file too large")));
}

#[tokio::test]
async fn upload_request_rejects_blank_meeting_and_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.txt");

    let blank = request_from_file(&missing, "  ", "").await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    let unreadable = request_from_file(&missing, "m1", "").await;
    assert!(matches!(unreadable, Err(AppError::Io(_))));
}
