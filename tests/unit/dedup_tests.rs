//! Unit tests for multi-query merge helpers.

use meeting_tasks::models::task::{normalize_title, Task};
use meeting_tasks::orchestrator::aggregator::{dedupe_tasks, distinct_queries};

#[test]
fn dedup_is_case_and_whitespace_insensitive_first_wins() {
    let tasks = vec![
        Task::titled("Fix bug"),
        Task::titled("fix   BUG"),
        Task::titled("Fix bug"),
        Task::titled(""),
    ];
    assert_eq!(dedupe_tasks(tasks), vec![Task::titled("Fix bug")]);
}

#[test]
fn dedup_drops_untitled_and_blank_tasks() {
    let tasks = vec![
        Task::default(),
        Task::titled("   "),
        Task::titled("Write docs"),
    ];
    assert_eq!(dedupe_tasks(tasks), vec![Task::titled("Write docs")]);
}

#[test]
fn dedup_keeps_first_occurrence_payload() {
    let first = Task {
        body: Some("from query one".into()),
        ..Task::titled("Rotate keys")
    };
    let second = Task {
        body: Some("from query two".into()),
        ..Task::titled(" rotate  keys ")
    };
    let merged = dedupe_tasks(vec![first.clone(), second]);
    assert_eq!(merged, vec![first]);
}

#[test]
fn normalize_title_handles_tabs_and_newlines() {
    assert_eq!(normalize_title("\tShip\n  V2  "), "ship v2");
}

#[test]
fn distinct_queries_drop_blank_and_repeated() {
    let queries = distinct_queries(&["risks", "", "  ", "risks ", "decisions"]);
    assert_eq!(queries, vec!["risks", "decisions"]);
}
