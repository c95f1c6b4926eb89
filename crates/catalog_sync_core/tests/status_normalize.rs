use catalog_sync_core::{normalize, LogLevel, ProgressMode, DEFAULT_MESSAGE};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn null_and_empty_inputs_are_idle_never_run() {
    for raw in [json!(null), json!({}), json!(42), json!("running"), json!([1, 2])] {
        let status = normalize(&raw, "kinox");
        assert_eq!(status.provider, "kinox");
        assert_eq!(status.job_id, "kinox");
        assert!(!status.running);
        assert_eq!(status.progress_mode, ProgressMode::Idle);
        assert_eq!(status.progress, 0.0);
        assert_eq!(status.message, DEFAULT_MESSAGE);
        assert_eq!(status.processed_pages, 0);
        assert_eq!(status.total_pages, 0);
        assert_eq!(status.processed_links, 0);
        assert_eq!(status.next_page, None);
        assert_eq!(status.last_page, None);
        assert!(status.log.is_empty());
        assert!(status.started_at.is_none());
    }
}

#[test]
fn running_without_total_pages_is_indeterminate() {
    let raw = json!({ "running": true, "current_page": 4, "next_page": 5 });
    let status = normalize(&raw, "kinox");

    assert!(status.running);
    assert_eq!(status.current_page, Some(4));
    assert_eq!(status.next_page, Some(5));
    assert_eq!(status.progress_mode, ProgressMode::Indeterminate);
}

#[test]
fn non_finite_and_garbage_numbers_fall_back_to_defaults() {
    let raw = json!({
        "processed_pages": "NaN",
        "total_pages": "lots",
        "processed_links": -12,
        "progress": "Infinity",
        "next_page": "0",
        "last_page": {"nested": true},
        "start_page": "3",
    });
    let status = normalize(&raw, "filmpalast");

    assert_eq!(status.processed_pages, 0);
    assert_eq!(status.total_pages, 0);
    assert_eq!(status.processed_links, 0);
    assert_eq!(status.progress, 0.0);
    assert!(status.progress.is_finite());
    assert_eq!(status.next_page, None);
    assert_eq!(status.last_page, None);
    assert_eq!(status.start_page, Some(3));
}

#[test]
fn determinate_progress_is_derived_and_clamped() {
    let half = normalize(&json!({ "processed_pages": 5, "total_pages": 10 }), "kinox");
    assert_eq!(half.progress_mode, ProgressMode::Determinate);
    assert_eq!(half.progress, 50.0);

    let overshoot = normalize(&json!({ "processed_pages": 30, "total_pages": 10 }), "kinox");
    assert_eq!(overshoot.progress, 100.0);

    let explicit = normalize(
        &json!({ "progress": 250, "progress_mode": "determinate" }),
        "kinox",
    );
    assert_eq!(explicit.progress, 100.0);
    assert_eq!(explicit.progress_mode, ProgressMode::Determinate);
}

#[test]
fn provider_falls_back_to_hint_when_blank() {
    let status = normalize(&json!({ "provider": "   " }), "kinox");
    assert_eq!(status.provider, "kinox");

    let named = normalize(&json!({ "provider": "filmpalast_series" }), "kinox");
    assert_eq!(named.provider, "filmpalast_series");
}

#[test]
fn blank_message_uses_default() {
    let status = normalize(&json!({ "message": "" }), "kinox");
    assert_eq!(status.message, DEFAULT_MESSAGE);

    let status = normalize(&json!({ "message": "Seite 3 verarbeitet." }), "kinox");
    assert_eq!(status.message, "Seite 3 verarbeitet.");
}

#[test]
fn log_drops_falsy_entries_and_keeps_order() {
    let raw = json!({
        "log": [
            { "timestamp": "2024-05-01T10:00:00", "level": "info", "message": "first" },
            null,
            false,
            "",
            { "message": "" },
            { "timestamp": "2024-05-01T10:00:05.5", "level": "warn", "message": "second" },
            { "level": "error", "message": "third" },
        ]
    });
    let status = normalize(&raw, "kinox");

    let messages: Vec<_> = status.log.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
    assert_eq!(status.log[1].level, LogLevel::Warning);
    assert!(status.log[0].timestamp.is_some());
    assert!(status.log[2].timestamp.is_none());

    let newest_first: Vec<_> = status
        .recent_log(2)
        .into_iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(newest_first, vec!["third", "second"]);
}

#[test]
fn unknown_fields_are_ignored_and_camel_case_is_accepted() {
    let raw = json!({
        "nextPage": 9,
        "lastPage": 8,
        "totally_new_field": [1, 2, 3],
        "running": "true",
    });
    let status = normalize(&raw, "kinox");
    assert_eq!(status.next_page, Some(9));
    assert_eq!(status.last_page, Some(8));
    assert!(status.running);
}

#[test]
fn normalize_is_idempotent() {
    let raw = json!({
        "running": true,
        "processed_pages": 3,
        "total_pages": 7,
        "log": [{ "message": "hello", "timestamp": "2024-01-01T00:00:00" }],
        "started_at": "2024-01-01T00:00:00",
    });
    assert_eq!(normalize(&raw, "kinox"), normalize(&raw, "kinox"));
}
