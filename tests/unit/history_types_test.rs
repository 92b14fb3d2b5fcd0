//! Unit tests for the history value types.

use chrono::{TimeZone, Utc};

use history_aggregator::types::history::{DayBucket, HistorySnapshot, Visit, VisitRow};

#[test]
fn test_deserialized_visit_derives_domain_from_url() {
    let json = r#"{
        "url": "https://docs.rs/tokio",
        "title": "tokio - Rust",
        "date": "2024-05-20T10:00:00Z",
        "domain": "evil.example"
    }"#;

    let visit: Visit = serde_json::from_str(json).unwrap();

    assert_eq!(visit.domain(), "docs.rs");
    assert_eq!(visit.title(), Some("tokio - Rust"));
    assert_eq!(visit.date(), Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap());
}

#[test]
fn test_deserializing_visit_with_empty_url_fails() {
    let json = r#"{ "url": "  ", "title": null, "date": "2024-05-20T10:00:00Z" }"#;

    let result = serde_json::from_str::<Visit>(json);

    let err = result.expect_err("empty URL must be rejected");
    assert!(err.to_string().contains("URL is empty"), "unexpected error: {}", err);
}

#[test]
fn test_missing_title_deserializes_as_none() {
    let json = r#"{ "url": "file:///tmp/a.html", "date": "2024-05-20T10:00:00Z" }"#;

    let visit: Visit = serde_json::from_str(json).unwrap();

    assert_eq!(visit.title(), None);
    assert_eq!(visit.domain(), "");
}

#[test]
fn test_serialized_snapshot_reads_back_equal() {
    let day = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
    let snapshot = HistorySnapshot::new(vec![DayBucket {
        day,
        visits: vec![Visit::new("https://a.com/x", Some("A".to_string()), day)],
    }]);

    let json = serde_json::to_string(&snapshot).unwrap();
    let back: HistorySnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(back, snapshot);
}

#[test]
fn test_visit_row_falls_back_to_url_for_empty_title() {
    let at = Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap();

    let row = VisitRow::from(Visit::new("https://a.com/", Some(String::new()), at));

    assert_eq!(row.title, "https://a.com/");
    assert_eq!(row.domain, "a.com");
    assert_eq!(row.time, at.timestamp_millis());
}
