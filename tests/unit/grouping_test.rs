//! Unit tests for the grouping strategies.
//!
//! Snapshots are built by hand relative to a fixed "now" in UTC so every day
//! and month boundary is deterministic.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rstest::rstest;

use history_aggregator::services::grouping::{
    group, group_by_date, group_by_date_site, group_by_recency, group_by_site, search_entries,
};
use history_aggregator::types::history::{
    CardEntry, CardItems, DayBucket, HistorySnapshot, ItemKind, LabelKey, SortOption, Visit,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap()
}

fn day(offset_days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap() - Duration::days(offset_days)
}

fn visit(url: &str, day: DateTime<Utc>, minute: i64) -> Visit {
    Visit::new(url, None, day + Duration::minutes(minute))
}

fn bucket(day: DateTime<Utc>, urls: &[&str]) -> DayBucket {
    let visits = urls
        .iter()
        .enumerate()
        .map(|(i, url)| visit(url, day, 600 - i as i64))
        .collect();
    DayBucket { day, visits }
}

fn labels(entries: &[CardEntry<Visit>]) -> Vec<Option<LabelKey>> {
    entries.iter().map(|e| e.label_key).collect()
}

fn urls(entry: &CardEntry<Visit>) -> Vec<&str> {
    entry.items.visits().map(|v| v.url()).collect()
}

fn site_domains(entry: &CardEntry<Visit>) -> Vec<&str> {
    match &entry.items {
        CardItems::Sites(sites) => sites.iter().map(|s| s.domain.as_str()).collect(),
        CardItems::Visits(_) => panic!("expected site items"),
    }
}

/// Buckets at today, yesterday, and 32 days ago yield Today, Yesterday, and
/// one previous-month card, with no this-month day cards.
#[test]
fn test_by_date_today_yesterday_previous_month() {
    let snapshot = HistorySnapshot::new(vec![
        bucket(day(0), &["https://a.com/today"]),
        bucket(day(1), &["https://a.com/yesterday"]),
        bucket(day(32), &["https://a.com/april"]),
    ]);

    let entries = group_by_date(&snapshot, &now());

    assert_eq!(
        labels(&entries),
        [
            Some(LabelKey::Today),
            Some(LabelKey::Yesterday),
            Some(LabelKey::PreviousMonth)
        ]
    );
    assert!(entries.iter().all(|e| e.items.len() == 1));
    assert!(entries.iter().all(|e| e.items.kind() == ItemKind::Visit));
}

#[test]
fn test_by_date_days_of_current_month_and_merged_months() {
    let snapshot = HistorySnapshot::new(vec![
        bucket(day(0), &["https://a.com/0"]),
        bucket(day(5), &["https://a.com/5a", "https://a.com/5b"]),
        bucket(day(10), &["https://a.com/10"]),
        bucket(day(25), &["https://a.com/25"]),
        bucket(day(30), &["https://a.com/30"]),
        bucket(day(60), &["https://a.com/60"]),
    ]);

    let entries = group_by_date(&snapshot, &now());

    assert_eq!(
        labels(&entries),
        [
            Some(LabelKey::Today),
            Some(LabelKey::ThisMonthByDay),
            Some(LabelKey::ThisMonthByDay),
            Some(LabelKey::PreviousMonth),
            Some(LabelKey::PreviousMonth)
        ]
    );
    assert_eq!(urls(&entries[1]), ["https://a.com/5a", "https://a.com/5b"]);
    // April 25 and April 20 share one card, newest first.
    assert_eq!(urls(&entries[3]), ["https://a.com/25", "https://a.com/30"]);
    assert_eq!(urls(&entries[4]), ["https://a.com/60"]);
}

#[test]
fn test_by_date_empty_snapshot_has_no_cards() {
    assert!(group_by_date(&HistorySnapshot::default(), &now()).is_empty());
}

/// Two domains in the same day bucket sort into one card per domain.
#[test]
fn test_by_site_one_card_per_domain() {
    let snapshot = HistorySnapshot::new(vec![bucket(
        day(0),
        &["https://b.com/v2", "https://a.com/v1"],
    )]);

    let entries = group_by_site(&snapshot);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].domain.as_deref(), Some("a.com"));
    assert_eq!(entries[1].domain.as_deref(), Some("b.com"));
    assert!(entries.iter().all(|e| e.items.len() == 1));
    assert!(entries
        .iter()
        .all(|e| e.label_key == Some(LabelKey::SiteHeader)));
}

#[test]
fn test_by_site_ignores_time_and_labels_local_files() {
    let snapshot = HistorySnapshot::new(vec![
        bucket(day(0), &["https://a.com/new", "file:///tmp/report.html"]),
        bucket(day(45), &["https://a.com/old"]),
    ]);

    let entries = group_by_site(&snapshot);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].domain.as_deref(), Some(""));
    assert_eq!(entries[0].label_key, Some(LabelKey::LocalFiles));
    assert_eq!(urls(&entries[1]), ["https://a.com/new", "https://a.com/old"]);
}

#[test]
fn test_by_date_site_sorts_domains_within_each_group() {
    let snapshot = HistorySnapshot::new(vec![
        bucket(
            day(0),
            &["https://c.com/1", "https://a.com/1", "https://c.com/2"],
        ),
        bucket(day(25), &["https://b.com/1", "https://a.com/2"]),
        bucket(day(28), &["https://a.com/3", "https://d.com/1"]),
    ]);

    let entries = group_by_date_site(&snapshot, &now());

    assert_eq!(
        labels(&entries),
        [Some(LabelKey::Today), Some(LabelKey::PreviousMonth)]
    );
    assert!(entries.iter().all(|e| e.items.kind() == ItemKind::Site));
    assert_eq!(site_domains(&entries[0]), ["a.com", "c.com"]);
    assert_eq!(site_domains(&entries[1]), ["a.com", "b.com", "d.com"]);

    // Older days append after the existing visits of the same domain.
    match &entries[1].items {
        CardItems::Sites(sites) => {
            let a: Vec<&str> = sites[0].visits.iter().map(|v| v.url()).collect();
            assert_eq!(a, ["https://a.com/2", "https://a.com/3"]);
        }
        CardItems::Visits(_) => panic!("expected site items"),
    }
}

#[test]
fn test_by_recency_keeps_snapshot_order() {
    let snapshot = HistorySnapshot::new(vec![
        bucket(day(0), &["https://z.com/", "https://a.com/"]),
        bucket(day(3), &["https://m.com/"]),
    ]);

    let entries = group_by_recency(&snapshot);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].label_key, None);
    assert_eq!(
        urls(&entries[0]),
        ["https://z.com/", "https://a.com/", "https://m.com/"]
    );
}

#[test]
fn test_search_entries_wrap_ranked_results() {
    let results = vec![
        visit("https://b.com/", day(2), 0),
        visit("https://a.com/", day(0), 0),
    ];

    let entries = search_entries(results.clone());

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].items, CardItems::Visits(results));
}

#[rstest]
#[case(SortOption::Date, ItemKind::Visit)]
#[case(SortOption::Site, ItemKind::Visit)]
#[case(SortOption::DateSite, ItemKind::Site)]
#[case(SortOption::LastVisited, ItemKind::Visit)]
fn test_group_dispatch_item_kind(#[case] sort: SortOption, #[case] kind: ItemKind) {
    let snapshot = HistorySnapshot::new(vec![bucket(day(0), &["https://a.com/"])]);

    let entries = group(sort, &snapshot, &now());

    assert!(!entries.is_empty(), "{sort} should produce a card");
    assert!(entries.iter().all(|e| e.items.kind() == kind));
}

#[rstest]
#[case("date", SortOption::Date)]
#[case("site", SortOption::Site)]
#[case("datesite", SortOption::DateSite)]
#[case("lastvisited", SortOption::LastVisited)]
fn test_sort_option_tokens(#[case] token: &str, #[case] sort: SortOption) {
    assert_eq!(token.parse::<SortOption>(), Ok(sort));
    assert_eq!(sort.as_str(), token);
    assert_eq!(
        serde_json::to_string(&sort).unwrap(),
        format!("\"{}\"", token)
    );
}

#[test]
fn test_unknown_sort_option_is_rejected() {
    assert!("alphabetical".parse::<SortOption>().is_err());
}
