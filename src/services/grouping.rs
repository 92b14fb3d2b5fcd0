//! Grouping strategies.
//!
//! Each strategy turns a snapshot (or a ranked search result) into the cards
//! the history view renders. Strategies that need date groups go through the
//! bucketing engine exactly once and never compute day boundaries themselves.

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone};

use crate::services::bucketing::{partition, site_buckets, visit_buckets, DomainMap};
use crate::types::history::{CardEntry, HistorySnapshot, LabelKey, SortOption, Visit};

/// Orders domains ascending, ignoring case. Equal domains compare as equal so
/// stable sorts keep their input order.
pub fn compare_domains(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Groups by date: today, yesterday, each earlier day of this month, then
/// each earlier month.
pub fn group_by_date<Tz: TimeZone>(
    snapshot: &HistorySnapshot,
    now: &DateTime<Tz>,
) -> Vec<CardEntry<Visit>> {
    let parts = partition(visit_buckets(snapshot), now);
    let mut entries = Vec::new();

    if let Some(today) = parts.today.filter(|v| !v.is_empty()) {
        entries.push(CardEntry::visits(today, Some(LabelKey::Today)));
    }
    if let Some(yesterday) = parts.yesterday.filter(|v| !v.is_empty()) {
        entries.push(CardEntry::visits(yesterday, Some(LabelKey::Yesterday)));
    }
    entries.extend(
        parts
            .by_day
            .into_iter()
            .filter(|v| !v.is_empty())
            .map(|v| CardEntry::visits(v, Some(LabelKey::ThisMonthByDay))),
    );
    entries.extend(
        parts
            .by_month
            .into_iter()
            .filter(|v| !v.is_empty())
            .map(|v| CardEntry::visits(v, Some(LabelKey::PreviousMonth))),
    );
    entries
}

/// Groups by site across the whole snapshot, one card per domain.
pub fn group_by_site(snapshot: &HistorySnapshot) -> Vec<CardEntry<Visit>> {
    DomainMap::from_visits(snapshot.visits().cloned())
        .into_sorted()
        .into_iter()
        .map(|site| {
            let label = if site.domain.is_empty() {
                LabelKey::LocalFiles
            } else {
                LabelKey::SiteHeader
            };
            CardEntry {
                domain: Some(site.domain),
                ..CardEntry::visits(site.visits, Some(label))
            }
        })
        .collect()
}

/// Groups by date like [`group_by_date`], with each card's visits further
/// grouped by domain and sorted within the card.
pub fn group_by_date_site<Tz: TimeZone>(
    snapshot: &HistorySnapshot,
    now: &DateTime<Tz>,
) -> Vec<CardEntry<Visit>> {
    let parts = partition(site_buckets(snapshot), now);
    let mut entries = Vec::new();

    let mut push = |map: DomainMap, label: LabelKey| {
        if !map.is_empty() {
            entries.push(CardEntry::sites(map.into_sorted(), label));
        }
    };

    if let Some(today) = parts.today {
        push(today, LabelKey::Today);
    }
    if let Some(yesterday) = parts.yesterday {
        push(yesterday, LabelKey::Yesterday);
    }
    for map in parts.by_day {
        push(map, LabelKey::ThisMonthByDay);
    }
    for map in parts.by_month {
        push(map, LabelKey::PreviousMonth);
    }
    entries
}

/// A single unlabeled card with every visit in snapshot order.
pub fn group_by_recency(snapshot: &HistorySnapshot) -> Vec<CardEntry<Visit>> {
    vec![CardEntry::visits(snapshot.visits().cloned().collect(), None)]
}

/// Wraps ranked search results as a single unlabeled card.
pub fn search_entries(results: Vec<Visit>) -> Vec<CardEntry<Visit>> {
    vec![CardEntry::visits(results, None)]
}

/// Applies the strategy selected by `sort`.
pub fn group<Tz: TimeZone>(
    sort: SortOption,
    snapshot: &HistorySnapshot,
    now: &DateTime<Tz>,
) -> Vec<CardEntry<Visit>> {
    match sort {
        SortOption::Date => group_by_date(snapshot, now),
        SortOption::Site => group_by_site(snapshot),
        SortOption::DateSite => group_by_date_site(snapshot, now),
        SortOption::LastVisited => group_by_recency(snapshot),
    }
}
