//! Bucketing engine.
//!
//! Splits a day-bucketed snapshot into Today, Yesterday, the remaining days
//! of the current month, and one group per earlier month. All four
//! partitions are produced by a single pass over the snapshot.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::services::calendar::{is_same_month, previous_day};
use crate::services::grouping::compare_domains;
use crate::types::history::{HistorySnapshot, SiteVisits, Visit};

/// Contents of a bucket that can absorb an older bucket of the same month.
pub trait BucketContent {
    /// Appends `older` after the current contents.
    fn merge(&mut self, older: Self);
}

impl BucketContent for Vec<Visit> {
    fn merge(&mut self, older: Self) {
        self.extend(older);
    }
}

/// Visits grouped by domain, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainMap {
    groups: Vec<SiteVisits<Visit>>,
}

impl DomainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups visits by domain, keeping their relative order inside each domain.
    pub fn from_visits(visits: impl IntoIterator<Item = Visit>) -> Self {
        let mut map = Self::new();
        for visit in visits {
            let domain = visit.domain().to_string();
            map.append(domain, vec![visit]);
        }
        map
    }

    /// Appends visits to a domain, creating the domain at the end if it is new.
    pub fn append(&mut self, domain: String, visits: Vec<Visit>) {
        match self.groups.iter_mut().find(|g| g.domain == domain) {
            Some(group) => group.visits.extend(visits),
            None => self.groups.push(SiteVisits { domain, visits }),
        }
    }

    pub fn get(&self, domain: &str) -> Option<&[Visit]> {
        self.groups
            .iter()
            .find(|g| g.domain == domain)
            .map(|g| g.visits.as_slice())
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteVisits<Visit>> {
        self.groups.iter()
    }

    /// Consumes the map, returning its groups ordered by domain. Domains that
    /// compare equal keep their insertion order.
    pub fn into_sorted(self) -> Vec<SiteVisits<Visit>> {
        let mut groups = self.groups;
        groups.sort_by(|a, b| compare_domains(&a.domain, &b.domain));
        groups
    }
}

impl BucketContent for DomainMap {
    fn merge(&mut self, older: Self) {
        for group in older.groups {
            self.append(group.domain, group.visits);
        }
    }
}

/// The four partitions of a snapshot relative to a reference instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<T> {
    pub today: Option<T>,
    pub yesterday: Option<T>,
    /// Earlier days of the current month, newest first, one entry per day.
    pub by_day: Vec<T>,
    /// Earlier months, newest first, one entry per month.
    pub by_month: Vec<T>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            today: None,
            yesterday: None,
            by_day: Vec::new(),
            by_month: Vec::new(),
        }
    }
}

fn merge_into<T: BucketContent>(slot: &mut Option<T>, content: T) {
    match slot {
        Some(existing) => existing.merge(content),
        None => *slot = Some(content),
    }
}

/// Partitions day buckets, given newest first, relative to `now`.
///
/// Today and yesterday are matched by calendar date in `now`'s time zone.
/// Day buckets are collected until the first bucket outside the current
/// month; every later bucket other than yesterday lands in a month group,
/// with consecutive buckets of the same month merged. Yesterday is never
/// part of a month group, even when it falls in the previous month.
///
/// Every bucket ends up in exactly one partition. A bucket that breaks the
/// newest-first order starts a new group instead of being dropped.
pub fn partition<T, Tz>(
    buckets: impl IntoIterator<Item = (DateTime<Utc>, T)>,
    now: &DateTime<Tz>,
) -> Partition<T>
where
    T: BucketContent,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let today = now.date_naive();
    let yesterday = previous_day(now);

    let mut parts = Partition::default();
    let mut within_current_month = true;
    let mut previous_month: Option<(i32, u32)> = None;

    for (day, content) in buckets {
        let local = day.with_timezone(&tz);
        let date = local.date_naive();

        if date == today {
            merge_into(&mut parts.today, content);
            continue;
        }
        if date == yesterday {
            merge_into(&mut parts.yesterday, content);
            continue;
        }
        if within_current_month && is_same_month(&local, now) {
            parts.by_day.push(content);
            continue;
        }
        within_current_month = false;

        let month = (local.year(), local.month());
        match parts.by_month.last_mut() {
            Some(group) if previous_month == Some(month) => group.merge(content),
            _ => parts.by_month.push(content),
        }
        previous_month = Some(month);
    }

    parts
}

/// Day buckets of plain visits, in snapshot order.
pub fn visit_buckets(
    snapshot: &HistorySnapshot,
) -> impl Iterator<Item = (DateTime<Utc>, Vec<Visit>)> + '_ {
    snapshot
        .buckets
        .iter()
        .map(|bucket| (bucket.day, bucket.visits.clone()))
}

/// Day buckets with each day's visits grouped by domain.
pub fn site_buckets(
    snapshot: &HistorySnapshot,
) -> impl Iterator<Item = (DateTime<Utc>, DomainMap)> + '_ {
    snapshot
        .buckets
        .iter()
        .map(|bucket| (bucket.day, DomainMap::from_visits(bucket.visits.iter().cloned())))
}

/// Visits of the bucket for the day containing `now`.
pub fn visits_for_today<Tz: TimeZone>(snapshot: &HistorySnapshot, now: &DateTime<Tz>) -> Vec<Visit> {
    partition(visit_buckets(snapshot), now)
        .today
        .unwrap_or_default()
}

/// Visits of the bucket for the calendar day before `now`.
pub fn visits_for_yesterday<Tz: TimeZone>(
    snapshot: &HistorySnapshot,
    now: &DateTime<Tz>,
) -> Vec<Visit> {
    partition(visit_buckets(snapshot), now)
        .yesterday
        .unwrap_or_default()
}

/// Earlier days of the current month, one list per day.
pub fn visits_by_day<Tz: TimeZone>(snapshot: &HistorySnapshot, now: &DateTime<Tz>) -> Vec<Vec<Visit>> {
    partition(visit_buckets(snapshot), now).by_day
}

/// Earlier months, one merged list per month.
pub fn visits_by_month<Tz: TimeZone>(
    snapshot: &HistorySnapshot,
    now: &DateTime<Tz>,
) -> Vec<Vec<Visit>> {
    partition(visit_buckets(snapshot), now).by_month
}
