//! Visit source adapter interface.
//!
//! The history view never talks to storage directly. It asks a
//! [`VisitSource`] for day-bucketed snapshots and ranked search results, and
//! listens on its change channel for fresh snapshots pushed after the store
//! is modified.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::broadcast;

use crate::services::calendar::start_of_day;
use crate::types::errors::HistoryError;
use crate::types::history::{DayBucket, HistorySnapshot, SnapshotQuery, Visit};

pub use crate::services::calendar::{start_of_day_timestamp, start_of_month_timestamp};

/// Push channel carrying a fresh snapshot after every store change.
pub type HistoryChanges = broadcast::Receiver<Arc<HistorySnapshot>>;

/// Cancellation scope for the searches of one caller.
///
/// Each search begins a new generation in its scope; a search whose
/// generation is no longer current when it finishes has been superseded.
/// Searches in different scopes never cancel each other. Clones share the
/// same scope.
#[derive(Debug, Clone, Default)]
pub struct SearchScope(Arc<AtomicU64>);

impl SearchScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search, superseding any earlier one in this scope.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Supersedes every search in flight without starting a new one.
    pub fn cancel(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether the search started as `generation` is still the latest.
    pub fn is_current(&self, generation: u64) -> bool {
        self.0.load(Ordering::SeqCst) == generation
    }
}

/// Adapter over an external visit store.
pub trait VisitSource: Send + Sync + 'static {
    /// Fetches visits no older than `query.max_age_days`, at most
    /// `query.limit` of them, bucketed by local day with the newest day first.
    fn get_history_snapshot(
        &self,
        query: SnapshotQuery,
    ) -> impl Future<Output = Result<HistorySnapshot, HistoryError>> + Send;

    /// Searches visits by title or URL, best match first.
    ///
    /// Resolves to [`HistoryError::Cancelled`] when a newer search in the
    /// same `scope` superseded this one.
    fn search_history(
        &self,
        scope: &SearchScope,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Visit>, HistoryError>> + Send;

    /// Subscribes to snapshots pushed after the store changes.
    fn subscribe(&self) -> HistoryChanges;
}

/// Buckets newest-first visits by the local calendar day of `tz`.
///
/// Consecutive visits on the same day share a bucket, so newest-first input
/// yields buckets in descending day order.
pub fn bucket_by_day<Tz: TimeZone>(
    visits: impl IntoIterator<Item = Visit>,
    tz: &Tz,
) -> HistorySnapshot {
    let mut buckets: Vec<DayBucket> = Vec::new();
    for visit in visits {
        let day: DateTime<Utc> = start_of_day(&visit.date().with_timezone(tz));
        match buckets.last_mut() {
            Some(bucket) if bucket.day == day => bucket.visits.push(visit),
            _ => buckets.push(DayBucket {
                day,
                visits: vec![visit],
            }),
        }
    }
    HistorySnapshot::new(buckets)
}
