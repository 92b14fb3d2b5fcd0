//! SQLite-backed visit source.
//!
//! Wraps a [`Database`] behind a mutex, runs queries on tokio's blocking
//! pool, and broadcasts a fresh snapshot to subscribers after every change
//! made through it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Days, Utc};
use log::{debug, warn};
use tokio::sync::broadcast;

use crate::database::Database;
use crate::managers::visit_store::{VisitStore, VisitStoreTrait};
use crate::services::calendar::{start_of_day, Clock, SystemClock};
use crate::services::visit_source::{bucket_by_day, HistoryChanges, SearchScope, VisitSource};
use crate::types::errors::HistoryError;
use crate::types::history::{HistorySnapshot, SnapshotQuery, Visit};
use crate::types::settings::HistorySettings;

/// Capacity of the change channel. Slow subscribers skip to the newest
/// snapshot instead of blocking writers.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Visit source over a SQLite visit store.
pub struct SqliteVisitSource<C: Clock = SystemClock> {
    db: Arc<Mutex<Database>>,
    clock: Arc<C>,
    changes: broadcast::Sender<Arc<HistorySnapshot>>,
    recording_enabled: AtomicBool,
    push_query: SnapshotQuery,
}

fn lock(db: &Mutex<Database>) -> Result<MutexGuard<'_, Database>, HistoryError> {
    db.lock()
        .map_err(|_| HistoryError::DatabaseError("Database lock poisoned".to_string()))
}

fn load_locked<C: Clock>(
    db: &Database,
    clock: &C,
    query: SnapshotQuery,
) -> Result<HistorySnapshot, HistoryError> {
    let now = clock.now();
    let oldest = now
        .clone()
        .checked_sub_days(Days::new(u64::from(query.max_age_days)))
        .unwrap_or_else(|| now.clone());
    let cutoff: DateTime<Utc> = start_of_day(&oldest);

    let visits = VisitStore::new(db.connection()).visits_since(cutoff, query.limit)?;
    Ok(bucket_by_day(visits, &now.timezone()))
}

fn load_snapshot<C: Clock>(
    db: &Mutex<Database>,
    clock: &C,
    query: SnapshotQuery,
) -> Result<HistorySnapshot, HistoryError> {
    let guard = lock(db)?;
    load_locked(&guard, clock, query)
}

/// Builds a snapshot and sends it while still holding the database lock, so
/// subscribers receive snapshots in the order the store changed.
fn push_snapshot<C: Clock>(
    db: &Mutex<Database>,
    clock: &C,
    query: SnapshotQuery,
    changes: &broadcast::Sender<Arc<HistorySnapshot>>,
) {
    let result = lock(db).and_then(|guard| {
        let snapshot = load_locked(&guard, clock, query)?;
        debug!(
            "Pushing history snapshot with {} visits",
            snapshot.visit_count()
        );
        // Only fails when every receiver is gone.
        let _ = changes.send(Arc::new(snapshot));
        Ok(())
    });
    if let Err(e) = result {
        warn!("Failed to build history snapshot for subscribers: {}", e);
    }
}

impl SqliteVisitSource<SystemClock> {
    /// Creates a source using the system clock.
    pub fn new(db: Database, settings: &HistorySettings) -> Self {
        Self::with_clock(db, SystemClock, settings)
    }
}

impl<C: Clock> SqliteVisitSource<C> {
    /// Creates a source that buckets days with the given clock's time zone.
    ///
    /// Snapshots pushed to subscribers use the limits from `settings`.
    pub fn with_clock(db: Database, clock: C, settings: &HistorySettings) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            clock: Arc::new(clock),
            changes,
            recording_enabled: AtomicBool::new(true),
            push_query: SnapshotQuery {
                max_age_days: settings.max_age_days,
                limit: settings.history_limit,
            },
        }
    }

    fn store_op<T>(
        &self,
        op: impl FnOnce(&mut VisitStore<'_>) -> Result<T, HistoryError>,
    ) -> Result<T, HistoryError> {
        let result = {
            let guard = lock(&self.db)?;
            let mut store = VisitStore::new(guard.connection());
            store.set_recording_enabled(self.recording_enabled.load(Ordering::SeqCst));
            op(&mut store)?
        };
        self.notify_changed();
        Ok(result)
    }

    /// Records a visit and notifies subscribers.
    pub fn record_visit(
        &self,
        url: &str,
        title: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<String, HistoryError> {
        self.store_op(|store| store.record_visit(url, title, at))
    }

    /// Removes every visit to `url` and notifies subscribers.
    pub fn delete_url(&self, url: &str) -> Result<usize, HistoryError> {
        self.store_op(|store| store.delete_url(url))
    }

    /// Removes all visits and notifies subscribers.
    pub fn clear_all(&self) -> Result<(), HistoryError> {
        self.store_op(|store| store.clear_all())
    }

    pub fn is_recording_enabled(&self) -> bool {
        self.recording_enabled.load(Ordering::SeqCst)
    }

    /// Enables or disables recording (private mode).
    pub fn set_recording_enabled(&self, enabled: bool) {
        self.recording_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Pushes a fresh snapshot to subscribers, if there are any.
    ///
    /// Inside a tokio runtime the snapshot is built on the blocking pool and
    /// the write returns immediately; without one it is built inline.
    fn notify_changed(&self) {
        if self.changes.receiver_count() == 0 {
            return;
        }
        let db = Arc::clone(&self.db);
        let clock = Arc::clone(&self.clock);
        let changes = self.changes.clone();
        let query = self.push_query;
        let push = move || push_snapshot(&db, clock.as_ref(), query, &changes);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(push);
            }
            Err(_) => push(),
        }
    }
}

impl<C: Clock> VisitSource for SqliteVisitSource<C> {
    async fn get_history_snapshot(&self, query: SnapshotQuery) -> Result<HistorySnapshot, HistoryError> {
        let db = Arc::clone(&self.db);
        let clock = Arc::clone(&self.clock);
        tokio::task::spawn_blocking(move || load_snapshot(&db, clock.as_ref(), query))
            .await
            .map_err(|e| HistoryError::DatabaseError(e.to_string()))?
    }

    async fn search_history(
        &self,
        scope: &SearchScope,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Visit>, HistoryError> {
        let generation = scope.begin();
        let db = Arc::clone(&self.db);
        let query = query.to_string();

        let results = tokio::task::spawn_blocking(move || {
            let guard = lock(&db)?;
            VisitStore::new(guard.connection()).search(&query, limit)
        })
        .await
        .map_err(|e| HistoryError::DatabaseError(e.to_string()))??;

        if !scope.is_current(generation) {
            return Err(HistoryError::Cancelled);
        }
        Ok(results)
    }

    fn subscribe(&self) -> HistoryChanges {
        self.changes.subscribe()
    }
}
