//! Query controller for a history view.
//!
//! One controller serves one attached UI surface. It owns the search query,
//! the sort option and the results cache, and turns parameter changes and
//! store change notifications into committed results.
//!
//! Concurrent updates are expected: a new one may start while an older one
//! is still waiting on the visit source. Every parameter change bumps a
//! generation counter, and a result only commits if the generation it
//! started with is still current, so a superseded fetch is dropped silently
//! no matter when it resolves. Searches run in the controller's own
//! [`SearchScope`], so other views sharing the source never cancel them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::services::calendar::{Clock, SystemClock};
use crate::services::grouping::{group, search_entries};
use crate::services::visit_source::{HistoryChanges, SearchScope, VisitSource};
use crate::types::errors::HistoryError;
use crate::types::history::{
    CardEntry, HistorySnapshot, ResultsCache, SnapshotQuery, SortOption, Visit, VisitRow,
};
use crate::types::settings::HistorySettings;

/// Consumer of committed results, typically the UI surface.
pub trait RenderHost: Send + Sync {
    /// Called exactly once per committed result.
    fn request_update(&self, cache: Arc<ResultsCache>);
}

/// Observable state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Detached,
    Idle,
    Fetching,
}

/// What happened to one `update()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The result was committed and the host notified.
    Committed,
    /// Parameters changed or the source cancelled the request; nothing committed.
    Stale,
    /// The source failed; nothing committed.
    Failed,
    /// The controller is not attached; nothing fetched.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    New,
    Attached,
    Closed,
}

struct QueryState {
    search_query: String,
    sort_option: SortOption,
    generation: u64,
    cache: Arc<ResultsCache>,
    lifecycle: Lifecycle,
    host: Option<Arc<dyn RenderHost>>,
}

/// Marks a fetch as in flight for as long as it lives.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn is_active_search(query: &str) -> bool {
    !query.trim().is_empty()
}

/// Drives the history view for one UI surface.
pub struct QueryController<S: VisitSource, C: Clock = SystemClock> {
    source: Arc<S>,
    clock: C,
    settings: HistorySettings,
    state: Mutex<QueryState>,
    search_scope: SearchScope,
    in_flight: AtomicUsize,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<S: VisitSource> QueryController<S, SystemClock> {
    pub fn new(source: Arc<S>, settings: HistorySettings) -> Self {
        Self::with_clock(source, SystemClock, settings)
    }
}

impl<S: VisitSource, C: Clock> QueryController<S, C> {
    /// Creates a detached controller. Dates are grouped relative to `clock`.
    pub fn with_clock(source: Arc<S>, clock: C, settings: HistorySettings) -> Self {
        Self {
            source,
            clock,
            settings,
            state: Mutex::new(QueryState {
                search_query: String::new(),
                sort_option: SortOption::default(),
                generation: 0,
                cache: Arc::new(ResultsCache::default()),
                lifecycle: Lifecycle::New,
                host: None,
            }),
            search_scope: SearchScope::new(),
            in_flight: AtomicUsize::new(0),
            listener: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches a host and starts listening for store changes.
    ///
    /// The change listener runs on the current tokio runtime. Without a
    /// runtime the controller still works, but only updates on parameter
    /// changes or explicit [`handle_history_changed`](Self::handle_history_changed) calls.
    /// Attaching again replaces the host; attaching after `detach` is ignored.
    pub fn attach(self: &Arc<Self>, host: Arc<dyn RenderHost>) {
        {
            let mut state = self.state();
            match state.lifecycle {
                Lifecycle::Closed => {
                    warn!("Ignoring attach on a detached history controller");
                    return;
                }
                Lifecycle::Attached => {
                    state.host = Some(host);
                    return;
                }
                Lifecycle::New => {
                    state.lifecycle = Lifecycle::Attached;
                    state.host = Some(host);
                }
            }
        }

        let changes = self.source.subscribe();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(listen(Arc::downgrade(self), changes));
                *self.listener() = Some(task);
            }
            Err(_) => warn!("No tokio runtime available; history change notifications disabled"),
        }
        info!("History controller attached");
    }

    /// Detaches the host and stops listening. In-flight results are dropped.
    pub fn detach(&self) {
        let host = {
            let mut state = self.state();
            if state.lifecycle == Lifecycle::Closed {
                return;
            }
            state.lifecycle = Lifecycle::Closed;
            state.generation += 1;
            state.host.take()
        };
        self.search_scope.cancel();
        if let Some(task) = self.listener().take() {
            task.abort();
        }
        drop(host);
        info!("History controller detached");
    }

    /// Sets the search text and refreshes. An empty or blank query shows the
    /// grouped history instead of search results.
    pub async fn set_search_query(&self, query: &str) -> UpdateOutcome {
        {
            let mut state = self.state();
            state.search_query = query.to_string();
            state.generation += 1;
        }
        self.update(None).await
    }

    /// Sets the grouping and refreshes.
    pub async fn set_sort_option(&self, sort_option: SortOption) -> UpdateOutcome {
        {
            let mut state = self.state();
            state.sort_option = sort_option;
            state.generation += 1;
        }
        self.update(None).await
    }

    /// Refreshes after the store changed. The pushed snapshot is used as is
    /// unless a search is active, in which case the search is re-run.
    pub async fn handle_history_changed(&self, snapshot: Arc<HistorySnapshot>) -> UpdateOutcome {
        self.update(Some(snapshot)).await
    }

    /// Fetches, groups, and commits results for the current parameters.
    ///
    /// Uses `pushed` instead of fetching when given and no search is active.
    /// Never fails: stale, cancelled, and failed fetches leave the cache
    /// untouched and do not notify the host.
    pub async fn update(&self, pushed: Option<Arc<HistorySnapshot>>) -> UpdateOutcome {
        let (generation, search_query, sort_option) = {
            let state = self.state();
            if state.lifecycle != Lifecycle::Attached {
                debug!("Skipping history update on a detached controller");
                return UpdateOutcome::Detached;
            }
            (state.generation, state.search_query.clone(), state.sort_option)
        };
        let _in_flight = InFlight::start(&self.in_flight);

        let fetched = if is_active_search(&search_query) {
            self.source
                .search_history(
                    &self.search_scope,
                    &search_query,
                    self.settings.search_results_limit,
                )
                .await
                .map(search_entries)
        } else {
            let snapshot = match pushed {
                Some(snapshot) => Ok(snapshot),
                None => self
                    .source
                    .get_history_snapshot(self.snapshot_query())
                    .await
                    .map(Arc::new),
            };
            snapshot.map(|snapshot| self.group_snapshot(sort_option, &snapshot))
        };

        let entries = match fetched {
            Ok(entries) => entries,
            Err(HistoryError::Cancelled) => {
                debug!("Dropping superseded history search {:?}", search_query);
                return UpdateOutcome::Stale;
            }
            Err(e) => {
                warn!("Failed to load history: {}", e);
                return UpdateOutcome::Failed;
            }
        };

        if !self.is_current(generation) {
            debug!("Dropping stale history results (generation {})", generation);
            return UpdateOutcome::Stale;
        }

        let entries: Vec<CardEntry<VisitRow>> = entries
            .into_iter()
            .map(|entry| entry.map(VisitRow::from))
            .collect();

        let (host, cache) = {
            let mut state = self.state();
            if state.lifecycle != Lifecycle::Attached || state.generation != generation {
                debug!("Dropping stale history results (generation {})", generation);
                return UpdateOutcome::Stale;
            }
            let cache = Arc::new(ResultsCache {
                entries: Some(entries),
                search_query,
                sort_option: Some(sort_option),
            });
            state.cache = Arc::clone(&cache);
            (state.host.clone(), cache)
        };

        debug!(
            "Committed {} history cards for sort option {}",
            cache.entries.as_ref().map_or(0, Vec::len),
            sort_option
        );
        if let Some(host) = host {
            host.request_update(cache);
        }
        UpdateOutcome::Committed
    }

    fn is_current(&self, generation: u64) -> bool {
        let state = self.state();
        state.lifecycle == Lifecycle::Attached && state.generation == generation
    }

    fn snapshot_query(&self) -> SnapshotQuery {
        SnapshotQuery {
            max_age_days: self.settings.max_age_days,
            limit: self.settings.history_limit,
        }
    }

    fn group_snapshot(&self, sort_option: SortOption, snapshot: &HistorySnapshot) -> Vec<CardEntry<Visit>> {
        let now = self.clock.now();
        group(sort_option, snapshot, &now)
    }

    /// The last committed results. Replaced wholesale on every commit.
    pub fn cache(&self) -> Arc<ResultsCache> {
        Arc::clone(&self.state().cache)
    }

    /// Whether no result has been committed yet.
    pub fn is_pending(&self) -> bool {
        self.state().cache.is_pending()
    }

    /// Committed cards, or none while pending.
    pub fn history_visits(&self) -> Vec<CardEntry<VisitRow>> {
        self.cache().entries.clone().unwrap_or_default()
    }

    pub fn search_query(&self) -> String {
        self.state().search_query.clone()
    }

    pub fn sort_option(&self) -> SortOption {
        self.state().sort_option
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.state().lifecycle != Lifecycle::Attached {
            ControllerPhase::Detached
        } else if self.in_flight.load(Ordering::SeqCst) > 0 {
            ControllerPhase::Fetching
        } else {
            ControllerPhase::Idle
        }
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }
}

async fn listen<S: VisitSource, C: Clock>(
    controller: Weak<QueryController<S, C>>,
    mut changes: HistoryChanges,
) {
    loop {
        match changes.recv().await {
            Ok(snapshot) => {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.handle_history_changed(snapshot).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("History change listener skipped {} snapshots", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!("History change listener stopped");
}
