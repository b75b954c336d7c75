//! Event store and view controller.
//!
//! [`EventStore`] is a plain state container with one transition function
//! per user action. [`Controller`] wraps it for the async world: it owns the
//! in-flight load task, aborts superseded loads, and broadcasts a
//! notification after every mutation so the presentation layer can
//! re-render.
//!
//! Only the most recently started load may commit. Superseded tasks are
//! aborted, and any result that still reaches [`EventStore::commit`] with an
//! outdated generation is discarded.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, broadcast};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::client::{FeedSource, TimeRange};
use crate::errors::{ControlError, FetchError, LOAD_FAILED_MESSAGE};
use crate::filters::{self, DerivedStats};
use crate::models::SeismicEvent;

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// User-controlled view parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewState {
    pub min_magnitude: f64,
    pub time_range: TimeRange,
}

/// Load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Proof of which load a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub range: TimeRange,
}

/// What [`EventStore::commit`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Result belonged to the current load and was applied
    Applied,
    /// Result belonged to a superseded load
    Stale,
    /// Load reported cancellation; nothing changed
    Cancelled,
}

/// Latest batch of events plus load status and view parameters.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<SeismicEvent>,
    loading: bool,
    error: Option<String>,
    view: ViewState,
    phase: Phase,
    generation: u64,
}

impl EventStore {
    #[must_use]
    pub fn new(view: ViewState) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn events(&self) -> &[SeismicEvent] {
        &self.events
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.view
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start a load for `range`, superseding any earlier one.
    pub fn begin_load(&mut self, range: TimeRange) -> FetchTicket {
        self.generation += 1;
        self.view.time_range = range;
        self.loading = true;
        self.error = None;
        self.phase = Phase::Loading;

        FetchTicket {
            generation: self.generation,
            range,
        }
    }

    /// Whether `ticket` still identifies the newest load.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Apply the outcome of a load.
    ///
    /// On failure the previous events stay in place so the map keeps
    /// showing the last good snapshot.
    pub fn commit(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<SeismicEvent>, FetchError>,
    ) -> Commit {
        if !self.is_current(ticket) {
            return Commit::Stale;
        }

        match result {
            Ok(events) => {
                self.events = events;
                self.loading = false;
                self.phase = Phase::Loaded;
                Commit::Applied
            }
            Err(e) if e.is_cancelled() => Commit::Cancelled,
            Err(e) => {
                warn!(range = ticket.range.as_str(), "load failed: {e}");
                self.error = Some(LOAD_FAILED_MESSAGE.to_string());
                self.loading = false;
                self.phase = Phase::Failed;
                Commit::Applied
            }
        }
    }

    /// Change the threshold. Never triggers a load.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is NaN. Out-of-range values are clamped.
    pub fn set_min_magnitude(&mut self, value: f64) -> Result<f64, ControlError> {
        let clamped = filters::clamp_min_magnitude(value)
            .ok_or_else(|| ControlError::InvalidMagnitude(value.to_string()))?;
        self.view.min_magnitude = clamped;
        Ok(clamped)
    }

    pub fn reset_min_magnitude(&mut self) {
        self.view.min_magnitude = filters::MIN_MAGNITUDE_FLOOR;
    }

    /// Events visible under the current threshold.
    #[must_use]
    pub fn filtered(&self) -> Vec<&SeismicEvent> {
        filters::filter_events(&self.events, self.view.min_magnitude)
    }

    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::compute(&self.events, self.view.min_magnitude)
    }

    /// Serializable summary for the JSON API.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            view: self.view,
            phase: self.phase,
            loading: self.loading,
            error: self.error.clone(),
            total_events: self.events.len(),
            stats: self.stats(),
        }
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub view: ViewState,
    pub phase: Phase,
    pub loading: bool,
    pub error: Option<String>,
    pub total_events: usize,
    pub stats: DerivedStats,
}

/// Change notifications for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    /// A load started
    Loading,
    /// A load finished (successfully or not)
    Committed,
    /// The threshold changed
    ViewChanged,
}

/// Owns the store and drives loads through a [`FeedSource`].
pub struct Controller<S> {
    source: Arc<S>,
    store: Arc<RwLock<EventStore>>,
    in_flight: Mutex<Option<AbortHandle>>,
    changes: broadcast::Sender<StoreChange>,
}

impl<S: FeedSource> Controller<S> {
    #[must_use]
    pub fn new(source: S, view: ViewState) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            source: Arc::new(source),
            store: Arc::new(RwLock::new(EventStore::new(view))),
            in_flight: Mutex::new(None),
            changes,
        }
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Read access to the store.
    pub async fn read(&self) -> RwLockReadGuard<'_, EventStore> {
        self.store.read().await
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.store.read().await.snapshot()
    }

    /// Switch to `range`: abort the in-flight load and start a new one.
    pub async fn select_time_range(&self, range: TimeRange) -> FetchTicket {
        let mut in_flight = self.in_flight.lock().await;
        let mut store = self.store.write().await;

        if let Some(prior) = in_flight.take() {
            prior.abort();
            debug!("aborted superseded load");
        }

        let ticket = store.begin_load(range);
        info!(range = range.as_str(), "loading earthquakes");

        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.store);
        let changes = self.changes.clone();
        let task = tokio::spawn(async move {
            let result = source.load(range).await;
            let outcome = shared.write().await.commit(ticket, result);
            match outcome {
                Commit::Applied => {
                    let _ = changes.send(StoreChange::Committed);
                }
                Commit::Stale | Commit::Cancelled => {
                    debug!(range = range.as_str(), ?outcome, "discarded load result");
                }
            }
        });
        *in_flight = Some(task.abort_handle());

        // Announced while the store is still locked, so it always precedes
        // this load's Committed.
        let _ = self.changes.send(StoreChange::Loading);
        drop(store);
        ticket
    }

    /// Reload the current time range.
    pub async fn refresh(&self) -> FetchTicket {
        let range = self.store.read().await.view().time_range;
        self.select_time_range(range).await
    }

    /// Change the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is NaN.
    pub async fn set_min_magnitude(&self, value: f64) -> Result<f64, ControlError> {
        let applied = self.store.write().await.set_min_magnitude(value)?;
        debug!(min_magnitude = applied, "threshold changed");
        let _ = self.changes.send(StoreChange::ViewChanged);
        Ok(applied)
    }

    pub async fn reset_min_magnitude(&self) {
        self.store.write().await.reset_min_magnitude();
        debug!("threshold reset");
        let _ = self.changes.send(StoreChange::ViewChanged);
    }
}

impl<S> Drop for Controller<S> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.get_mut().take() {
            task.abort();
        }
    }
}
