use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use resdesk_core::query::ReservationQuery;

use crate::state::{ReservationsState, StoreEvent};

/// Shared handle over the reservations state.
///
/// Cloning is cheap; every clone dispatches into and observes the same state.
#[derive(Clone)]
pub struct ReservationStore {
    sender: Arc<watch::Sender<ReservationsState>>,
    generations: Arc<AtomicU64>,
}

impl ReservationStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(ReservationsState::default());
        Self {
            sender: Arc::new(sender),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Apply a transition and wake subscribers if it changed anything.
    /// Returns `false` when the event was rejected as stale.
    pub fn dispatch(&self, event: StoreEvent) -> bool {
        let applied = self.sender.send_if_modified(|state| state.apply(event));
        if !applied {
            tracing::warn!("Ignored superseded list event");
        }
        applied
    }

    /// Generation for the next list request; strictly increasing.
    pub fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record `query` as the current list request and return its generation.
    ///
    /// The query is visible to readers before any repository call is made.
    pub fn request_list(&self, query: ReservationQuery) -> u64 {
        let generation = self.next_generation();
        self.dispatch(StoreEvent::ListRequested { query, generation });
        generation
    }

    pub fn snapshot(&self) -> ReservationsState {
        self.sender.borrow().clone()
    }

    /// Read a projection without cloning the whole state
    pub fn read<R>(&self, f: impl FnOnce(&ReservationsState) -> R) -> R {
        f(&self.sender.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<ReservationsState> {
        self.sender.subscribe()
    }
}

impl Default for ReservationStore {
    fn default() -> Self {
        Self::new()
    }
}
