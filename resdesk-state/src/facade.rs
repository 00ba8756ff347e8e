use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};

use resdesk_core::query::{
    ListParams, PageInfo, PaginationParams, ReservationFilters, ReservationQuery, SortField,
    SortOrder,
};
use resdesk_core::reservation::{
    ReservationChanges, ReservationDetail, ReservationId, ReservationSummary,
};
use resdesk_core::ReservationRepository;

use crate::notifier::Notifier;
use crate::orchestrator::{Intent, Orchestrator};
use crate::state::{ErrorInfo, ReservationsState, StoreEvent};
use crate::store::ReservationStore;
use crate::StateError;

/// Read/write surface over the reservations pipeline.
///
/// Writes are fire-and-forget: they enqueue an [`Intent`] and return once it
/// is accepted. Outcomes show up through the read side.
#[derive(Clone)]
pub struct ReservationsFacade {
    store: ReservationStore,
    intents: mpsc::UnboundedSender<Intent>,
    default_page_size: u32,
}

impl ReservationsFacade {
    pub fn new(
        store: ReservationStore,
        intents: mpsc::UnboundedSender<Intent>,
        default_page_size: u32,
    ) -> Self {
        Self {
            store,
            intents,
            default_page_size,
        }
    }

    /// Wire a store, an orchestrator and a facade together.
    pub fn start(
        repository: Arc<dyn ReservationRepository>,
        notifier: Arc<dyn Notifier>,
        default_page_size: u32,
    ) -> (Self, JoinHandle<()>) {
        let store = ReservationStore::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Orchestrator::new(repository, store.clone(), notifier).spawn(rx);
        (Self::new(store, tx, default_page_size), handle)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn reservations(&self) -> Vec<ReservationSummary> {
        self.store.read(ReservationsState::reservations)
    }

    pub fn loading(&self) -> bool {
        self.store.read(ReservationsState::loading)
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.store.read(|state| state.error.clone())
    }

    pub fn total(&self) -> u64 {
        self.store.read(ReservationsState::total)
    }

    pub fn pagination(&self) -> PageInfo {
        self.store.read(|state| state.pagination)
    }

    pub fn current_filters(&self) -> ReservationFilters {
        self.store.read(|state| state.current_filters().clone())
    }

    pub fn reservation_by_id(&self, id: &ReservationId) -> Option<ReservationSummary> {
        self.store.read(|state| state.reservation_by_id(id).cloned())
    }

    pub fn reservation_detail(&self, id: &ReservationId) -> Option<ReservationDetail> {
        self.store.read(|state| state.detail(id).cloned())
    }

    pub fn subscribe(&self) -> watch::Receiver<ReservationsState> {
        self.store.subscribe()
    }

    /// The current list, then every list after each state change
    pub fn reservations_stream(&self) -> impl Stream<Item = Vec<ReservationSummary>> {
        WatchStream::new(self.store.subscribe()).map(|state| state.reservations())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn load(&self, params: ListParams) -> Result<(), StateError> {
        self.request_list(params.into_query(self.default_page_size))
    }

    pub fn load_with_filters(
        &self,
        filters: ReservationFilters,
        pagination: Option<PaginationParams>,
    ) -> Result<(), StateError> {
        let pagination = pagination.unwrap_or(PaginationParams {
            size: self.default_page_size,
            ..PaginationParams::default()
        });
        self.request_list(ReservationQuery::new(filters, pagination))
    }

    pub fn load_detail(&self, id: ReservationId) -> Result<(), StateError> {
        self.send(Intent::LoadDetail(id))
    }

    pub fn update(&self, id: ReservationId, changes: ReservationChanges) -> Result<(), StateError> {
        self.send(Intent::Update { id, changes })
    }

    pub fn cancel(&self, id: ReservationId) -> Result<(), StateError> {
        self.send(Intent::Cancel { id })
    }

    pub fn load_page(&self, page: u32) -> Result<(), StateError> {
        let mut query = self.current_query();
        query.pagination.page = page;
        self.request_list(query)
    }

    /// Changing the size returns to the first page
    pub fn change_page_size(&self, size: u32) -> Result<(), StateError> {
        let mut query = self.current_query();
        query.pagination.page = 0;
        query.pagination.size = size;
        self.request_list(query)
    }

    /// Blank terms clear the search
    pub fn search(&self, term: &str) -> Result<(), StateError> {
        let mut query = self.current_query();
        let term = term.trim();
        query.filters.search_term = (!term.is_empty()).then(|| term.to_string());
        query.pagination.page = 0;
        self.request_list(query)
    }

    pub fn sort(&self, field: SortField, order: SortOrder) -> Result<(), StateError> {
        let query = self.current_query();
        let query = ReservationQuery {
            pagination: query.pagination.sorted(field, order),
            ..query
        };
        self.request_list(query)
    }

    /// Re-issue the current query
    pub fn refresh(&self) -> Result<(), StateError> {
        self.request_list(self.current_query())
    }

    pub fn clear_error(&self) {
        self.store.dispatch(StoreEvent::ClearError);
    }

    /// Drop every cached reservation
    pub fn invalidate(&self) {
        self.store.dispatch(StoreEvent::Reset);
    }

    /// The query is recorded before the intent is sent, so the next write
    /// builds on it even if the fetch has not started.
    fn request_list(&self, query: ReservationQuery) -> Result<(), StateError> {
        if self.intents.is_closed() {
            return Err(StateError::OrchestratorStopped);
        }
        let generation = self.store.request_list(query.clone());
        self.send(Intent::LoadList { query, generation })
    }

    fn current_query(&self) -> ReservationQuery {
        self.store.read(|state| state.current_query.clone())
    }

    fn send(&self, intent: Intent) -> Result<(), StateError> {
        self.intents
            .send(intent)
            .map_err(|_| StateError::OrchestratorStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::BroadcastNotifier;
    use resdesk_core::reservation::ReservationStatus;
    use resdesk_shared::NotificationLevel;
    use resdesk_store::InMemoryReservationRepository;
    use std::time::Duration;

    /// Facade wired to an orchestrator-free channel, for asserting emitted intents.
    fn detached() -> (ReservationsFacade, mpsc::UnboundedReceiver<Intent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ReservationsFacade::new(ReservationStore::new(), tx, 20), rx)
    }

    async fn settle<F>(facade: &ReservationsFacade, done: F)
    where
        F: FnMut(&ReservationsState) -> bool,
    {
        let mut rx = facade.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
            .await
            .expect("state settled in time")
            .expect("store alive");
    }

    fn started() -> (ReservationsFacade, BroadcastNotifier) {
        let notifier = BroadcastNotifier::new(16);
        let (facade, _) = ReservationsFacade::start(
            Arc::new(InMemoryReservationRepository::seeded()),
            Arc::new(notifier.clone()),
            20,
        );
        (facade, notifier)
    }

    fn list_queries(rx: &mut mpsc::UnboundedReceiver<Intent>) -> Vec<ReservationQuery> {
        let mut queries = Vec::new();
        while let Ok(Intent::LoadList { query, .. }) = rx.try_recv() {
            queries.push(query);
        }
        queries
    }

    #[tokio::test]
    async fn test_load_applies_default_page() {
        let (facade, mut rx) = detached();
        facade.load(ListParams::default()).unwrap();

        let Some(Intent::LoadList { query, generation }) = rx.recv().await else {
            panic!("expected a list intent");
        };
        assert_eq!(query.pagination.page, 0);
        assert_eq!(query.pagination.size, 20);
        assert_eq!(facade.store.read(|s| s.list_generation), generation);
    }

    #[tokio::test]
    async fn test_back_to_back_writes_keep_current_query() {
        let (facade, mut rx) = detached();
        let filters = ReservationFilters {
            statuses: vec![ReservationStatus::Pending],
            ..ReservationFilters::default()
        };

        facade
            .load_with_filters(filters.clone(), Some(PaginationParams::new(0, 10).unwrap()))
            .unwrap();
        facade.load_page(3).unwrap();
        facade.sort(SortField::CreatedAt, SortOrder::Desc).unwrap();
        facade.change_page_size(50).unwrap();
        facade.search("  ").unwrap();

        let queries = list_queries(&mut rx);
        assert_eq!(queries.len(), 5);
        assert!(queries.iter().all(|q| q.filters.statuses == filters.statuses));
        assert_eq!((queries[1].pagination.page, queries[1].pagination.size), (3, 10));
        assert_eq!(queries[2].pagination.sort_by, Some(SortField::CreatedAt));
        assert_eq!(queries[2].pagination.sort_direction, Some(SortOrder::Desc));
        assert_eq!((queries[3].pagination.page, queries[3].pagination.size), (0, 50));
        assert_eq!(queries[3].pagination.sort_by, Some(SortField::CreatedAt));
        assert_eq!(queries[4].filters.search_term, None);
        assert_eq!(facade.current_filters(), filters);
    }

    #[tokio::test]
    async fn test_refresh_reissues_current_query() {
        let (facade, mut rx) = detached();
        facade
            .load_with_filters(
                ReservationFilters::search("garcia"),
                Some(PaginationParams::new(1, 5).unwrap()),
            )
            .unwrap();
        facade.refresh().unwrap();

        let queries = list_queries(&mut rx);
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1], queries[0]);
    }

    #[tokio::test]
    async fn test_send_fails_once_orchestrator_stopped() {
        let (facade, rx) = detached();
        drop(rx);
        assert_eq!(
            facade.load_detail(ReservationId::from("1")),
            Err(StateError::OrchestratorStopped)
        );
    }

    #[tokio::test]
    async fn test_load_then_read_projections() {
        let (facade, _) = started();
        facade.load(ListParams::default()).unwrap();
        settle(&facade, |s| s.list_generation > 0 && !s.loading()).await;

        assert_eq!(facade.reservations().len(), 5);
        assert_eq!(facade.total(), 5);
        assert_eq!(facade.pagination().total_pages, 1);
        assert!(facade.error().is_none());
        assert_eq!(
            facade.reservation_by_id(&ReservationId::from("3")).map(|s| s.status),
            Some(ReservationStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_page_change_right_after_filtering_keeps_filters() {
        let (facade, _) = started();
        let filters = ReservationFilters {
            statuses: vec![ReservationStatus::Cancelled],
            ..ReservationFilters::default()
        };

        facade.load_with_filters(filters.clone(), None).unwrap();
        facade.load_page(0).unwrap();
        settle(&facade, |s| !s.loading()).await;

        let ids: Vec<_> = facade.reservations().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["3"]);
        assert_eq!(facade.current_filters(), filters);
    }

    #[tokio::test]
    async fn test_cancel_updates_table_and_notifies() {
        let (facade, notifier) = started();
        let mut notifications = notifier.subscribe();
        let id = ReservationId::from("2");

        facade.load(ListParams::default()).unwrap();
        settle(&facade, |s| s.ids.len() == 5 && !s.loading()).await;
        facade.cancel(id.clone()).unwrap();
        settle(&facade, |s| s.detail(&ReservationId::from("2")).is_some() && !s.loading()).await;

        assert_eq!(
            facade.reservation_by_id(&id).map(|s| s.status),
            Some(ReservationStatus::Cancelled)
        );
        assert_eq!(facade.reservations().len(), 5);
        let notification = notifications.recv().await.unwrap();
        assert_eq!(notification.level, NotificationLevel::Success);
    }

    #[tokio::test]
    async fn test_detail_failure_surfaces_error() {
        let (facade, notifier) = started();
        let mut notifications = notifier.subscribe();

        facade.load_detail(ReservationId::from("nonexistent")).unwrap();
        settle(&facade, |s| s.error.is_some()).await;

        assert_eq!(facade.error().map(|e| e.code), Some("NOT_FOUND"));
        assert_eq!(notifications.recv().await.unwrap().level, NotificationLevel::Error);

        facade.clear_error();
        assert!(facade.error().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let (facade, _) = started();
        facade.load_detail(ReservationId::from("1")).unwrap();
        settle(&facade, |s| !s.details.is_empty()).await;

        facade.invalidate();
        assert!(facade.reservation_detail(&ReservationId::from("1")).is_none());
        assert!(facade.reservations().is_empty());
    }

    #[tokio::test]
    async fn test_reservations_stream_yields_current_then_updates() {
        let (facade, _) = started();
        let mut stream = Box::pin(facade.reservations_stream());

        assert!(stream.next().await.unwrap().is_empty());

        facade.load(ListParams::default()).unwrap();
        let loaded = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(items) = stream.next().await {
                if items.len() == 5 {
                    return items;
                }
            }
            Vec::new()
        })
        .await
        .unwrap();
        assert_eq!(loaded[0].id.as_str(), "1");
    }
}
