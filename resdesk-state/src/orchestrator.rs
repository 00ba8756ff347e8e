use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use resdesk_core::query::ReservationQuery;
use resdesk_core::reservation::{ReservationChanges, ReservationId};
use resdesk_core::ReservationRepository;
use resdesk_shared::Masked;

use crate::notifier::Notifier;
use crate::state::{Operation, StoreEvent};
use crate::store::ReservationStore;

/// Commands accepted by the [`Orchestrator`]
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Fetch a page already recorded through [`ReservationStore::request_list`]
    LoadList {
        query: ReservationQuery,
        generation: u64,
    },
    LoadDetail(ReservationId),
    Update {
        id: ReservationId,
        changes: ReservationChanges,
    },
    Cancel {
        id: ReservationId,
    },
}

/// Runs intents against the repository and feeds outcomes into the store.
///
/// Every intent runs in its own task; a failure is dispatched and notified
/// once and never retried.
pub struct Orchestrator {
    repository: Arc<dyn ReservationRepository>,
    store: ReservationStore,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        repository: Arc<dyn ReservationRepository>,
        store: ReservationStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            store,
            notifier,
        }
    }

    /// Consume `intents` until every sender is dropped.
    pub fn spawn(self, mut intents: mpsc::UnboundedReceiver<Intent>) -> JoinHandle<()> {
        let orchestrator = Arc::new(self);
        tokio::spawn(async move {
            while let Some(intent) = intents.recv().await {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.handle(intent).await });
            }
            tracing::debug!("Intent channel closed, orchestrator stopping");
        })
    }

    pub async fn handle(&self, intent: Intent) {
        match intent {
            Intent::LoadList { query, generation } => self.load_list(query, generation).await,
            Intent::LoadDetail(id) => self.load_detail(id).await,
            Intent::Update { id, changes } => self.update(id, changes).await,
            Intent::Cancel { id } => self.cancel(id).await,
        }
    }

    async fn load_list(&self, query: ReservationQuery, generation: u64) {
        let result = match query.as_list_params() {
            Some(params) => self.repository.list(&params).await,
            None => {
                self.repository
                    .search(&query.filters, &query.pagination)
                    .await
            }
        };

        match result {
            Ok(result) => {
                tracing::debug!(
                    generation,
                    page = result.pagination.page,
                    items = result.items.len(),
                    "Reservations loaded"
                );
                self.store
                    .dispatch(StoreEvent::ListSucceeded { result, generation });
            }
            Err(error) => {
                let message = format!("Failed to load reservations: {}", error);
                // A superseded request fails silently
                if self
                    .store
                    .dispatch(StoreEvent::ListFailed { error, generation })
                {
                    tracing::error!(generation, "{}", message);
                    self.notifier.error(&message);
                }
            }
        }
    }

    async fn load_detail(&self, id: ReservationId) {
        self.store
            .dispatch(StoreEvent::DetailRequested { id: id.clone() });

        match self.repository.get_by_id(&id).await {
            Ok(detail) => {
                self.store.dispatch(StoreEvent::DetailSucceeded { detail });
            }
            Err(error) => {
                tracing::error!(reservation_id = %id, error = %error, "Failed to load reservation");
                self.notifier
                    .error(&format!("Failed to load reservation {}: {}", id, error));
                self.store.dispatch(StoreEvent::DetailFailed { id, error });
            }
        }
    }

    async fn update(&self, id: ReservationId, changes: ReservationChanges) {
        let operation = Operation::Update;
        self.store.dispatch(StoreEvent::MutationRequested {
            id: id.clone(),
            operation,
        });
        if let Some(buyer) = &changes.buyer {
            tracing::info!(reservation_id = %id, buyer = %Masked(&buyer.name), "Updating buyer contact");
        }

        match self.repository.update(&id, &changes).await {
            Ok(detail) => {
                tracing::info!(reservation_id = %id, status = %detail.summary.status, "Reservation updated");
                self.notifier
                    .success(&format!("Reservation {} updated", detail.summary.pnr));
                self.store
                    .dispatch(StoreEvent::MutationSucceeded { detail, operation });
            }
            Err(error) => {
                tracing::error!(reservation_id = %id, error = %error, "Failed to update reservation");
                self.notifier
                    .error(&format!("Failed to update reservation {}: {}", id, error));
                self.store.dispatch(StoreEvent::MutationFailed {
                    id,
                    operation,
                    error,
                });
            }
        }
    }

    async fn cancel(&self, id: ReservationId) {
        let operation = Operation::Cancel;
        self.store.dispatch(StoreEvent::MutationRequested {
            id: id.clone(),
            operation,
        });

        match self.repository.cancel(&id).await {
            Ok(detail) => {
                tracing::info!(reservation_id = %id, "Reservation cancelled");
                self.notifier
                    .success(&format!("Reservation {} cancelled", detail.summary.pnr));
                self.store
                    .dispatch(StoreEvent::MutationSucceeded { detail, operation });
            }
            Err(error) => {
                tracing::error!(reservation_id = %id, error = %error, "Failed to cancel reservation");
                self.notifier
                    .error(&format!("Failed to cancel reservation {}: {}", id, error));
                self.store.dispatch(StoreEvent::MutationFailed {
                    id,
                    operation,
                    error,
                });
            }
        }
    }
}
