use serde::Serialize;
use std::collections::HashMap;

use resdesk_core::query::{ListResult, PageInfo, ReservationFilters, ReservationQuery};
use resdesk_core::reservation::{ReservationDetail, ReservationId, ReservationSummary};
use resdesk_core::ReservationError;

/// Operation an error was raised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    List,
    Detail,
    Update,
    Cancel,
}

/// Error surfaced to readers of the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub operation: Operation,
    pub code: &'static str,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(operation: Operation, error: &ReservationError) -> Self {
        Self {
            operation,
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Transitions of [`ReservationsState`]
#[derive(Debug, Clone)]
pub enum StoreEvent {
    ListRequested { query: ReservationQuery, generation: u64 },
    ListSucceeded { result: ListResult, generation: u64 },
    ListFailed { error: ReservationError, generation: u64 },
    DetailRequested { id: ReservationId },
    DetailSucceeded { detail: ReservationDetail },
    DetailFailed { id: ReservationId, error: ReservationError },
    MutationRequested { id: ReservationId, operation: Operation },
    MutationSucceeded { detail: ReservationDetail, operation: Operation },
    MutationFailed { id: ReservationId, operation: Operation, error: ReservationError },
    ClearError,
    /// Drop every cached entity and return to the initial state
    Reset,
}

/// Normalized reservations table plus request bookkeeping.
///
/// `ids` holds the order of the last list page; `entities` holds one summary
/// per id. Detail and mutation results are upserted by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationsState {
    pub ids: Vec<ReservationId>,
    pub entities: HashMap<ReservationId, ReservationSummary>,
    pub details: HashMap<ReservationId, ReservationDetail>,
    pub list_loading: bool,
    pub pending_details: u32,
    pub pending_mutations: u32,
    pub error: Option<ErrorInfo>,
    pub pagination: PageInfo,
    pub current_query: ReservationQuery,
    /// Generation of the most recent list request
    pub list_generation: u64,
}

impl Default for ReservationsState {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            details: HashMap::new(),
            list_loading: false,
            pending_details: 0,
            pending_mutations: 0,
            error: None,
            pagination: PageInfo::default(),
            current_query: ReservationQuery::default(),
            list_generation: 0,
        }
    }
}

impl ReservationsState {
    /// Apply one transition. Returns `false` when the event was ignored as stale.
    pub fn apply(&mut self, event: StoreEvent) -> bool {
        match event {
            StoreEvent::ListRequested { query, generation } => {
                if generation <= self.list_generation {
                    return false;
                }
                self.list_generation = generation;
                self.list_loading = true;
                self.error = None;
                self.current_query = query;
            }
            StoreEvent::ListSucceeded { result, generation } => {
                if !self.awaits_list(generation) {
                    return false;
                }
                self.replace_page(result);
                self.list_loading = false;
            }
            StoreEvent::ListFailed { error, generation } => {
                if !self.awaits_list(generation) {
                    return false;
                }
                self.list_loading = false;
                self.error = Some(ErrorInfo::new(Operation::List, &error));
            }
            StoreEvent::DetailRequested { .. } => {
                self.pending_details += 1;
                self.error = None;
            }
            StoreEvent::DetailSucceeded { detail } => {
                self.pending_details = self.pending_details.saturating_sub(1);
                self.upsert(detail);
            }
            StoreEvent::DetailFailed { error, .. } => {
                self.pending_details = self.pending_details.saturating_sub(1);
                self.error = Some(ErrorInfo::new(Operation::Detail, &error));
            }
            StoreEvent::MutationRequested { .. } => {
                self.pending_mutations += 1;
                self.error = None;
            }
            StoreEvent::MutationSucceeded { detail, .. } => {
                self.pending_mutations = self.pending_mutations.saturating_sub(1);
                self.upsert(detail);
            }
            StoreEvent::MutationFailed {
                operation, error, ..
            } => {
                self.pending_mutations = self.pending_mutations.saturating_sub(1);
                self.error = Some(ErrorInfo::new(operation, &error));
            }
            StoreEvent::ClearError => {
                self.error = None;
            }
            StoreEvent::Reset => {
                // Keep the counter so a list issued before the reset stays stale.
                // Detail and mutation requests still in flight will complete.
                *self = Self {
                    list_generation: self.list_generation,
                    pending_details: self.pending_details,
                    pending_mutations: self.pending_mutations,
                    ..Self::default()
                };
            }
        }
        true
    }

    /// Only the latest list request, while still outstanding, may complete.
    fn awaits_list(&self, generation: u64) -> bool {
        self.list_loading && generation == self.list_generation
    }

    fn replace_page(&mut self, result: ListResult) {
        self.ids = result.items.iter().map(|item| item.id.clone()).collect();
        self.entities = result
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        self.pagination = result.pagination;

        // The detail cache only holds rows of the current page that agree with it
        let entities = &self.entities;
        self.details.retain(|id, detail| match entities.get(id) {
            Some(summary) => summary.updated_at == detail.summary.updated_at,
            None => false,
        });
    }

    fn upsert(&mut self, detail: ReservationDetail) {
        let id = detail.id().clone();
        if !self.entities.contains_key(&id) {
            self.ids.push(id.clone());
        }
        self.entities.insert(id.clone(), detail.to_summary());
        self.details.insert(id, detail);
    }

    pub fn reservations(&self) -> Vec<ReservationSummary> {
        self.ids
            .iter()
            .filter_map(|id| self.entities.get(id))
            .cloned()
            .collect()
    }

    pub fn loading(&self) -> bool {
        self.list_loading || self.pending_details > 0 || self.pending_mutations > 0
    }

    pub fn total(&self) -> u64 {
        self.pagination.total_items
    }

    pub fn current_filters(&self) -> &ReservationFilters {
        &self.current_query.filters
    }

    pub fn reservation_by_id(&self, id: &ReservationId) -> Option<&ReservationSummary> {
        self.entities.get(id)
    }

    pub fn detail(&self, id: &ReservationId) -> Option<&ReservationDetail> {
        self.details.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use resdesk_core::reservation::ReservationStatus;
    use resdesk_store::seed;

    fn page_of(details: &[ReservationDetail]) -> ListResult {
        ListResult {
            items: details.iter().map(ReservationDetail::to_summary).collect(),
            pagination: PageInfo::new(0, 20, details.len() as u64),
        }
    }

    fn loaded_state() -> ReservationsState {
        let mut state = ReservationsState::default();
        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 1,
        });
        state.apply(StoreEvent::ListSucceeded {
            result: page_of(&seed::reservations()),
            generation: 1,
        });
        state
    }

    #[test]
    fn test_initial_state() {
        let state = ReservationsState::default();
        assert!(state.reservations().is_empty());
        assert!(!state.loading());
        assert_eq!(state.pagination.page, 0);
        assert_eq!(state.pagination.size, 20);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_list_success_replaces_table() {
        let state = loaded_state();
        let ids: Vec<_> = state.reservations().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(state.total(), 5);
        assert_eq!(state.pagination.total_pages, 1);
        assert!(!state.loading());
    }

    #[test]
    fn test_list_request_keeps_entities() {
        let mut state = loaded_state();
        state.error = Some(ErrorInfo::new(Operation::Detail, &ReservationError::NotFound("9".into())));

        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 2,
        });

        assert!(state.loading());
        assert!(state.error.is_none());
        assert_eq!(state.reservations().len(), 5);
    }

    #[test]
    fn test_list_failure_keeps_entities() {
        let mut state = loaded_state();
        let before = state.reservations();

        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 2,
        });
        state.apply(StoreEvent::ListFailed {
            error: ReservationError::Transport("connection reset".into()),
            generation: 2,
        });

        assert_eq!(state.reservations(), before);
        assert!(!state.loading());
        let error = state.error.unwrap();
        assert_eq!(error.operation, Operation::List);
        assert_eq!(error.code, "TRANSPORT");
    }

    #[test]
    fn test_stale_list_completion_is_ignored() {
        let mut state = ReservationsState::default();
        let seed = seed::reservations();

        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 1,
        });
        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 2,
        });

        assert!(state.apply(StoreEvent::ListSucceeded {
            result: page_of(&seed[..2]),
            generation: 2,
        }));
        assert!(!state.apply(StoreEvent::ListSucceeded {
            result: page_of(&seed),
            generation: 1,
        }));
        assert!(!state.apply(StoreEvent::ListFailed {
            error: ReservationError::Transport("late".into()),
            generation: 1,
        }));

        assert_eq!(state.reservations().len(), 2);
        assert!(state.error.is_none());
        assert!(!state.loading());
    }

    #[test]
    fn test_upsert_never_duplicates() {
        let mut state = loaded_state();
        let mut detail = seed::reservations().remove(1);

        state.apply(StoreEvent::DetailRequested { id: detail.id().clone() });
        state.apply(StoreEvent::DetailSucceeded { detail: detail.clone() });

        detail.summary.status = ReservationStatus::Cancelled;
        state.apply(StoreEvent::MutationRequested {
            id: detail.id().clone(),
            operation: Operation::Cancel,
        });
        state.apply(StoreEvent::MutationSucceeded {
            detail: detail.clone(),
            operation: Operation::Cancel,
        });

        assert_eq!(state.ids.iter().filter(|id| *id == detail.id()).count(), 1);
        assert_eq!(state.reservations().len(), 5);
        assert_eq!(state.reservation_by_id(detail.id()), Some(&detail.summary));
        assert_eq!(state.detail(detail.id()), Some(&detail));
        assert!(!state.loading());
    }

    #[test]
    fn test_upsert_appends_unknown_id() {
        let mut state = ReservationsState::default();
        let detail = seed::reservations().remove(3);

        state.apply(StoreEvent::DetailRequested { id: detail.id().clone() });
        assert!(state.loading());
        state.apply(StoreEvent::DetailSucceeded { detail: detail.clone() });

        assert_eq!(state.ids, vec![detail.id().clone()]);
        assert!(!state.loading());
    }

    #[test]
    fn test_failed_mutation_leaves_entity_unchanged() {
        let mut state = loaded_state();
        let id = ReservationId::from("1");
        let before = state.reservation_by_id(&id).cloned();

        state.apply(StoreEvent::MutationRequested {
            id: id.clone(),
            operation: Operation::Update,
        });
        state.apply(StoreEvent::MutationFailed {
            id: id.clone(),
            operation: Operation::Update,
            error: ReservationError::Transport("HTTP 503".into()),
        });

        assert_eq!(state.reservation_by_id(&id).cloned(), before);
        assert_eq!(state.error.as_ref().map(|e| e.operation), Some(Operation::Update));
        assert!(!state.loading());
    }

    #[test]
    fn test_loading_tracks_each_class() {
        let mut state = ReservationsState::default();
        let id = ReservationId::from("1");

        state.apply(StoreEvent::DetailRequested { id: id.clone() });
        state.apply(StoreEvent::MutationRequested {
            id: id.clone(),
            operation: Operation::Update,
        });
        state.apply(StoreEvent::DetailFailed {
            id: id.clone(),
            error: ReservationError::NotFound("1".into()),
        });
        assert!(state.loading());

        state.apply(StoreEvent::MutationFailed {
            id,
            operation: Operation::Update,
            error: ReservationError::NotFound("1".into()),
        });
        assert!(!state.loading());
    }

    #[test]
    fn test_list_evicts_outdated_details() {
        let mut state = loaded_state();
        let seed = seed::reservations();
        state.apply(StoreEvent::DetailSucceeded { detail: seed[0].clone() });
        state.apply(StoreEvent::DetailSucceeded { detail: seed[1].clone() });

        let mut newer = seed.clone();
        newer[0].summary.updated_at = newer[0].summary.updated_at + Duration::minutes(1);
        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 2,
        });
        state.apply(StoreEvent::ListSucceeded {
            result: page_of(&newer),
            generation: 2,
        });

        assert!(state.detail(seed[0].id()).is_none());
        assert!(state.detail(seed[1].id()).is_some());
    }

    #[test]
    fn test_list_evicts_details_leaving_page() {
        let mut state = loaded_state();
        let seed = seed::reservations();
        state.apply(StoreEvent::DetailSucceeded { detail: seed[0].clone() });
        state.apply(StoreEvent::DetailSucceeded { detail: seed[4].clone() });

        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 2,
        });
        state.apply(StoreEvent::ListSucceeded {
            result: page_of(&seed[..2]),
            generation: 2,
        });

        assert!(state.detail(seed[0].id()).is_some());
        assert!(state.detail(seed[4].id()).is_none());
        assert_eq!(state.details.len(), 1);
    }

    #[test]
    fn test_reset_keeps_in_flight_requests_loading() {
        let mut state = ReservationsState::default();
        let detail = seed::reservations().remove(0);

        state.apply(StoreEvent::DetailRequested { id: detail.id().clone() });
        state.apply(StoreEvent::Reset);
        state.apply(StoreEvent::MutationRequested {
            id: detail.id().clone(),
            operation: Operation::Update,
        });

        state.apply(StoreEvent::DetailSucceeded { detail: detail.clone() });
        assert!(state.loading());

        state.apply(StoreEvent::MutationSucceeded {
            detail,
            operation: Operation::Update,
        });
        assert!(!state.loading());
    }

    #[test]
    fn test_reset_and_clear_error() {
        let mut state = loaded_state();
        state.apply(StoreEvent::DetailFailed {
            id: ReservationId::from("9"),
            error: ReservationError::NotFound("9".into()),
        });
        state.apply(StoreEvent::ClearError);
        assert!(state.error.is_none());

        state.apply(StoreEvent::Reset);
        assert!(state.reservations().is_empty());
        assert_eq!(state.pagination, PageInfo::default());
    }

    #[test]
    fn test_reset_makes_in_flight_list_stale() {
        let mut state = ReservationsState::default();
        state.apply(StoreEvent::ListRequested {
            query: ReservationQuery::default(),
            generation: 1,
        });
        state.apply(StoreEvent::Reset);

        assert!(!state.apply(StoreEvent::ListSucceeded {
            result: page_of(&seed::reservations()),
            generation: 1,
        }));
        assert!(state.reservations().is_empty());
        assert!(!state.loading());
    }
}
