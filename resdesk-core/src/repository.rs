use async_trait::async_trait;

use crate::query::{
    ExportFile, ExportFormat, ListParams, ListResult, PaginationParams, ReservationFilters,
};
use crate::reservation::{ReservationChanges, ReservationDetail, ReservationId};
use crate::ReservationResult;

/// Repository port for reservation data access
///
/// Implemented by a transport-backed repository and an in-memory one; both
/// must answer identical logical queries with identical [`ListResult`]s.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Fetch one page. Never mutates.
    async fn list(&self, params: &ListParams) -> ReservationResult<ListResult>;

    /// Fails with `NotFound` when no reservation has this id
    async fn get_by_id(&self, id: &ReservationId) -> ReservationResult<ReservationDetail>;

    /// Apply partial changes and return the full updated reservation
    async fn update(
        &self,
        id: &ReservationId,
        changes: &ReservationChanges,
    ) -> ReservationResult<ReservationDetail>;

    /// Set CANCELLED / REFUNDED. Cancelling twice returns the same terminal state.
    async fn cancel(&self, id: &ReservationId) -> ReservationResult<ReservationDetail>;

    async fn search(
        &self,
        filters: &ReservationFilters,
        pagination: &PaginationParams,
    ) -> ReservationResult<ListResult>;

    async fn export(
        &self,
        filters: &ReservationFilters,
        format: ExportFormat,
    ) -> ReservationResult<ExportFile>;
}
