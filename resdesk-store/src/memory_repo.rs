use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use resdesk_core::query::{
    ExportFile, ExportFormat, ListParams, ListResult, PaginationParams, ReservationFilters,
    ReservationQuery, DEFAULT_PAGE_SIZE,
};
use resdesk_core::reservation::{
    AuditAuthor, AuditEvent, CancellationInfo, PaymentStatus, RefundStatus, ReservationChanges,
    ReservationDetail, ReservationId, ReservationStatus, StatusActor, StatusChange,
};
use resdesk_core::{ReservationError, ReservationRepository, ReservationResult};
use resdesk_shared::mask_email;

use crate::seed;

/// In-process reservation store for development and tests.
///
/// Keeps insertion order, which is the order unsorted queries return.
pub struct InMemoryReservationRepository {
    reservations: RwLock<Vec<ReservationDetail>>,
    default_page_size: u32,
    latency: Option<Duration>,
}

impl InMemoryReservationRepository {
    pub fn new(reservations: Vec<ReservationDetail>) -> Self {
        Self {
            reservations: RwLock::new(reservations),
            default_page_size: DEFAULT_PAGE_SIZE,
            latency: None,
        }
    }

    /// Repository preloaded with the deterministic seed
    pub fn seeded() -> Self {
        Self::new(seed::reservations())
    }

    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Delay every call, to mimic a remote backend
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn operator() -> StatusActor {
    StatusActor {
        id: "backoffice".to_string(),
        name: "Back office".to_string(),
        actor_type: "admin".to_string(),
    }
}

fn record_status_change(detail: &mut ReservationDetail, status: ReservationStatus, reason: &str) {
    let now = Utc::now();
    let actor = operator();

    detail.status_history.push(StatusChange {
        id: Uuid::new_v4().to_string(),
        status,
        timestamp: now,
        reason: reason.to_string(),
        author: actor.clone(),
    });

    let mut metadata = serde_json::Map::new();
    metadata.insert("from".into(), detail.summary.status.as_str().into());
    metadata.insert("to".into(), status.as_str().into());
    detail.audit_events.push(AuditEvent {
        id: Uuid::new_v4().to_string(),
        reservation_id: detail.id().clone(),
        event_type: "status_changed".to_string(),
        timestamp: now,
        author: AuditAuthor {
            id: actor.id,
            name: actor.name,
            email: String::new(),
            author_type: actor.actor_type,
        },
        description: reason.to_string(),
        metadata,
    });

    detail.summary.status = status;
}

fn apply_changes(detail: &mut ReservationDetail, changes: &ReservationChanges) {
    if let Some(status) = changes.status {
        if status != detail.summary.status {
            record_status_change(detail, status, "Updated from back office");
        }
    }
    if let Some(payment_status) = changes.payment_status {
        detail.summary.payment_status = payment_status;
    }
    if let Some(priority) = changes.priority {
        detail.summary.priority = priority;
    }
    if let Some(tags) = &changes.tags {
        detail.summary.tags = tags.clone();
    }
    if let Some(buyer) = &changes.buyer {
        detail.summary.customer_name = buyer.name.clone();
        detail.summary.customer_email = buyer.email.clone();
        detail.buyer = buyer.clone();
    }
    if let Some(notifications) = changes.notifications {
        detail.notifications = notifications;
    }
    if let Some(requests) = &changes.special_requests {
        detail.special_requests = requests.clone();
    }
    detail.summary.updated_at = Utc::now();
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn list(&self, params: &ListParams) -> ReservationResult<ListResult> {
        self.simulate_latency().await;
        let query = params.clone().into_query(self.default_page_size);
        let reservations = self.reservations.read().await;
        query.apply(reservations.iter())
    }

    async fn get_by_id(&self, id: &ReservationId) -> ReservationResult<ReservationDetail> {
        self.simulate_latency().await;
        let reservations = self.reservations.read().await;
        reservations
            .iter()
            .find(|detail| detail.id() == id)
            .cloned()
            .ok_or_else(|| ReservationError::NotFound(id.to_string()))
    }

    async fn update(
        &self,
        id: &ReservationId,
        changes: &ReservationChanges,
    ) -> ReservationResult<ReservationDetail> {
        self.simulate_latency().await;
        let mut reservations = self.reservations.write().await;
        let detail = reservations
            .iter_mut()
            .find(|detail| detail.id() == id)
            .ok_or_else(|| ReservationError::NotFound(id.to_string()))?;

        apply_changes(detail, changes);
        tracing::info!(
            reservation_id = %id,
            customer = %mask_email(&detail.summary.customer_email),
            "Reservation updated"
        );
        Ok(detail.clone())
    }

    async fn cancel(&self, id: &ReservationId) -> ReservationResult<ReservationDetail> {
        self.simulate_latency().await;
        let mut reservations = self.reservations.write().await;
        let detail = reservations
            .iter_mut()
            .find(|detail| detail.id() == id)
            .ok_or_else(|| ReservationError::NotFound(id.to_string()))?;

        let settled = detail.summary.payment_status == PaymentStatus::Refunded
            && detail.cancellation.is_some();
        if detail.is_cancelled() && settled {
            tracing::debug!(reservation_id = %id, "Reservation already cancelled");
            return Ok(detail.clone());
        }

        // A status set to CANCELLED through `update` still needs its refund settled
        if !detail.is_cancelled() {
            record_status_change(detail, ReservationStatus::Cancelled, "Cancelled from back office");
        }
        let now = Utc::now();
        detail.summary.payment_status = PaymentStatus::Refunded;
        detail.summary.updated_at = now;
        if detail.cancellation.is_none() {
            detail.cancellation = Some(CancellationInfo {
                requested_at: now,
                processed_at: Some(now),
                reason: "Cancelled from back office".to_string(),
                refund_amount: Some(detail.pricing.total_amount),
                refund_status: Some(RefundStatus::Processed),
                cancellation_fee: None,
            });
        }

        tracing::info!(
            reservation_id = %id,
            customer = %mask_email(&detail.summary.customer_email),
            "Reservation cancelled"
        );
        Ok(detail.clone())
    }

    async fn search(
        &self,
        filters: &ReservationFilters,
        pagination: &PaginationParams,
    ) -> ReservationResult<ListResult> {
        self.simulate_latency().await;
        let query = ReservationQuery::new(filters.clone(), *pagination);
        let reservations = self.reservations.read().await;
        query.apply(reservations.iter())
    }

    /// Always renders CSV rows; only the declared content type follows `format`.
    async fn export(
        &self,
        filters: &ReservationFilters,
        format: ExportFormat,
    ) -> ReservationResult<ExportFile> {
        self.simulate_latency().await;
        let reservations = self.reservations.read().await;

        let mut body = String::from("id,pnr,customer,status\n");
        for detail in reservations.iter().filter(|detail| filters.matches(detail)) {
            let summary = &detail.summary;
            body.push_str(&format!(
                "{},{},{},{}\n",
                csv_field(summary.id.as_str()),
                csv_field(&summary.pnr),
                csv_field(&summary.customer_name),
                summary.status
            ));
        }

        Ok(ExportFile {
            format,
            content_type: format.content_type().to_string(),
            bytes: body.into_bytes(),
        })
    }
}
