use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use resdesk_core::query::{
    ExportFile, ExportFormat, ListParams, ListResult, PaginationParams, ReservationFilters,
};
use resdesk_core::reservation::{ReservationChanges, ReservationDetail, ReservationId};
use resdesk_core::{ReservationError, ReservationRepository, ReservationResult};

use crate::dto::{BookingDto, BookingListResponseDto};
use crate::mapping;
use crate::transport::{HttpRequest, HttpResponse, Transport};

pub const RESERVATIONS_PATH: &str = "/admin/reservations";

/// Repository backed by the reservations admin API.
pub struct HttpReservationRepository {
    transport: Arc<dyn Transport>,
}

impl HttpReservationRepository {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call(&self, request: HttpRequest) -> ReservationResult<HttpResponse> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        tracing::warn!(path = %path, status = response.status, "admin API returned an error status");
        match response.status {
            404 => Err(ReservationError::NotFound(path)),
            status => Err(ReservationError::Transport(format!(
                "{} returned HTTP {}: {}",
                path,
                status,
                String::from_utf8_lossy(&response.body)
            ))),
        }
    }

    async fn call_json<T: DeserializeOwned>(&self, request: HttpRequest) -> ReservationResult<T> {
        let response = self.call(request).await?;
        serde_json::from_slice(&response.body)
            .map_err(|e| ReservationError::Transport(format!("invalid response body: {}", e)))
    }

    async fn fetch_detail(&self, id: &ReservationId, request: HttpRequest) -> ReservationResult<ReservationDetail> {
        let dto: BookingDto = self.call_json(request).await.map_err(|e| match e {
            ReservationError::NotFound(_) => ReservationError::NotFound(id.to_string()),
            other => other,
        })?;
        mapping::to_detail(&dto)
    }
}

fn detail_path(id: &ReservationId) -> String {
    format!("{}/{}", RESERVATIONS_PATH, id)
}

/// Query string of the simple list endpoint. Blank search terms are omitted.
pub fn list_query(params: &ListParams) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(page) = params.page {
        query.push(("page".to_string(), page.to_string()));
    }
    if let Some(size) = params.size {
        query.push(("size".to_string(), size.to_string()));
    }
    if let Some(term) = params.search_term.as_deref().map(str::trim) {
        if !term.is_empty() {
            query.push(("searchTerm".to_string(), term.to_string()));
        }
    }
    if let Some(field) = params.sort_field {
        query.push(("sortField".to_string(), field.as_str().to_string()));
    }
    if let Some(order) = params.sort_order {
        query.push(("sortOrder".to_string(), order.as_str().to_string()));
    }
    query
}

/// Query string of the search endpoint. Multi-valued filters repeat their key.
pub fn search_query(filters: &ReservationFilters, pagination: &PaginationParams) -> Vec<(String, String)> {
    let mut query = vec![
        ("page".to_string(), pagination.page.to_string()),
        ("size".to_string(), pagination.size.to_string()),
    ];
    if let Some(field) = pagination.sort_by {
        query.push(("sortBy".to_string(), field.as_str().to_string()));
    }
    if let Some(order) = pagination.sort_direction {
        query.push(("sortDirection".to_string(), order.as_str().to_string()));
    }
    query.extend(filter_query(filters));
    query
}

pub fn filter_query(filters: &ReservationFilters) -> Vec<(String, String)> {
    let mut query = Vec::new();
    let mut push = |key: &str, value: String| query.push((key.to_string(), value));

    if let Some(range) = &filters.date_range {
        push("startDate", mapping::format_timestamp(&range.start));
        push("endDate", mapping::format_timestamp(&range.end));
    }
    for product_type in &filters.product_types {
        push("productTypes", product_type.as_str().to_string());
    }
    for status in &filters.statuses {
        push("statuses", status.as_str().to_string());
    }
    for payment_status in &filters.payment_statuses {
        push("paymentStatuses", payment_status.as_str().to_string());
    }
    for marketplace in &filters.marketplaces {
        push("marketplaces", marketplace.clone());
    }
    if let Some(term) = filters.search_term.as_deref().map(str::trim) {
        if !term.is_empty() {
            push("searchTerm", term.to_string());
        }
    }
    for priority in &filters.priorities {
        push("priority", priority.as_str().to_string());
    }
    if let Some(has_comments) = filters.has_comments {
        push("hasComments", has_comments.to_string());
    }
    if let Some(has_tickets) = filters.has_support_tickets {
        push("hasSupportTickets", has_tickets.to_string());
    }
    query
}

#[async_trait]
impl ReservationRepository for HttpReservationRepository {
    async fn list(&self, params: &ListParams) -> ReservationResult<ListResult> {
        let request = HttpRequest::get(RESERVATIONS_PATH).with_query(list_query(params));
        let dto: BookingListResponseDto = self.call_json(request).await?;
        mapping::to_list_result(&dto)
    }

    async fn get_by_id(&self, id: &ReservationId) -> ReservationResult<ReservationDetail> {
        self.fetch_detail(id, HttpRequest::get(detail_path(id))).await
    }

    async fn update(
        &self,
        id: &ReservationId,
        changes: &ReservationChanges,
    ) -> ReservationResult<ReservationDetail> {
        let body = serde_json::to_value(mapping::from_domain(changes))
            .map_err(|e| ReservationError::Validation(e.to_string()))?;
        let request = HttpRequest::get(detail_path(id))
            .with_method(Method::PUT)
            .with_body(body);
        self.fetch_detail(id, request).await
    }

    async fn cancel(&self, id: &ReservationId) -> ReservationResult<ReservationDetail> {
        let request = HttpRequest::get(format!("{}/cancel", detail_path(id)))
            .with_method(Method::POST)
            .with_body(serde_json::json!({}));
        self.fetch_detail(id, request).await
    }

    async fn search(
        &self,
        filters: &ReservationFilters,
        pagination: &PaginationParams,
    ) -> ReservationResult<ListResult> {
        pagination.validate()?;
        let request = HttpRequest::get(format!("{}/search", RESERVATIONS_PATH))
            .with_query(search_query(filters, pagination));
        let dto: BookingListResponseDto = self.call_json(request).await?;
        mapping::to_list_result(&dto)
    }

    async fn export(
        &self,
        filters: &ReservationFilters,
        format: ExportFormat,
    ) -> ReservationResult<ExportFile> {
        let mut query = vec![("format".to_string(), format.as_str().to_string())];
        query.extend(filter_query(filters));
        let request = HttpRequest::get(format!("{}/export", RESERVATIONS_PATH)).with_query(query);

        let response = self.call(request).await?;
        Ok(ExportFile {
            format,
            content_type: response
                .content_type
                .unwrap_or_else(|| format.content_type().to_string()),
            bytes: response.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::to_dto;
    use crate::seed;
    use resdesk_core::query::{SortField, SortOrder};
    use resdesk_core::reservation::{ProductType, ReservationStatus};
    use std::sync::Mutex;

    /// Records requests and replays canned responses in order.
    #[derive(Default)]
    struct FakeTransport {
        requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<Vec<HttpResponse>>,
    }

    impl FakeTransport {
        fn replying(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into_iter().rev().collect()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: HttpRequest) -> ReservationResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ReservationError::Transport("no canned response".to_string()))
        }
    }

    fn json_response(status: u16, body: impl serde::Serialize) -> HttpResponse {
        HttpResponse {
            status,
            content_type: Some("application/json".to_string()),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn repository(transport: &Arc<FakeTransport>) -> HttpReservationRepository {
        HttpReservationRepository::new(transport.clone())
    }

    #[tokio::test]
    async fn test_get_by_id_maps_response() {
        let detail = seed::reservations().remove(0);
        let transport = FakeTransport::replying(vec![json_response(200, to_dto(&detail))]);

        let fetched = repository(&transport).get_by_id(detail.id()).await.unwrap();
        assert_eq!(fetched, detail);

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, format!("/admin/reservations/{}", detail.id()));
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let transport = FakeTransport::replying(vec![json_response(404, serde_json::json!({"error": "missing"}))]);
        let result = repository(&transport).get_by_id(&ReservationId::from("999")).await;
        assert_eq!(result, Err(ReservationError::NotFound("999".to_string())));
    }

    #[tokio::test]
    async fn test_server_error_is_transport_error() {
        let transport = FakeTransport::replying(vec![json_response(500, serde_json::json!({"error": "boom"}))]);
        let result = repository(&transport).list(&ListParams::default()).await;
        assert!(matches!(result, Err(ReservationError::Transport(_))));
    }

    #[tokio::test]
    async fn test_update_sends_patch_body() {
        let mut detail = seed::reservations().remove(0);
        detail.summary.status = ReservationStatus::Confirmed;
        let transport = FakeTransport::replying(vec![json_response(200, to_dto(&detail))]);

        let changes = ReservationChanges::status(ReservationStatus::Confirmed);
        let updated = repository(&transport).update(detail.id(), &changes).await.unwrap();
        assert_eq!(updated.summary.status, ReservationStatus::Confirmed);

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.body, Some(serde_json::json!({"status": "confirmed"})));
    }

    #[tokio::test]
    async fn test_cancel_posts_to_cancel_path() {
        let detail = seed::reservations().remove(2);
        let transport = FakeTransport::replying(vec![json_response(200, to_dto(&detail))]);

        repository(&transport).cancel(detail.id()).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/admin/reservations/3/cancel");
    }

    #[tokio::test]
    async fn test_search_encodes_repeated_filters() {
        let transport = FakeTransport::replying(vec![json_response(
            200,
            mapping::to_list_response(&[], &resdesk_core::PageInfo::new(1, 5, 0)),
        )]);
        let filters = ReservationFilters {
            product_types: vec![ProductType::Flight, ProductType::Hotel],
            statuses: vec![ReservationStatus::Pending],
            has_comments: Some(true),
            ..ReservationFilters::default()
        };
        let pagination = PaginationParams::new(1, 5)
            .unwrap()
            .sorted(SortField::CreatedAt, SortOrder::Desc);

        let result = repository(&transport).search(&filters, &pagination).await.unwrap();
        assert!(result.items.is_empty());

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/admin/reservations/search");
        let pairs: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("page", "1"),
                ("size", "5"),
                ("sortBy", "createdAt"),
                ("sortDirection", "desc"),
                ("productTypes", "FLIGHT"),
                ("productTypes", "HOTEL"),
                ("statuses", "PENDING"),
                ("hasComments", "true"),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_item_fails_whole_list() {
        let mut dto = to_dto(&seed::reservations().remove(0));
        dto.status = "on_hold".to_string();
        let body = crate::dto::BookingListResponseDto {
            items: vec![dto],
            pagination: crate::dto::PaginationDto {
                page: 0,
                page_size: 20,
                total_items: 1,
                total_pages: 1,
            },
            filters: None,
        };
        let transport = FakeTransport::replying(vec![json_response(200, body)]);

        let result = repository(&transport).list(&ListParams::default()).await;
        assert!(matches!(result, Err(ReservationError::UnknownEnumValue { field: "status", .. })));
    }

    #[test]
    fn test_list_query_omits_blank_search() {
        let params = ListParams {
            page: Some(2),
            search_term: Some("  ".to_string()),
            ..ListParams::default()
        };
        assert_eq!(list_query(&params), vec![("page".to_string(), "2".to_string())]);
    }
}
