use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Query;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use resdesk_core::query::{
    DateRange, ExportFormat, ListParams, PaginationParams, ReservationFilters, SortField,
    SortOrder,
};
use resdesk_core::reservation::{
    PaymentStatus, Priority, ProductType, ReservationDetail, ReservationId, ReservationStatus,
};
use resdesk_core::{ListResult, ReservationError, ReservationResult};
use resdesk_store::dto::{BookingDto, BookingListResponseDto, BookingPatchDto};
use resdesk_store::mapping;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Query Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub search_term: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

impl ListQuery {
    fn into_params(self) -> ReservationResult<ListParams> {
        Ok(ListParams {
            page: self.page,
            size: self.size,
            search_term: self.search_term,
            sort_field: self.sort_field.as_deref().map(str::parse::<SortField>).transpose()?,
            sort_order: self.sort_order.as_deref().map(str::parse::<SortOrder>).transpose()?,
        })
    }
}

/// Advanced filters shared by `/search` and `/export`; multi-valued keys repeat.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub product_types: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub payment_statuses: Vec<String>,
    #[serde(default)]
    pub marketplaces: Vec<String>,
    pub search_term: Option<String>,
    #[serde(default)]
    pub priority: Vec<String>,
    pub has_comments: Option<bool>,
    pub has_support_tickets: Option<bool>,
    /// Export only
    pub format: Option<String>,
}

fn parse_all<T>(values: &[String]) -> ReservationResult<Vec<T>>
where
    T: std::str::FromStr<Err = ReservationError>,
{
    values.iter().map(|value| value.parse()).collect()
}

fn parse_instant(field: &'static str, raw: &str) -> ReservationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| ReservationError::malformed_timestamp(field, raw))
}

impl SearchQuery {
    fn filters(&self) -> ReservationResult<ReservationFilters> {
        let date_range = match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Some(DateRange {
                start: parse_instant("startDate", start)?,
                end: parse_instant("endDate", end)?,
            }),
            (None, None) => None,
            _ => {
                return Err(ReservationError::Validation(
                    "startDate and endDate must be given together".to_string(),
                ))
            }
        };

        Ok(ReservationFilters {
            date_range,
            product_types: parse_all::<ProductType>(&self.product_types)?,
            statuses: parse_all::<ReservationStatus>(&self.statuses)?,
            payment_statuses: parse_all::<PaymentStatus>(&self.payment_statuses)?,
            marketplaces: self.marketplaces.clone(),
            search_term: self
                .search_term
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map(str::to_string),
            priorities: parse_all::<Priority>(&self.priority)?,
            has_comments: self.has_comments,
            has_support_tickets: self.has_support_tickets,
        })
    }

    fn pagination(&self, default_size: u32) -> ReservationResult<PaginationParams> {
        let pagination = PaginationParams {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(default_size),
            sort_by: self.sort_by.as_deref().map(str::parse::<SortField>).transpose()?,
            sort_direction: self
                .sort_direction
                .as_deref()
                .map(str::parse::<SortOrder>)
                .transpose()?,
        };
        pagination.validate()?;
        Ok(pagination)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/reservations", get(list_reservations))
        .route("/admin/reservations/search", get(search_reservations))
        .route("/admin/reservations/export", get(export_reservations))
        .route(
            "/admin/reservations/{id}",
            get(get_reservation).put(update_reservation),
        )
        .route("/admin/reservations/{id}/cancel", post(cancel_reservation))
}

/// List items carry full wire records, so each summary is re-read in detail.
async fn page_response(
    state: &AppState,
    result: ListResult,
) -> Result<Json<BookingListResponseDto>, AppError> {
    let mut details: Vec<ReservationDetail> = Vec::with_capacity(result.items.len());
    for summary in &result.items {
        details.push(state.repository.get_by_id(&summary.id).await?);
    }
    Ok(Json(mapping::to_list_response(&details, &result.pagination)))
}

/// GET /admin/reservations
async fn list_reservations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookingListResponseDto>, AppError> {
    let mut params = query.into_params()?;
    params.size.get_or_insert(state.default_page_size);
    if params.size == Some(0) {
        return Err(ReservationError::Validation("page size must be greater than zero".into()).into());
    }

    let result = state.repository.list(&params).await?;
    tracing::debug!(
        page = result.pagination.page,
        items = result.items.len(),
        "Listed reservations"
    );
    page_response(&state, result).await
}

/// GET /admin/reservations/search
async fn search_reservations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<BookingListResponseDto>, AppError> {
    let filters = query.filters()?;
    let pagination = query.pagination(state.default_page_size)?;

    let result = state.repository.search(&filters, &pagination).await?;
    page_response(&state, result).await
}

/// GET /admin/reservations/export?format=CSV
async fn export_reservations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>()?,
        None => ExportFormat::Csv,
    };
    let filters = query.filters()?;

    let file = state.repository.export(&filters, format).await?;
    tracing::info!(format = format.as_str(), bytes = file.bytes.len(), "Exported reservations");
    Ok(([(header::CONTENT_TYPE, file.content_type)], file.bytes))
}

/// GET /admin/reservations/{id}
async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingDto>, AppError> {
    let detail = state.repository.get_by_id(&ReservationId::new(id)).await?;
    Ok(Json(mapping::to_dto(&detail)))
}

/// PUT /admin/reservations/{id}
async fn update_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BookingPatchDto>,
) -> Result<Json<BookingDto>, AppError> {
    let changes = mapping::changes_from_patch(&patch)?;
    let detail = state
        .repository
        .update(&ReservationId::new(id), &changes)
        .await?;
    Ok(Json(mapping::to_dto(&detail)))
}

/// POST /admin/reservations/{id}/cancel
async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingDto>, AppError> {
    let detail = state.repository.cancel(&ReservationId::new(id)).await?;
    Ok(Json(mapping::to_dto(&detail)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_filters() {
        let query = SearchQuery {
            product_types: vec!["flight".into(), "HOTEL".into()],
            statuses: vec!["CANCELLED".into()],
            priority: vec!["urgent".into()],
            search_term: Some("  ".into()),
            start_date: Some("2025-08-01T00:00:00Z".into()),
            end_date: Some("2025-09-01T00:00:00Z".into()),
            ..SearchQuery::default()
        };
        let filters = query.filters().unwrap();

        assert_eq!(filters.product_types, vec![ProductType::Flight, ProductType::Hotel]);
        assert_eq!(filters.statuses, vec![ReservationStatus::Cancelled]);
        assert_eq!(filters.priorities, vec![Priority::Urgent]);
        assert!(filters.search_term.is_none());
        assert!(filters.date_range.is_some());
    }

    #[test]
    fn test_search_query_rejects_half_open_range() {
        let query = SearchQuery {
            start_date: Some("2025-08-01T00:00:00Z".into()),
            ..SearchQuery::default()
        };
        assert!(matches!(query.filters(), Err(ReservationError::Validation(_))));
    }

    #[test]
    fn test_search_query_pagination() {
        let query = SearchQuery {
            page: Some(2),
            sort_by: Some("totalAmount".into()),
            sort_direction: Some("desc".into()),
            ..SearchQuery::default()
        };
        let pagination = query.pagination(20).unwrap();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.size, 20);
        assert_eq!(pagination.sort_by, Some(SortField::TotalAmount));

        let zero = SearchQuery {
            size: Some(0),
            ..SearchQuery::default()
        };
        assert!(zero.pagination(20).is_err());
    }
}
