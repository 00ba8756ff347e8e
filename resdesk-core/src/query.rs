use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::reservation::{
    PaymentStatus, Priority, ProductType, ReservationDetail, ReservationStatus, ReservationSummary,
};
use crate::{ReservationError, ReservationResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ReservationError::unknown_enum("sortOrder", s)),
        }
    }
}

/// Summary fields a list can be ordered by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Pnr,
    ProductType,
    CustomerName,
    CustomerEmail,
    Status,
    PaymentStatus,
    CreatedAt,
    UpdatedAt,
    ExpiresAt,
    TotalAmount,
    Priority,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Pnr => "pnr",
            SortField::ProductType => "productType",
            SortField::CustomerName => "customerName",
            SortField::CustomerEmail => "customerEmail",
            SortField::Status => "status",
            SortField::PaymentStatus => "paymentStatus",
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::ExpiresAt => "expiresAt",
            SortField::TotalAmount => "totalAmount",
            SortField::Priority => "priority",
        }
    }

    /// Ascending comparison of two summaries on this field.
    pub fn compare(&self, a: &ReservationSummary, b: &ReservationSummary) -> Ordering {
        match self {
            SortField::Pnr => a.pnr.cmp(&b.pnr),
            SortField::ProductType => a.product_type.cmp(&b.product_type),
            SortField::CustomerName => a
                .customer_name
                .to_lowercase()
                .cmp(&b.customer_name.to_lowercase()),
            SortField::CustomerEmail => a
                .customer_email
                .to_lowercase()
                .cmp(&b.customer_email.to_lowercase()),
            SortField::Status => a.status.cmp(&b.status),
            SortField::PaymentStatus => a.payment_status.cmp(&b.payment_status),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::ExpiresAt => a.expires_at.cmp(&b.expires_at),
            SortField::TotalAmount => a.total_amount.total_cmp(&b.total_amount),
            SortField::Priority => a.priority.cmp(&b.priority),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "pnr" => SortField::Pnr,
            "productType" => SortField::ProductType,
            "customerName" => SortField::CustomerName,
            "customerEmail" => SortField::CustomerEmail,
            "status" => SortField::Status,
            "paymentStatus" => SortField::PaymentStatus,
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            "expiresAt" => SortField::ExpiresAt,
            "totalAmount" => SortField::TotalAmount,
            "priority" => SortField::Priority,
            _ => return Err(ReservationError::unknown_enum("sortField", s)),
        };
        Ok(field)
    }
}

/// Simple list request; omitted page/size fall back to `0` / [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub search_term: Option<String>,
    pub sort_field: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

impl ListParams {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Resolve defaults into a full query.
    pub fn into_query(self, default_size: u32) -> ReservationQuery {
        ReservationQuery {
            filters: ReservationFilters {
                search_term: self.search_term.filter(|term| !term.trim().is_empty()),
                ..ReservationFilters::default()
            },
            pagination: PaginationParams {
                page: self.page.unwrap_or(0),
                size: self.size.unwrap_or(default_size),
                sort_by: self.sort_field,
                sort_direction: self.sort_order,
            },
        }
    }
}

/// Inclusive creation-time window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

/// Advanced filters; empty vectors and `None` mean "no constraint".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReservationFilters {
    pub date_range: Option<DateRange>,
    pub product_types: Vec<ProductType>,
    pub statuses: Vec<ReservationStatus>,
    pub payment_statuses: Vec<PaymentStatus>,
    pub marketplaces: Vec<String>,
    pub search_term: Option<String>,
    pub priorities: Vec<Priority>,
    pub has_comments: Option<bool>,
    pub has_support_tickets: Option<bool>,
}

impl ReservationFilters {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, detail: &ReservationDetail) -> bool {
        let summary = &detail.summary;

        if let Some(range) = &self.date_range {
            if !range.contains(&summary.created_at) {
                return false;
            }
        }
        if !self.product_types.is_empty() && !self.product_types.contains(&summary.product_type) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&summary.status) {
            return false;
        }
        if !self.payment_statuses.is_empty()
            && !self.payment_statuses.contains(&summary.payment_status)
        {
            return false;
        }
        // Marketplaces match on id or display name
        if !self.marketplaces.is_empty()
            && !self
                .marketplaces
                .iter()
                .any(|m| *m == summary.marketplace.id || *m == summary.marketplace.name)
        {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&summary.priority) {
            return false;
        }
        if let Some(has_comments) = self.has_comments {
            if detail.internal_comments.is_empty() == has_comments {
                return false;
            }
        }
        if let Some(has_tickets) = self.has_support_tickets {
            if detail.support_tickets.is_empty() == has_tickets {
                return false;
            }
        }
        match self.search_term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => matches_term(summary, term),
            _ => true,
        }
    }
}

fn matches_term(summary: &ReservationSummary, term: &str) -> bool {
    let needle = term.to_lowercase();
    [&summary.customer_name, &summary.customer_email, &summary.pnr]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: u32,
    pub size: u32,
    pub sort_by: Option<SortField>,
    pub sort_direction: Option<SortOrder>,
}

impl PaginationParams {
    pub fn new(page: u32, size: u32) -> ReservationResult<Self> {
        let params = Self {
            page,
            size,
            sort_by: None,
            sort_direction: None,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn sorted(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_direction = Some(order);
        self
    }

    pub fn validate(&self) -> ReservationResult<()> {
        if self.size == 0 {
            return Err(ReservationError::Validation(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn offset(&self) -> usize {
        self.page as usize * self.size as usize
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_direction: None,
        }
    }
}

/// Filters plus pagination: the one query shape every list load is reduced to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReservationQuery {
    pub filters: ReservationFilters,
    pub pagination: PaginationParams,
}

impl ReservationQuery {
    pub fn new(filters: ReservationFilters, pagination: PaginationParams) -> Self {
        Self { filters, pagination }
    }

    /// The simple-list form of this query, when it uses nothing beyond a search term.
    pub fn as_list_params(&self) -> Option<ListParams> {
        let advanced = ReservationFilters {
            search_term: None,
            ..self.filters.clone()
        };
        if advanced != ReservationFilters::default() {
            return None;
        }
        Some(ListParams {
            page: Some(self.pagination.page),
            size: Some(self.pagination.size),
            search_term: self.filters.search_term.clone(),
            sort_field: self.pagination.sort_by,
            sort_order: self.pagination.sort_direction,
        })
    }

    /// Filter, sort and slice `details` into the requested page.
    ///
    /// Unsorted queries keep source order; sorting is stable.
    pub fn apply<'a, I>(&self, details: I) -> ReservationResult<ListResult>
    where
        I: IntoIterator<Item = &'a ReservationDetail>,
    {
        self.pagination.validate()?;

        let mut matching: Vec<ReservationSummary> = details
            .into_iter()
            .filter(|detail| self.filters.matches(detail))
            .map(ReservationDetail::to_summary)
            .collect();

        if let Some(field) = self.pagination.sort_by {
            let order = self.pagination.sort_direction.unwrap_or_default();
            matching.sort_by(|a, b| {
                let ordering = field.compare(a, b);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let total_items = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(self.pagination.offset())
            .take(self.pagination.size as usize)
            .collect();

        Ok(ListResult {
            items,
            pagination: PageInfo::new(self.pagination.page, self.pagination.size, total_items),
        })
    }
}

/// Pagination echo of a list response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PageInfo {
    /// `total_pages = ceil(total_items / size)`; a zero size yields zero pages.
    pub fn new(page: u32, size: u32, total_items: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_items.div_ceil(size as u64)
        };
        Self {
            page,
            size,
            total_items,
            total_pages,
        }
    }
}

impl Default for PageInfo {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE, 0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListResult {
    pub items: Vec<ReservationSummary>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Pdf => "PDF",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CSV" => Ok(ExportFormat::Csv),
            "EXCEL" => Ok(ExportFormat::Excel),
            "PDF" => Ok(ExportFormat::Pdf),
            _ => Err(ReservationError::unknown_enum("format", s)),
        }
    }
}

/// Opaque export payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_total_pages() {
        assert_eq!(PageInfo::new(0, 20, 5).total_pages, 1);
        assert_eq!(PageInfo::new(0, 20, 0).total_pages, 0);
        assert_eq!(PageInfo::new(0, 20, 40).total_pages, 2);
        assert_eq!(PageInfo::new(0, 20, 41).total_pages, 3);
        assert_eq!(PageInfo::new(0, 0, 41).total_pages, 0);
    }

    #[test]
    fn test_list_params_defaults() {
        let query = ListParams::default().into_query(DEFAULT_PAGE_SIZE);
        assert_eq!(query.pagination.page, 0);
        assert_eq!(query.pagination.size, 20);
        assert!(query.filters.search_term.is_none());

        let blank = ListParams {
            search_term: Some("   ".to_string()),
            ..ListParams::default()
        };
        assert!(blank.into_query(10).filters.search_term.is_none());
    }

    #[test]
    fn test_pagination_rejects_zero_size() {
        assert!(PaginationParams::new(0, 0).is_err());
        assert!(PaginationParams::new(3, 1).is_ok());
    }

    #[test]
    fn test_sort_field_parsing() {
        assert_eq!("createdAt".parse::<SortField>().unwrap(), SortField::CreatedAt);
        assert_eq!(SortField::TotalAmount.as_str(), "totalAmount");
        assert!("created_at".parse::<SortField>().is_err());
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    }

    #[test]
    fn test_as_list_params() {
        let mut query = ReservationQuery::new(
            ReservationFilters::search("perez"),
            PaginationParams::new(1, 10).unwrap(),
        );
        let params = query.as_list_params().unwrap();
        assert_eq!(params.page, Some(1));
        assert_eq!(params.size, Some(10));
        assert_eq!(params.search_term.as_deref(), Some("perez"));

        query.filters.statuses = vec![ReservationStatus::Pending];
        assert!(query.as_list_params().is_none());
    }

    #[test]
    fn test_export_format() {
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!(ExportFormat::Csv.content_type(), "text/csv");
        assert!("DOCX".parse::<ExportFormat>().is_err());
    }
}
