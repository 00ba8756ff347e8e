pub mod query;
pub mod repository;
pub mod reservation;

pub use query::{
    DateRange, ExportFile, ExportFormat, ListParams, ListResult, PageInfo, PaginationParams,
    ReservationFilters, ReservationQuery, SortField, SortOrder, DEFAULT_PAGE_SIZE,
};
pub use repository::ReservationRepository;
pub use reservation::{
    Buyer, Marketplace, PaymentStatus, Priority, ProductType, ReservationChanges,
    ReservationDetail, ReservationId, ReservationStatus, ReservationSummary,
};

/// Failure taxonomy shared by the mapping layer, repositories and the state store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReservationError {
    #[error("Reservation not found: {0}")]
    NotFound(String),
    #[error("Unknown {field} value: {value:?}")]
    UnknownEnumValue { field: &'static str, value: String },
    #[error("Malformed timestamp in {field}: {value:?}")]
    MalformedTimestamp { field: &'static str, value: String },
    #[error("Pricing does not balance: components sum to {expected}, total is {actual}")]
    PricingMismatch { expected: f64, actual: f64 },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ReservationError {
    pub fn unknown_enum(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownEnumValue {
            field,
            value: value.into(),
        }
    }

    pub fn malformed_timestamp(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedTimestamp {
            field,
            value: value.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UnknownEnumValue { .. } => "UNKNOWN_ENUM_VALUE",
            Self::MalformedTimestamp { .. } => "MALFORMED_TIMESTAMP",
            Self::PricingMismatch { .. } => "PRICING_MISMATCH",
            Self::Validation(_) => "VALIDATION",
            Self::Transport(_) => "TRANSPORT",
        }
    }

    /// Errors raised while translating wire records
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownEnumValue { .. } | Self::MalformedTimestamp { .. } | Self::PricingMismatch { .. }
        )
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
