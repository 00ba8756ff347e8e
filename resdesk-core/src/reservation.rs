use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ReservationError;

/// Domain wire names (`"LOCAL_OFFER"`, `"CONFIRMED"`, ...) used in query strings.
macro_rules! domain_names {
    ($name:ident, $field:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ReservationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ReservationError::unknown_enum($field, s)),
                }
            }
        }
    };
}

/// Stable identifier of a reservation; the only key used for storage and equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ReservationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    LocalOffer,
    Flight,
    Hotel,
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Operational priority; declaration order is the sort order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    BankTransfer,
    CreditCard,
    DebitCard,
    #[default]
    DigitalWallet,
}

/// Channel the reservation was placed through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceChannel {
    #[default]
    Web,
    Mobile,
    Api,
    CallCenter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Processed,
    Rejected,
}

/// Commercial channel/agency a reservation was sold under
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Marketplace {
    pub id: String,
    pub name: String,
    pub agency: String,
}

/// List-view projection of a reservation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationSummary {
    pub id: ReservationId,
    pub pnr: String,
    pub product_type: ProductType,
    pub customer_name: String,
    pub customer_email: String,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub currency: String,
    pub marketplace: Marketplace,
    pub priority: Priority,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Buyer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: String,
    pub document_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Traveler {
    pub name: String,
    pub email: String,
    pub document: String,
    pub document_type: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub traveler_type: String,
    pub is_main_traveler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_type: ProductType,
    pub name: String,
    pub provider: String,
    pub provider_reference: String,
    /// Product-specific attributes (flight legs, hotel room, offer terms)
    pub details: serde_json::Value,
}

/// Amount breakdown; see [`Pricing::is_balanced`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pricing {
    pub base_amount: f64,
    pub taxes: f64,
    pub fees: f64,
    pub discounts: f64,
    pub total_amount: f64,
    pub currency: String,
    pub exchange_rate: Option<f64>,
    pub original_currency: Option<String>,
}

impl Pricing {
    /// Amounts are compared to the cent.
    pub const TOLERANCE: f64 = 0.005;

    pub fn computed_total(&self) -> f64 {
        self.base_amount + self.taxes + self.fees - self.discounts
    }

    /// `base + taxes + fees - discounts == total`
    pub fn is_balanced(&self) -> bool {
        (self.computed_total() - self.total_amount).abs() < Self::TOLERANCE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentTransaction {
    pub id: String,
    pub provider: String,
    pub transaction_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub method: PaymentMethod,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReservationMetadata {
    pub source: SourceChannel,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub session_id: Option<String>,
    pub search_id: Option<String>,
    pub campaign_id: Option<String>,
    pub affiliate_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InternalComment {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupportTicket {
    pub id: String,
    pub title: String,
    pub status: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditAuthor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub author_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: String,
    pub reservation_id: ReservationId,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub author: AuditAuthor,
    pub description: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusActor {
    pub id: String,
    pub name: String,
    pub actor_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub id: String,
    pub status: ReservationStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    pub author: StatusActor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    pub email: bool,
    pub sms: bool,
    pub push: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancellationInfo {
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub refund_amount: Option<f64>,
    pub refund_status: Option<RefundStatus>,
    pub cancellation_fee: Option<f64>,
}

/// Full reservation as shown on the detail page.
///
/// `audit_events` and `status_history` are append-only and kept in
/// chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationDetail {
    pub summary: ReservationSummary,
    pub external_reference: Option<String>,
    pub buyer: Buyer,
    pub travelers: Vec<Traveler>,
    pub product: Product,
    pub pricing: Pricing,
    pub payments: Vec<PaymentTransaction>,
    pub metadata: ReservationMetadata,
    pub internal_comments: Vec<InternalComment>,
    pub support_tickets: Vec<SupportTicket>,
    pub audit_events: Vec<AuditEvent>,
    pub status_history: Vec<StatusChange>,
    pub notifications: NotificationSettings,
    pub special_requests: Vec<String>,
    pub parent_reservation_id: Option<ReservationId>,
    pub child_reservation_ids: Vec<ReservationId>,
    pub cancellation: Option<CancellationInfo>,
}

impl ReservationDetail {
    pub fn id(&self) -> &ReservationId {
        &self.summary.id
    }

    /// List projection of this detail
    pub fn to_summary(&self) -> ReservationSummary {
        self.summary.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.summary.status == ReservationStatus::Cancelled
    }
}

/// Partial changes sent with an update command. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReservationChanges {
    pub status: Option<ReservationStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub buyer: Option<Buyer>,
    pub notifications: Option<NotificationSettings>,
    pub special_requests: Option<Vec<String>>,
}

impl ReservationChanges {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

domain_names!(ProductType, "productType" {
    LocalOffer => "LOCAL_OFFER",
    Flight => "FLIGHT",
    Hotel => "HOTEL",
});

domain_names!(ReservationStatus, "status" {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
    Expired => "EXPIRED",
});

domain_names!(PaymentStatus, "paymentStatus" {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

domain_names!(Priority, "priority" {
    Low => "LOW",
    Normal => "NORMAL",
    High => "HIGH",
    Urgent => "URGENT",
});
