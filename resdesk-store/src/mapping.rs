//! Translation between wire records and the reservation domain model.
//!
//! Every function here is pure: the same record always maps to the same value.
//! Product type, reservation status and payment status must match a case table
//! exactly (ignoring case); priority and the other non-critical enums fall back
//! to their defaults.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use resdesk_core::query::{ListResult, PageInfo};
use resdesk_core::reservation::{
    AuditAuthor, AuditEvent, Buyer, CancellationInfo, Gender, InternalComment, Marketplace,
    NotificationSettings, PaymentMethod, PaymentStatus, PaymentTransaction, Pricing, Priority,
    Product, ProductType, RefundStatus, ReservationChanges, ReservationDetail, ReservationId,
    ReservationMetadata, ReservationStatus, ReservationSummary, SourceChannel, StatusActor,
    StatusChange, SupportTicket, Traveler,
};
use resdesk_core::{ReservationError, ReservationResult};

use crate::dto::{
    AuditAuthorDto, BookingAuditEventDto, BookingDto, BookingListResponseDto, BookingPatchDto,
    BookingProductDto, BuyerDto, CancellationDto, InternalCommentDto, MarketplaceDto, MetadataDto,
    NotificationsDto, PaginationDto, PaymentTransactionDto, PricingDto, StatusAuthorDto,
    StatusHistoryDto, SupportTicketDto, TravelerDto,
};

// ============================================================================
// Wire → domain
// ============================================================================

pub fn to_list_result(dto: &BookingListResponseDto) -> ReservationResult<ListResult> {
    let PaginationDto {
        page,
        page_size,
        total_items,
        ..
    } = dto.pagination;

    if page_size == 0 {
        return Err(ReservationError::Validation(
            "list response has a page size of zero".to_string(),
        ));
    }
    if dto.items.len() > page_size as usize {
        return Err(ReservationError::Validation(format!(
            "list response holds {} items for a page size of {}",
            dto.items.len(),
            page_size
        )));
    }

    let items = dto
        .items
        .iter()
        .map(to_summary)
        .collect::<ReservationResult<Vec<_>>>()?;

    Ok(ListResult {
        items,
        // total_pages is derived, never trusted from the echo
        pagination: PageInfo::new(page, page_size, total_items),
    })
}

pub fn to_summary(dto: &BookingDto) -> ReservationResult<ReservationSummary> {
    let pricing = map_pricing(&dto.pricing)?;

    Ok(ReservationSummary {
        id: ReservationId::new(dto.id.clone()),
        pnr: dto.pnr.clone(),
        product_type: map_product_type(&dto.product.product_type)?,
        customer_name: dto.buyer.name.clone(),
        customer_email: dto.buyer.email.clone(),
        status: map_reservation_status("status", &dto.status)?,
        payment_status: map_payment_status(&dto.payment_status)?,
        created_at: parse_timestamp("createdAt", &dto.created_at)?,
        updated_at: parse_timestamp("updatedAt", &dto.updated_at)?,
        expires_at: parse_optional_timestamp("expiresAt", dto.expires_at.as_deref())?,
        total_amount: pricing.total_amount,
        currency: pricing.currency,
        marketplace: Marketplace {
            id: dto.marketplace.id.clone(),
            name: dto.marketplace.name.clone(),
            agency: dto.marketplace.agency.clone(),
        },
        priority: map_priority(dto.priority.as_deref()),
        tags: dto.tags.clone().unwrap_or_default(),
    })
}

pub fn to_detail(dto: &BookingDto) -> ReservationResult<ReservationDetail> {
    let summary = to_summary(dto)?;

    Ok(ReservationDetail {
        external_reference: dto.external_reference.clone(),
        buyer: map_buyer(&dto.buyer),
        travelers: map_all(&dto.travelers, map_traveler)?,
        product: map_product(&dto.product)?,
        pricing: map_pricing(&dto.pricing)?,
        payments: map_all(&dto.payments, map_payment_transaction)?,
        metadata: map_metadata(&dto.metadata),
        internal_comments: map_all(&dto.internal_comments, map_internal_comment)?,
        support_tickets: map_all(&dto.support_tickets, map_support_ticket)?,
        audit_events: map_all(&dto.audit_events, map_audit_event)?,
        status_history: map_all(&dto.status_history, map_status_history)?,
        notifications: NotificationSettings {
            email: dto.notifications.email,
            sms: dto.notifications.sms,
            push: dto.notifications.push,
        },
        special_requests: dto.special_requests.clone().unwrap_or_default(),
        parent_reservation_id: dto.parent_booking_id.clone().map(ReservationId::new),
        child_reservation_ids: dto
            .child_booking_ids
            .iter()
            .flatten()
            .cloned()
            .map(ReservationId::new)
            .collect(),
        cancellation: dto.cancellation.as_ref().map(map_cancellation).transpose()?,
        summary,
    })
}

/// Decode an inbound update body (server side of `from_domain`).
pub fn changes_from_patch(dto: &BookingPatchDto) -> ReservationResult<ReservationChanges> {
    Ok(ReservationChanges {
        status: dto
            .status
            .as_deref()
            .map(|s| map_reservation_status("status", s))
            .transpose()?,
        payment_status: dto.payment_status.as_deref().map(map_payment_status).transpose()?,
        priority: dto.priority.as_deref().map(|p| map_priority(Some(p))),
        tags: dto.tags.clone(),
        buyer: dto.buyer.as_ref().map(map_buyer),
        notifications: dto.notifications.map(|n| NotificationSettings {
            email: n.email,
            sms: n.sms,
            push: n.push,
        }),
        special_requests: dto.special_requests.clone(),
    })
}

fn map_all<T, U>(
    items: &[T],
    f: impl Fn(&T) -> ReservationResult<U>,
) -> ReservationResult<Vec<U>> {
    items.iter().map(f).collect()
}

fn map_product_type(raw: &str) -> ReservationResult<ProductType> {
    match raw.to_ascii_lowercase().as_str() {
        "local_offer" => Ok(ProductType::LocalOffer),
        "flight" => Ok(ProductType::Flight),
        "hotel" => Ok(ProductType::Hotel),
        _ => Err(ReservationError::unknown_enum("product.type", raw)),
    }
}

fn map_reservation_status(field: &'static str, raw: &str) -> ReservationResult<ReservationStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Ok(ReservationStatus::Pending),
        "confirmed" => Ok(ReservationStatus::Confirmed),
        "cancelled" => Ok(ReservationStatus::Cancelled),
        "completed" => Ok(ReservationStatus::Completed),
        "expired" => Ok(ReservationStatus::Expired),
        _ => Err(ReservationError::unknown_enum(field, raw)),
    }
}

fn map_payment_status(raw: &str) -> ReservationResult<PaymentStatus> {
    match raw.to_ascii_uppercase().as_str() {
        "PAYMENT_PENDING" => Ok(PaymentStatus::Pending),
        "PAYMENT_COMPLETED" => Ok(PaymentStatus::Completed),
        "PAYMENT_FAILED" => Ok(PaymentStatus::Failed),
        "REFUNDED" => Ok(PaymentStatus::Refunded),
        _ => Err(ReservationError::unknown_enum("paymentStatus", raw)),
    }
}

/// Absent or unrecognised priorities read as NORMAL.
fn map_priority(raw: Option<&str>) -> Priority {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        Some("urgent") => Priority::Urgent,
        _ => Priority::Normal,
    }
}

fn map_gender(raw: &str) -> Gender {
    match raw.to_ascii_lowercase().as_str() {
        "male" => Gender::Male,
        "female" => Gender::Female,
        _ => Gender::Other,
    }
}

fn map_payment_method(raw: &str) -> PaymentMethod {
    match raw.to_ascii_lowercase().as_str() {
        "bank_transfer" => PaymentMethod::BankTransfer,
        "credit_card" => PaymentMethod::CreditCard,
        "debit_card" => PaymentMethod::DebitCard,
        _ => PaymentMethod::DigitalWallet,
    }
}

fn map_source(raw: Option<&str>) -> SourceChannel {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("mobile") => SourceChannel::Mobile,
        Some("api") => SourceChannel::Api,
        Some("call_center") => SourceChannel::CallCenter,
        _ => SourceChannel::Web,
    }
}

fn map_refund_status(raw: &str) -> Option<RefundStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Some(RefundStatus::Pending),
        "processed" => Some(RefundStatus::Processed),
        "rejected" => Some(RefundStatus::Rejected),
        _ => None,
    }
}

fn parse_timestamp(field: &'static str, raw: &str) -> ReservationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| ReservationError::malformed_timestamp(field, raw))
}

fn parse_optional_timestamp(
    field: &'static str,
    raw: Option<&str>,
) -> ReservationResult<Option<DateTime<Utc>>> {
    raw.map(|value| parse_timestamp(field, value)).transpose()
}

/// Accepts `1990-01-01` as well as a full RFC 3339 instant.
fn parse_birth_date(raw: &str) -> ReservationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| parse_timestamp("travelers.dateOfBirth", raw).map(|dt| dt.date_naive()))
        .map_err(|_| ReservationError::malformed_timestamp("travelers.dateOfBirth", raw))
}

fn map_buyer(dto: &BuyerDto) -> Buyer {
    Buyer {
        name: dto.name.clone(),
        email: dto.email.clone(),
        phone: dto.phone.clone(),
        document: dto.document.clone(),
        document_type: dto.document_type.clone(),
    }
}

fn map_traveler(dto: &TravelerDto) -> ReservationResult<Traveler> {
    Ok(Traveler {
        name: dto.name.clone(),
        email: dto.email.clone(),
        document: dto.document.clone(),
        document_type: dto.document_type.clone(),
        date_of_birth: parse_birth_date(&dto.date_of_birth)?,
        gender: map_gender(&dto.gender),
        traveler_type: dto.traveler_type.clone(),
        is_main_traveler: dto.is_main_traveler,
    })
}

fn map_product(dto: &BookingProductDto) -> ReservationResult<Product> {
    Ok(Product {
        product_type: map_product_type(&dto.product_type)?,
        name: dto.name.clone(),
        provider: dto.provider.clone(),
        provider_reference: dto.provider_reference.clone(),
        details: dto.details.clone(),
    })
}

fn map_pricing(dto: &PricingDto) -> ReservationResult<Pricing> {
    let pricing = Pricing {
        base_amount: dto.base_amount,
        taxes: dto.taxes,
        fees: dto.fees,
        discounts: dto.discounts,
        total_amount: dto.total_amount,
        currency: dto.currency.clone(),
        exchange_rate: dto.exchange_rate,
        original_currency: dto.original_currency.clone(),
    };
    if !pricing.is_balanced() {
        return Err(ReservationError::PricingMismatch {
            expected: pricing.computed_total(),
            actual: pricing.total_amount,
        });
    }
    Ok(pricing)
}

fn map_payment_transaction(dto: &PaymentTransactionDto) -> ReservationResult<PaymentTransaction> {
    Ok(PaymentTransaction {
        id: dto.id.clone(),
        provider: dto.provider.clone(),
        transaction_id: dto.transaction_id.clone(),
        amount: dto.amount,
        currency: dto.currency.clone(),
        status: dto.status.clone(),
        method: map_payment_method(&dto.method),
        processed_at: parse_timestamp("payments.processedAt", &dto.processed_at)?,
    })
}

fn map_metadata(dto: &MetadataDto) -> ReservationMetadata {
    ReservationMetadata {
        source: map_source(dto.source.as_deref()),
        user_agent: dto.user_agent.clone(),
        ip_address: dto.ip_address.clone(),
        session_id: dto.session_id.clone(),
        search_id: dto.search_id.clone(),
        campaign_id: dto.campaign_id.clone(),
        affiliate_id: dto.affiliate_id.clone(),
    }
}

fn map_internal_comment(dto: &InternalCommentDto) -> ReservationResult<InternalComment> {
    Ok(InternalComment {
        id: dto.id.clone(),
        content: dto.content.clone(),
        author: dto.author.clone(),
        created_at: parse_timestamp("internalComments.createdAt", &dto.created_at)?,
    })
}

fn map_support_ticket(dto: &SupportTicketDto) -> ReservationResult<SupportTicket> {
    Ok(SupportTicket {
        id: dto.id.clone(),
        title: dto.title.clone(),
        status: dto.status.clone(),
        priority: map_priority(dto.priority.as_deref()),
        created_at: parse_timestamp("supportTickets.createdAt", &dto.created_at)?,
    })
}

fn map_audit_event(dto: &BookingAuditEventDto) -> ReservationResult<AuditEvent> {
    Ok(AuditEvent {
        id: dto.id.clone(),
        reservation_id: ReservationId::new(dto.booking_id.clone()),
        event_type: dto.event_type.clone(),
        timestamp: parse_timestamp("auditEvents.timestamp", &dto.timestamp)?,
        author: AuditAuthor {
            id: dto.author.id.clone(),
            name: dto.author.name.clone(),
            email: dto.author.email.clone(),
            author_type: dto.author.author_type.clone(),
        },
        description: dto.description.clone(),
        metadata: dto.metadata.clone(),
    })
}

fn map_status_history(dto: &StatusHistoryDto) -> ReservationResult<StatusChange> {
    Ok(StatusChange {
        id: dto.id.clone(),
        status: map_reservation_status("statusHistory.status", &dto.status)?,
        timestamp: parse_timestamp("statusHistory.timestamp", &dto.timestamp)?,
        reason: dto.reason.clone(),
        author: StatusActor {
            id: dto.author.id.clone(),
            name: dto.author.name.clone(),
            actor_type: dto.author.author_type.clone(),
        },
    })
}

fn map_cancellation(dto: &CancellationDto) -> ReservationResult<CancellationInfo> {
    Ok(CancellationInfo {
        requested_at: parse_timestamp("cancellation.requestedAt", &dto.requested_at)?,
        processed_at: parse_optional_timestamp(
            "cancellation.processedAt",
            dto.processed_at.as_deref(),
        )?,
        reason: dto.reason.clone(),
        refund_amount: dto.refund_amount,
        refund_status: dto.refund_status.as_deref().and_then(map_refund_status),
        cancellation_fee: dto.cancellation_fee,
    })
}

// ============================================================================
// Domain → wire
// ============================================================================

/// Outbound update payload; only the fields present in `changes` are sent.
pub fn from_domain(changes: &ReservationChanges) -> BookingPatchDto {
    BookingPatchDto {
        status: changes.status.map(|s| reservation_status_to_wire(s).to_string()),
        payment_status: changes
            .payment_status
            .map(|s| payment_status_to_wire(s).to_string()),
        priority: changes.priority.map(|p| priority_to_wire(p).to_string()),
        tags: changes.tags.clone(),
        buyer: changes.buyer.as_ref().map(buyer_to_dto),
        notifications: changes.notifications.map(notifications_to_dto),
        special_requests: changes.special_requests.clone(),
    }
}

/// Full reverse mapping, used when serving reservations in the wire format.
pub fn to_dto(detail: &ReservationDetail) -> BookingDto {
    let summary = &detail.summary;

    BookingDto {
        id: summary.id.to_string(),
        pnr: summary.pnr.clone(),
        external_reference: detail.external_reference.clone(),
        created_at: format_timestamp(&summary.created_at),
        updated_at: format_timestamp(&summary.updated_at),
        expires_at: summary.expires_at.as_ref().map(format_timestamp),
        buyer: buyer_to_dto(&detail.buyer),
        travelers: detail
            .travelers
            .iter()
            .map(|t| TravelerDto {
                name: t.name.clone(),
                email: t.email.clone(),
                document: t.document.clone(),
                document_type: t.document_type.clone(),
                date_of_birth: t.date_of_birth.format("%Y-%m-%d").to_string(),
                gender: gender_to_wire(t.gender).to_string(),
                traveler_type: t.traveler_type.clone(),
                is_main_traveler: t.is_main_traveler,
            })
            .collect(),
        product: BookingProductDto {
            product_type: product_type_to_wire(detail.product.product_type).to_string(),
            name: detail.product.name.clone(),
            provider: detail.product.provider.clone(),
            provider_reference: detail.product.provider_reference.clone(),
            details: detail.product.details.clone(),
        },
        status: reservation_status_to_wire(summary.status).to_string(),
        payment_status: payment_status_to_wire(summary.payment_status).to_string(),
        marketplace: MarketplaceDto {
            id: summary.marketplace.id.clone(),
            name: summary.marketplace.name.clone(),
            agency: summary.marketplace.agency.clone(),
        },
        pricing: PricingDto {
            base_amount: detail.pricing.base_amount,
            taxes: detail.pricing.taxes,
            fees: detail.pricing.fees,
            discounts: detail.pricing.discounts,
            total_amount: detail.pricing.total_amount,
            currency: detail.pricing.currency.clone(),
            exchange_rate: detail.pricing.exchange_rate,
            original_currency: detail.pricing.original_currency.clone(),
        },
        payments: detail
            .payments
            .iter()
            .map(|p| PaymentTransactionDto {
                id: p.id.clone(),
                provider: p.provider.clone(),
                transaction_id: p.transaction_id.clone(),
                amount: p.amount,
                currency: p.currency.clone(),
                status: p.status.clone(),
                method: payment_method_to_wire(p.method).to_string(),
                processed_at: format_timestamp(&p.processed_at),
            })
            .collect(),
        metadata: MetadataDto {
            source: Some(source_to_wire(detail.metadata.source).to_string()),
            user_agent: detail.metadata.user_agent.clone(),
            ip_address: detail.metadata.ip_address.clone(),
            session_id: detail.metadata.session_id.clone(),
            search_id: detail.metadata.search_id.clone(),
            campaign_id: detail.metadata.campaign_id.clone(),
            affiliate_id: detail.metadata.affiliate_id.clone(),
        },
        internal_comments: detail
            .internal_comments
            .iter()
            .map(|c| InternalCommentDto {
                id: c.id.clone(),
                content: c.content.clone(),
                author: c.author.clone(),
                created_at: format_timestamp(&c.created_at),
            })
            .collect(),
        support_tickets: detail
            .support_tickets
            .iter()
            .map(|t| SupportTicketDto {
                id: t.id.clone(),
                title: t.title.clone(),
                status: t.status.clone(),
                priority: Some(priority_to_wire(t.priority).to_string()),
                created_at: format_timestamp(&t.created_at),
            })
            .collect(),
        audit_events: detail
            .audit_events
            .iter()
            .map(|e| BookingAuditEventDto {
                id: e.id.clone(),
                booking_id: e.reservation_id.to_string(),
                event_type: e.event_type.clone(),
                timestamp: format_timestamp(&e.timestamp),
                author: AuditAuthorDto {
                    id: e.author.id.clone(),
                    name: e.author.name.clone(),
                    email: e.author.email.clone(),
                    author_type: e.author.author_type.clone(),
                },
                description: e.description.clone(),
                metadata: e.metadata.clone(),
            })
            .collect(),
        status_history: detail
            .status_history
            .iter()
            .map(|h| StatusHistoryDto {
                id: h.id.clone(),
                status: reservation_status_to_wire(h.status).to_string(),
                timestamp: format_timestamp(&h.timestamp),
                reason: h.reason.clone(),
                author: StatusAuthorDto {
                    id: h.author.id.clone(),
                    name: h.author.name.clone(),
                    author_type: h.author.actor_type.clone(),
                },
            })
            .collect(),
        notifications: notifications_to_dto(detail.notifications),
        special_requests: Some(detail.special_requests.clone()),
        tags: Some(summary.tags.clone()),
        priority: Some(priority_to_wire(summary.priority).to_string()),
        parent_booking_id: detail.parent_reservation_id.as_ref().map(ToString::to_string),
        child_booking_ids: Some(
            detail
                .child_reservation_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
        ),
        cancellation: detail.cancellation.as_ref().map(|c| CancellationDto {
            requested_at: format_timestamp(&c.requested_at),
            processed_at: c.processed_at.as_ref().map(format_timestamp),
            reason: c.reason.clone(),
            refund_amount: c.refund_amount,
            refund_status: c.refund_status.map(|s| refund_status_to_wire(s).to_string()),
            cancellation_fee: c.cancellation_fee,
        }),
    }
}

/// Wraps a page of reservations in the list envelope.
pub fn to_list_response(page: &[ReservationDetail], pagination: &PageInfo) -> BookingListResponseDto {
    BookingListResponseDto {
        items: page.iter().map(to_dto).collect(),
        pagination: PaginationDto {
            page: pagination.page,
            page_size: pagination.size,
            total_items: pagination.total_items,
            total_pages: pagination.total_pages,
        },
        filters: None,
    }
}

pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn buyer_to_dto(buyer: &Buyer) -> BuyerDto {
    BuyerDto {
        name: buyer.name.clone(),
        email: buyer.email.clone(),
        phone: buyer.phone.clone(),
        document: buyer.document.clone(),
        document_type: buyer.document_type.clone(),
    }
}

fn notifications_to_dto(settings: NotificationSettings) -> NotificationsDto {
    NotificationsDto {
        email: settings.email,
        sms: settings.sms,
        push: settings.push,
    }
}

fn product_type_to_wire(product_type: ProductType) -> &'static str {
    match product_type {
        ProductType::LocalOffer => "local_offer",
        ProductType::Flight => "flight",
        ProductType::Hotel => "hotel",
    }
}

pub(crate) fn reservation_status_to_wire(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Pending => "pending",
        ReservationStatus::Confirmed => "confirmed",
        ReservationStatus::Cancelled => "cancelled",
        ReservationStatus::Completed => "completed",
        ReservationStatus::Expired => "expired",
    }
}

fn payment_status_to_wire(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PAYMENT_PENDING",
        PaymentStatus::Completed => "PAYMENT_COMPLETED",
        PaymentStatus::Failed => "PAYMENT_FAILED",
        PaymentStatus::Refunded => "REFUNDED",
    }
}

fn priority_to_wire(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Normal => "normal",
        Priority::High => "high",
        Priority::Urgent => "urgent",
    }
}

fn gender_to_wire(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "other",
    }
}

fn payment_method_to_wire(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::BankTransfer => "bank_transfer",
        PaymentMethod::CreditCard => "credit_card",
        PaymentMethod::DebitCard => "debit_card",
        PaymentMethod::DigitalWallet => "digital_wallet",
    }
}

fn source_to_wire(source: SourceChannel) -> &'static str {
    match source {
        SourceChannel::Web => "web",
        SourceChannel::Mobile => "mobile",
        SourceChannel::Api => "api",
        SourceChannel::CallCenter => "call_center",
    }
}

fn refund_status_to_wire(status: RefundStatus) -> &'static str {
    match status {
        RefundStatus::Pending => "pending",
        RefundStatus::Processed => "processed",
        RefundStatus::Rejected => "rejected",
    }
}
