//! Deterministic reservations served by the in-memory repository.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;

use resdesk_core::reservation::{
    AuditAuthor, AuditEvent, Buyer, CancellationInfo, Gender, InternalComment, Marketplace,
    NotificationSettings, PaymentMethod, PaymentStatus, PaymentTransaction, Pricing, Priority,
    Product, ProductType, RefundStatus, ReservationDetail, ReservationId, ReservationMetadata,
    ReservationStatus, ReservationSummary, SourceChannel, StatusActor, StatusChange,
    SupportTicket, Traveler,
};

struct SeedRow {
    id: &'static str,
    pnr: &'static str,
    product_type: ProductType,
    product_name: &'static str,
    provider: &'static str,
    customer_name: &'static str,
    customer_email: &'static str,
    status: ReservationStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    base_amount: f64,
    taxes: f64,
    fees: f64,
    discounts: f64,
    marketplace: (&'static str, &'static str),
    priority: Priority,
    tags: &'static [&'static str],
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_default()
}

fn rows() -> Vec<SeedRow> {
    vec![
        SeedRow {
            id: "1",
            pnr: "LO GYMB 939L",
            product_type: ProductType::LocalOffer,
            product_name: "Cena para dos en El Gourmet",
            provider: "Restaurante El Gourmet",
            customer_name: "Juan Pérez",
            customer_email: "juan.perez@email.com",
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Completed,
            created_at: at(2025, 8, 31, 18, 48),
            base_amount: 540000.0,
            taxes: 102600.0,
            fees: 3400.0,
            discounts: 0.0,
            marketplace: ("mp1", "BAC Honduras"),
            priority: Priority::Normal,
            tags: &["oferta-local"],
        },
        SeedRow {
            id: "2",
            pnr: "LO E2UF IT42",
            product_type: ProductType::LocalOffer,
            product_name: "Día de spa",
            provider: "Spa Serena",
            customer_name: "María García",
            customer_email: "maria.garcia@email.com",
            status: ReservationStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            created_at: at(2025, 8, 30, 3, 11),
            base_amount: 570000.0,
            taxes: 108300.0,
            fees: 5700.0,
            discounts: 0.0,
            marketplace: ("mp2", "BAC Costa Rica"),
            priority: Priority::Normal,
            tags: &["oferta-local"],
        },
        SeedRow {
            id: "3",
            pnr: "LO YTHE HDE5",
            product_type: ProductType::LocalOffer,
            product_name: "Tour de café",
            provider: "Finca La Esperanza",
            customer_name: "Carlos López",
            customer_email: "carlos.lopez@email.com",
            status: ReservationStatus::Cancelled,
            payment_status: PaymentStatus::Refunded,
            created_at: at(2025, 8, 28, 17, 5),
            base_amount: 400000.0,
            taxes: 76000.0,
            fees: 0.0,
            discounts: 0.0,
            marketplace: ("mp3", "BAC Panamá"),
            priority: Priority::Low,
            tags: &["oferta-local"],
        },
        SeedRow {
            id: "4",
            pnr: "FL K8TR 22MX",
            product_type: ProductType::Flight,
            product_name: "BOG - MIA",
            provider: "Avianca",
            customer_name: "Ana Torres",
            customer_email: "ana.torres@email.com",
            status: ReservationStatus::Confirmed,
            payment_status: PaymentStatus::Completed,
            created_at: at(2025, 9, 2, 9, 30),
            base_amount: 1000.0,
            taxes: 190.0,
            fees: 60.0,
            discounts: 0.0,
            marketplace: ("mp1", "BAC Honduras"),
            priority: Priority::High,
            tags: &["vuelo", "vip"],
        },
        SeedRow {
            id: "5",
            pnr: "HT P0QZ 71LV",
            product_type: ProductType::Hotel,
            product_name: "Hotel Caribe, 3 noches",
            provider: "Hoteles Caribe",
            customer_name: "Sofía Ramírez",
            customer_email: "sofia.ramirez@email.com",
            status: ReservationStatus::Pending,
            payment_status: PaymentStatus::Failed,
            created_at: at(2025, 9, 3, 14, 0),
            base_amount: 800.0,
            taxes: 152.0,
            fees: 20.0,
            discounts: 72.0,
            marketplace: ("mp2", "BAC Costa Rica"),
            priority: Priority::Urgent,
            tags: &["hotel"],
        },
    ]
}

fn system_author() -> StatusActor {
    StatusActor {
        id: "system".to_string(),
        name: "System".to_string(),
        actor_type: "system".to_string(),
    }
}

fn build(row: SeedRow) -> ReservationDetail {
    let id = ReservationId::from(row.id);
    let pricing = Pricing {
        base_amount: row.base_amount,
        taxes: row.taxes,
        fees: row.fees,
        discounts: row.discounts,
        total_amount: row.base_amount + row.taxes + row.fees - row.discounts,
        currency: "USD".to_string(),
        exchange_rate: None,
        original_currency: None,
    };
    let buyer = Buyer {
        name: row.customer_name.to_string(),
        email: row.customer_email.to_string(),
        phone: "+57 300 123 4567".to_string(),
        document: format!("1234567{}", row.id),
        document_type: "CC".to_string(),
    };
    let paid_at = row.created_at + Duration::minutes(5);

    let mut status_history = vec![StatusChange {
        id: format!("status-{}-1", row.id),
        status: ReservationStatus::Pending,
        timestamp: row.created_at,
        reason: "Reservation created".to_string(),
        author: system_author(),
    }];
    if row.status != ReservationStatus::Pending {
        status_history.push(StatusChange {
            id: format!("status-{}-2", row.id),
            status: row.status,
            timestamp: paid_at,
            reason: match row.status {
                ReservationStatus::Cancelled => "Cancelled by customer".to_string(),
                _ => "Payment received".to_string(),
            },
            author: system_author(),
        });
    }
    let updated_at = status_history
        .last()
        .map(|change| change.timestamp)
        .unwrap_or(row.created_at);

    let cancellation = (row.status == ReservationStatus::Cancelled).then(|| CancellationInfo {
        requested_at: paid_at,
        processed_at: Some(paid_at),
        reason: "Cancelled by customer".to_string(),
        refund_amount: Some(pricing.total_amount),
        refund_status: Some(RefundStatus::Processed),
        cancellation_fee: None,
    });

    let internal_comments = match row.priority {
        Priority::Urgent => vec![InternalComment {
            id: format!("comment-{}-1", row.id),
            content: "Card declined twice, customer asked to be called back".to_string(),
            author: "agent.rivera".to_string(),
            created_at: row.created_at + Duration::hours(1),
        }],
        _ => Vec::new(),
    };
    let support_tickets = match row.product_type {
        ProductType::Flight => vec![SupportTicket {
            id: format!("ticket-{}-1", row.id),
            title: "Seat change request".to_string(),
            status: "open".to_string(),
            priority: Priority::High,
            created_at: row.created_at + Duration::hours(2),
        }],
        _ => Vec::new(),
    };

    let summary = ReservationSummary {
        id: id.clone(),
        pnr: row.pnr.to_string(),
        product_type: row.product_type,
        customer_name: row.customer_name.to_string(),
        customer_email: row.customer_email.to_string(),
        status: row.status,
        payment_status: row.payment_status,
        created_at: row.created_at,
        updated_at,
        expires_at: Some(at(2025, 12, 31, 23, 59)),
        total_amount: pricing.total_amount,
        currency: pricing.currency.clone(),
        marketplace: Marketplace {
            id: row.marketplace.0.to_string(),
            name: row.marketplace.1.to_string(),
            agency: "Ultragroup".to_string(),
        },
        priority: row.priority,
        tags: row.tags.iter().map(|tag| tag.to_string()).collect(),
    };

    ReservationDetail {
        external_reference: Some(format!("REF-00{}", row.id)),
        travelers: vec![Traveler {
            name: buyer.name.clone(),
            email: buyer.email.clone(),
            document: buyer.document.clone(),
            document_type: buyer.document_type.clone(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            gender: Gender::Other,
            traveler_type: "adult".to_string(),
            is_main_traveler: true,
        }],
        product: Product {
            product_type: row.product_type,
            name: row.product_name.to_string(),
            provider: row.provider.to_string(),
            provider_reference: format!("PRV-{}", row.id),
            details: json!({ "location": "Bogotá" }),
        },
        payments: vec![PaymentTransaction {
            id: format!("pay-{}", row.id),
            provider: "PSE".to_string(),
            transaction_id: format!("TXN-10000{}", row.id),
            amount: pricing.total_amount,
            currency: pricing.currency.clone(),
            status: match row.payment_status {
                PaymentStatus::Failed => "failed".to_string(),
                _ => "completed".to_string(),
            },
            method: PaymentMethod::BankTransfer,
            processed_at: paid_at,
        }],
        metadata: ReservationMetadata {
            source: SourceChannel::Web,
            session_id: Some(format!("session-{}", row.id)),
            ..ReservationMetadata::default()
        },
        internal_comments,
        support_tickets,
        audit_events: vec![AuditEvent {
            id: format!("audit-{}-1", row.id),
            reservation_id: id,
            event_type: "created".to_string(),
            timestamp: row.created_at,
            author: AuditAuthor {
                id: "system".to_string(),
                name: "System".to_string(),
                email: "system@resdesk.dev".to_string(),
                author_type: "system".to_string(),
            },
            description: "Reservation created".to_string(),
            metadata: serde_json::Map::new(),
        }],
        status_history,
        notifications: NotificationSettings {
            email: true,
            sms: false,
            push: false,
        },
        special_requests: Vec::new(),
        parent_reservation_id: None,
        child_reservation_ids: Vec::new(),
        cancellation,
        buyer,
        pricing,
        summary,
    }
}

/// The five seeded reservations, ordered by id. Reservation `"3"` is already cancelled.
pub fn reservations() -> Vec<ReservationDetail> {
    rows().into_iter().map(build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(reservations(), reservations());
    }

    #[test]
    fn test_seed_pricing_balances() {
        for detail in reservations() {
            assert!(detail.pricing.is_balanced(), "{} does not balance", detail.id());
            assert_eq!(detail.summary.total_amount, detail.pricing.total_amount);
        }
    }

    #[test]
    fn test_seed_shape() {
        let seed = reservations();
        let ids: Vec<_> = seed.iter().map(|d| d.id().as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert!(seed[2].is_cancelled());
        assert!(seed[2].cancellation.is_some());
        assert_eq!(seed.iter().filter(|d| d.is_cancelled()).count(), 1);
    }
}
