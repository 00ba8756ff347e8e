//! The admin API client must see exactly what the backing repository holds.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use resdesk_api::{app, AppState};
use resdesk_core::query::{
    ExportFormat, ListParams, PaginationParams, ReservationFilters, SortField, SortOrder,
};
use resdesk_core::reservation::{
    PaymentStatus, Priority, ProductType, ReservationChanges, ReservationId, ReservationStatus,
};
use resdesk_core::{ReservationError, ReservationRepository};
use resdesk_shared::NotificationLevel;
use resdesk_state::{BroadcastNotifier, ReservationsFacade};
use resdesk_store::{HttpReservationRepository, InMemoryReservationRepository, ReqwestTransport};

/// Serve a fresh seeded repository on an ephemeral port.
async fn spawn_backend() -> (Arc<InMemoryReservationRepository>, HttpReservationRepository) {
    let backing = Arc::new(InMemoryReservationRepository::seeded());
    let router = app(AppState::new(backing.clone(), 20));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let transport = ReqwestTransport::new(format!("http://{}", addr), Some(Duration::from_secs(5)))
        .unwrap();
    (backing, HttpReservationRepository::new(Arc::new(transport)))
}

#[tokio::test]
async fn test_list_matches_backing_repository() {
    let (backing, remote) = spawn_backend().await;

    let cases = [
        ListParams::default(),
        ListParams {
            page: Some(1),
            size: Some(2),
            ..ListParams::default()
        },
        ListParams {
            search_term: Some("garcía".to_string()),
            ..ListParams::default()
        },
        ListParams {
            sort_field: Some(SortField::CreatedAt),
            sort_order: Some(SortOrder::Desc),
            ..ListParams::default()
        },
    ];
    for params in cases {
        let expected = backing.list(&params).await.unwrap();
        let actual = remote.list(&params).await.unwrap();
        assert_eq!(actual, expected, "list mismatch for {:?}", params);
    }
}

#[tokio::test]
async fn test_default_list_scenario() {
    let (_, remote) = spawn_backend().await;
    let result = remote.list(&ListParams::default()).await.unwrap();

    assert_eq!(result.items.len(), 5);
    assert_eq!(result.pagination.total_pages, 1);
}

#[tokio::test]
async fn test_search_matches_backing_repository() {
    let (backing, remote) = spawn_backend().await;
    let cases = [
        ReservationFilters::default(),
        ReservationFilters {
            product_types: vec![ProductType::LocalOffer],
            payment_statuses: vec![PaymentStatus::Pending, PaymentStatus::Refunded],
            ..ReservationFilters::default()
        },
        ReservationFilters {
            marketplaces: vec!["BAC Honduras".to_string()],
            priorities: vec![Priority::High, Priority::Normal],
            ..ReservationFilters::default()
        },
        ReservationFilters {
            has_support_tickets: Some(false),
            search_term: Some("email.com".to_string()),
            ..ReservationFilters::default()
        },
    ];
    let pagination = PaginationParams::new(0, 3)
        .unwrap()
        .sorted(SortField::TotalAmount, SortOrder::Asc);

    for filters in cases {
        let expected = backing.search(&filters, &pagination).await.unwrap();
        let actual = remote.search(&filters, &pagination).await.unwrap();
        assert_eq!(actual, expected, "search mismatch for {:?}", filters);
    }
}

#[tokio::test]
async fn test_detail_and_not_found() {
    let (backing, remote) = spawn_backend().await;
    let id = ReservationId::from("4");

    assert_eq!(
        remote.get_by_id(&id).await.unwrap(),
        backing.get_by_id(&id).await.unwrap()
    );
    assert_eq!(
        remote.get_by_id(&ReservationId::from("nonexistent")).await,
        Err(ReservationError::NotFound("nonexistent".to_string()))
    );
}

#[tokio::test]
async fn test_mutations_round_trip() {
    let (backing, remote) = spawn_backend().await;
    let id = ReservationId::from("3");

    let changes = ReservationChanges {
        status: Some(ReservationStatus::Confirmed),
        tags: Some(vec!["reabierta".to_string()]),
        ..ReservationChanges::default()
    };
    let updated = remote.update(&id, &changes).await.unwrap();
    assert_eq!(updated.summary.status, ReservationStatus::Confirmed);
    assert_eq!(updated.summary.pnr, "LO YTHE HDE5");
    assert_eq!(updated, backing.get_by_id(&id).await.unwrap());

    let cancelled = remote.cancel(&id).await.unwrap();
    assert_eq!(cancelled.summary.status, ReservationStatus::Cancelled);
    assert_eq!(remote.cancel(&id).await.unwrap(), cancelled);
}

#[tokio::test]
async fn test_export_through_api() {
    let (_, remote) = spawn_backend().await;
    let filters = ReservationFilters {
        product_types: vec![ProductType::Hotel],
        ..ReservationFilters::default()
    };

    let file = remote.export(&filters, ExportFormat::Csv).await.unwrap();
    assert!(file.content_type.starts_with("text/csv"));
    let text = String::from_utf8(file.bytes).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("HT P0QZ 71LV"));
}

#[tokio::test]
async fn test_facade_over_admin_api() {
    let (_, remote) = spawn_backend().await;
    let notifier = BroadcastNotifier::new(16);
    let mut notifications = notifier.subscribe();
    let (facade, _) = ReservationsFacade::start(Arc::new(remote), Arc::new(notifier), 20);
    let mut stream = Box::pin(facade.reservations_stream());
    assert!(stream.next().await.unwrap().is_empty());

    facade.load(ListParams::default()).unwrap();
    let loaded = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(items) if items.len() == 5 => return items,
                Some(_) => continue,
                None => return Vec::new(),
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(loaded.len(), 5);

    facade.load_detail(ReservationId::from("missing")).unwrap();
    let notification = tokio::time::timeout(Duration::from_secs(5), notifications.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
}
