//! Integration tests for the purchase flow, driven against in-memory SQLite
//! with a deterministic gateway.

use std::sync::Arc;
use std::time::Duration;

use airline_ops_api::models::enums::{CabinClass, UserRole};
use airline_ops_api::models::{NewFlight, NewUser};
use airline_ops_api::services::gateway::{FixedCardDecision, PaymentDetails, SimulatedGateway};
use airline_ops_api::services::settlement::{
    PurchaseRequest, SettlementError, SettlementService,
};
use airline_ops_api::storage::{SqliteBackend, StorageBackend};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct TestContext {
    storage: Arc<dyn StorageBackend>,
    settlement: Arc<SettlementService>,
}

async fn setup(approve_cards: bool) -> TestContext {
    let storage: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open_in_memory().expect("open in-memory database"));
    let gateway = Arc::new(
        SimulatedGateway::new()
            .with_delay(Duration::ZERO)
            .with_decision(Arc::new(FixedCardDecision(approve_cards))),
    );
    let settlement = Arc::new(SettlementService::new(storage.clone(), gateway));
    TestContext {
        storage,
        settlement,
    }
}

async fn seed_flight(ctx: &TestContext, capacity: i32, base_fare: Decimal) -> i64 {
    let departure = Utc::now() + chrono::Duration::days(10);
    ctx.storage
        .insert_flight(NewFlight {
            code: "AO1001".to_string(),
            origin: "GRU".to_string(),
            destination: "GIG".to_string(),
            departure_at: departure,
            arrival_at: departure + chrono::Duration::hours(2),
            base_fare,
            capacity,
        })
        .await
        .expect("insert flight")
        .id
}

async fn seed_client(ctx: &TestContext) -> i64 {
    ctx.storage
        .insert_user(NewUser {
            full_name: "Alice Martins".to_string(),
            national_id: "390.533.447-05".to_string(),
            role: UserRole::Client,
            badge_code: None,
            email: Some("alice@example.com".to_string()),
            phone: None,
        })
        .await
        .expect("insert user")
        .id
}

fn purchase(flight_id: i64, user_id: i64, method: &str, cabin: &str) -> PurchaseRequest {
    PurchaseRequest {
        flight_id: Some(flight_id),
        user_id: Some(user_id),
        payment_method: Some(method.to_string()),
        installments: 1,
        cabin: Some(cabin.to_string()),
        payment_details: PaymentDetails {
            card_number: Some("4111111111111111".to_string()),
            card_holder: Some("ALICE MARTINS".to_string()),
        },
    }
}

#[tokio::test]
async fn test_end_to_end_capacity_two() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 2, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let first = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "economy"))
        .await
        .expect("first purchase");
    assert_eq!(first.seat, "A1");
    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 1);

    let second = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "economy"))
        .await
        .expect("second purchase");
    assert_eq!(second.seat, "A2");
    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 0);

    let third = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "economy"))
        .await;
    assert!(matches!(third, Err(SettlementError::NoSeatsAvailable)));
    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 0);
}

#[tokio::test]
async fn test_receipt_breaks_down_the_fare() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 10, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let receipt = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "business"))
        .await
        .expect("purchase");

    assert_eq!(receipt.code, "P000001");
    assert_eq!(receipt.seat, "E1");
    assert_eq!(receipt.adjusted_price, dec!(150.00));
    assert_eq!(receipt.discount, dec!(7.50));
    assert_eq!(receipt.final_price, dec!(142.50));
    assert_eq!(receipt.flight.code, "AO1001");
    assert!(receipt.payment.approved);

    let ticket = ctx
        .storage
        .get_ticket(receipt.ticket_id)
        .await
        .unwrap()
        .expect("ticket persisted");
    assert_eq!(ticket.final_price, dec!(142.50));
}

#[tokio::test]
async fn test_declined_payment_leaves_no_state() {
    let ctx = setup(false).await;
    let flight_id = seed_flight(&ctx, 5, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let result = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Credit Card", "economy"))
        .await;
    assert!(matches!(result, Err(SettlementError::PaymentDeclined(_))));

    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 5);
    assert!(ctx.storage.list_tickets().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_incomplete_card_data_is_declined() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 5, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let mut request = purchase(flight_id, user_id, "Credit Card", "economy");
    request.payment_details = PaymentDetails::default();

    match ctx.settlement.purchase(request).await {
        Err(SettlementError::PaymentDeclined(message)) => {
            assert_eq!(message, "incomplete card data");
        }
        other => panic!("expected payment decline, got {other:?}"),
    }
}

#[tokio::test]
async fn test_validation_short_circuits() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 5, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    // Missing required fields
    let mut request = purchase(flight_id, user_id, "Pix", "economy");
    request.payment_method = None;
    assert!(matches!(
        ctx.settlement.purchase(request).await,
        Err(SettlementError::InvalidRequest)
    ));

    // Unknown payment method
    assert!(matches!(
        ctx.settlement
            .purchase(purchase(flight_id, user_id, "Crypto", "economy"))
            .await,
        Err(SettlementError::InvalidPaymentMethod)
    ));

    // Installments out of range for the method
    let mut request = purchase(flight_id, user_id, "Pix", "economy");
    request.installments = 2;
    assert!(matches!(
        ctx.settlement.purchase(request).await,
        Err(SettlementError::InvalidInstallments { max: 1, .. })
    ));
    let mut request = purchase(flight_id, user_id, "Credit Card", "economy");
    request.installments = 0;
    assert!(matches!(
        ctx.settlement.purchase(request).await,
        Err(SettlementError::InvalidInstallments { .. })
    ));

    // Missing references
    assert!(matches!(
        ctx.settlement
            .purchase(purchase(9999, user_id, "Pix", "economy"))
            .await,
        Err(SettlementError::FlightNotFound)
    ));
    assert!(matches!(
        ctx.settlement
            .purchase(purchase(flight_id, 9999, "Pix", "economy"))
            .await,
        Err(SettlementError::UserNotFound)
    ));

    // Nothing above should have sold a seat
    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 5);
}

#[tokio::test]
async fn test_seat_labels_stay_distinct_per_class() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 40, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let mut business = Vec::new();
    for _ in 0..8 {
        let receipt = ctx
            .settlement
            .purchase(purchase(flight_id, user_id, "Pix", "business"))
            .await
            .expect("business purchase");
        business.push(receipt.seat);
    }
    // Row E fills its six seats, then row F starts
    assert_eq!(business[5], "E6");
    assert_eq!(business[6], "F1");
    let unique: std::collections::HashSet<&String> = business.iter().collect();
    assert_eq!(unique.len(), business.len());

    // Economy counts independently of business
    let receipt = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "economy"))
        .await
        .expect("economy purchase");
    assert_eq!(receipt.seat, "A1");

    assert_eq!(
        ctx.storage
            .count_confirmed_tickets(flight_id, CabinClass::Business)
            .await
            .unwrap(),
        8
    );
    assert_eq!(
        ctx.storage
            .count_confirmed_tickets(flight_id, CabinClass::Economy)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_unknown_cabin_settles_as_economy() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 5, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let receipt = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Pix", "premium"))
        .await
        .expect("purchase");
    assert_eq!(receipt.seat, "A1");
    assert_eq!(receipt.adjusted_price, dec!(100.00));
}

#[tokio::test]
async fn test_bank_slip_purchase_carries_slip_details() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 5, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let receipt = ctx
        .settlement
        .purchase(purchase(flight_id, user_id, "Bank Slip", "economy"))
        .await
        .expect("purchase");
    assert_eq!(receipt.discount, dec!(3.00));
    assert_eq!(receipt.final_price, dec!(97.00));
    let barcode = receipt.payment.barcode.expect("barcode on the receipt");
    assert_eq!(barcode.len(), 44);
    assert!(receipt.payment.due_date.is_some());
}

#[tokio::test]
async fn test_file_backed_store_persists_between_opens() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("airline.sqlite");

    let departure = Utc::now() + chrono::Duration::days(10);
    {
        let storage = SqliteBackend::open(&path).expect("open database file");
        storage
            .insert_flight(NewFlight {
                code: "AO9000".to_string(),
                origin: "GRU".to_string(),
                destination: "SSA".to_string(),
                departure_at: departure,
                arrival_at: departure + chrono::Duration::hours(2),
                base_fare: dec!(250.00),
                capacity: 50,
            })
            .await
            .expect("insert flight");
    }

    let storage = SqliteBackend::open(&path).expect("reopen database file");
    let flights = storage.list_flights().await.expect("list flights");
    assert_eq!(flights.len(), 1);
    assert_eq!(flights[0].code, "AO9000");
    assert_eq!(flights[0].base_fare, dec!(250.00));
    assert_eq!(flights[0].seats_remaining, 50);
}

#[tokio::test]
async fn test_concurrent_purchases_cannot_oversell_the_last_seat() {
    let ctx = setup(true).await;
    let flight_id = seed_flight(&ctx, 1, dec!(100.00)).await;
    let user_id = seed_client(&ctx).await;

    let (a, b) = tokio::join!(
        ctx.settlement
            .purchase(purchase(flight_id, user_id, "Pix", "economy")),
        ctx.settlement
            .purchase(purchase(flight_id, user_id, "Pix", "economy")),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one purchase may win the last seat");
    for result in [a, b] {
        if let Err(e) = result {
            assert!(matches!(e, SettlementError::NoSeatsAvailable));
        }
    }

    let flight = ctx.storage.get_flight(flight_id).await.unwrap().unwrap();
    assert_eq!(flight.seats_remaining, 0);
}
