//! Integration tests for cancellation and check-in, driven against
//! in-memory SQLite.

use std::sync::Arc;
use std::time::Duration;

use airline_ops_api::models::enums::UserRole;
use airline_ops_api::models::{NewFlight, NewUser};
use airline_ops_api::services::gateway::{FixedCardDecision, PaymentDetails, SimulatedGateway};
use airline_ops_api::services::settlement::{
    PurchaseRequest, SettlementError, SettlementService,
};
use airline_ops_api::storage::{SqliteBackend, StorageBackend};
use chrono::Utc;
use rust_decimal_macros::dec;

struct TestContext {
    storage: Arc<dyn StorageBackend>,
    settlement: Arc<SettlementService>,
}

async fn setup() -> TestContext {
    let storage: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open_in_memory().expect("open in-memory database"));
    let gateway = Arc::new(
        SimulatedGateway::new()
            .with_delay(Duration::ZERO)
            .with_decision(Arc::new(FixedCardDecision(true))),
    );
    let settlement = Arc::new(SettlementService::new(storage.clone(), gateway));
    TestContext {
        storage,
        settlement,
    }
}

/// Seed a flight departing the given number of hours from now and sell one
/// economy ticket on it, returning the ticket id.
async fn seed_ticket(ctx: &TestContext, hours_to_departure: i64) -> i64 {
    let departure = Utc::now() + chrono::Duration::hours(hours_to_departure);
    let flight = ctx
        .storage
        .insert_flight(NewFlight {
            code: format!("AO{hours_to_departure:04}"),
            origin: "GRU".to_string(),
            destination: "GIG".to_string(),
            departure_at: departure,
            arrival_at: departure + chrono::Duration::hours(2),
            base_fare: dec!(100.00),
            capacity: 10,
        })
        .await
        .expect("insert flight");
    let user = ctx
        .storage
        .insert_user(NewUser {
            full_name: "Bruno Costa".to_string(),
            national_id: "529.982.247-25".to_string(),
            role: UserRole::Client,
            badge_code: None,
            email: None,
            phone: None,
        })
        .await
        .expect("insert user");

    ctx.settlement
        .purchase(PurchaseRequest {
            flight_id: Some(flight.id),
            user_id: Some(user.id),
            payment_method: Some("Pix".to_string()),
            installments: 1,
            cabin: Some("economy".to_string()),
            payment_details: PaymentDetails::default(),
        })
        .await
        .expect("purchase")
        .ticket_id
}

#[tokio::test]
async fn test_cancellation_outside_window_refunds_eighty_percent() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 25).await;

    let refund = ctx.settlement.cancel(ticket_id).await.expect("cancel");
    // Final price was 95.00 (Pix discount on 100.00)
    assert_eq!(refund.refund_amount, dec!(76.00));

    // The seat goes back into inventory and the row is kept for audit
    let (ticket, flight) = ctx
        .storage
        .get_ticket_with_flight(ticket_id)
        .await
        .unwrap()
        .expect("ticket retained");
    assert_eq!(flight.seats_remaining, 10);
    assert_eq!(
        ticket.status,
        airline_ops_api::models::enums::TicketStatus::Cancelled
    );
}

#[tokio::test]
async fn test_cancellation_inside_window_is_rejected() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 23).await;

    let result = ctx.settlement.cancel(ticket_id).await;
    assert!(matches!(
        result,
        Err(SettlementError::CancellationWindowClosed)
    ));

    // Nothing changed
    let (ticket, flight) = ctx
        .storage
        .get_ticket_with_flight(ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flight.seats_remaining, 9);
    assert_eq!(
        ticket.status,
        airline_ops_api::models::enums::TicketStatus::Confirmed
    );
}

#[tokio::test]
async fn test_cancelling_twice_releases_one_seat_only() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 48).await;

    ctx.settlement.cancel(ticket_id).await.expect("cancel");
    let result = ctx.settlement.cancel(ticket_id).await;
    assert!(matches!(result, Err(SettlementError::AlreadyCancelled)));

    let (_, flight) = ctx
        .storage
        .get_ticket_with_flight(ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flight.seats_remaining, 10);
}

#[tokio::test]
async fn test_cancel_unknown_ticket() {
    let ctx = setup().await;
    let result = ctx.settlement.cancel(404).await;
    assert!(matches!(result, Err(SettlementError::TicketNotFound)));
}

#[tokio::test]
async fn test_check_in_happens_once() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 48).await;

    let receipt = ctx
        .settlement
        .check_in(ticket_id, 2)
        .await
        .expect("first check-in");
    assert_eq!(receipt.bag_count, 2);
    assert_eq!(receipt.seat, "A1");

    let second = ctx.settlement.check_in(ticket_id, 5).await;
    assert!(matches!(second, Err(SettlementError::AlreadyCheckedIn)));

    // The first bag count is preserved
    let checkin = ctx
        .storage
        .get_checkin_for_ticket(ticket_id)
        .await
        .unwrap()
        .expect("check-in stored");
    assert_eq!(checkin.bag_count, 2);
}

#[tokio::test]
async fn test_check_in_defaults_and_clamps_bag_count() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 48).await;

    let receipt = ctx
        .settlement
        .check_in(ticket_id, -3)
        .await
        .expect("check-in");
    assert_eq!(receipt.bag_count, 0);
}

#[tokio::test]
async fn test_check_in_unknown_ticket() {
    let ctx = setup().await;
    let result = ctx.settlement.check_in(404, 0).await;
    assert!(matches!(result, Err(SettlementError::TicketNotFound)));
}

#[tokio::test]
async fn test_flight_manifest_lists_checked_in_passengers() {
    let ctx = setup().await;
    let ticket_id = seed_ticket(&ctx, 48).await;
    ctx.settlement.check_in(ticket_id, 1).await.expect("check-in");

    let ticket = ctx.storage.get_ticket(ticket_id).await.unwrap().unwrap();
    let manifest = ctx
        .storage
        .list_checkins_for_flight(ticket.flight_id)
        .await
        .unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].seat, "A1");
    assert_eq!(manifest[0].passenger_name, "Bruno Costa");
    assert_eq!(manifest[0].bag_count, 1);
}
