//! Unit tests for model validation helpers.

use airline_ops_api::models::booking_code;
use airline_ops_api::models::enums::{PaymentKind, UserRole};
use airline_ops_api::models::user::{badge_code_valid, normalize_national_id};

#[test]
fn test_national_id_formatting_is_stripped() {
    assert_eq!(
        normalize_national_id("123.456.789-01").as_deref(),
        Some("12345678901")
    );
    assert_eq!(
        normalize_national_id("12345678901").as_deref(),
        Some("12345678901")
    );
}

#[test]
fn test_national_id_must_have_eleven_digits() {
    assert!(normalize_national_id("123").is_none());
    assert!(normalize_national_id("123.456.789-012").is_none());
    assert!(normalize_national_id("1234567890a").is_none());
    assert!(normalize_national_id("").is_none());
}

#[test]
fn test_badge_code_matches_role_prefix() {
    assert!(badge_code_valid(UserRole::Attendant, Some("ATT123")));
    assert!(badge_code_valid(UserRole::Pilot, Some("PIL007")));
    assert!(badge_code_valid(UserRole::Director, Some("DIR001")));

    // Wrong prefix for the role
    assert!(!badge_code_valid(UserRole::Pilot, Some("ATT123")));
    // Bad shapes
    assert!(!badge_code_valid(UserRole::Pilot, Some("PIL12")));
    assert!(!badge_code_valid(UserRole::Pilot, Some("pil123")));
    assert!(!badge_code_valid(UserRole::Pilot, Some("PIL1234")));
    // Employees must carry a badge
    assert!(!badge_code_valid(UserRole::Attendant, None));
}

#[test]
fn test_clients_carry_no_badge() {
    assert!(badge_code_valid(UserRole::Client, None));
    assert!(!badge_code_valid(UserRole::Client, Some("CLI123")));
}

#[test]
fn test_payment_kind_classification() {
    assert_eq!(PaymentKind::from_name("Credit Card"), PaymentKind::Card);
    assert_eq!(PaymentKind::from_name("Pix"), PaymentKind::InstantTransfer);
    assert_eq!(
        PaymentKind::from_name("instant transfer"),
        PaymentKind::InstantTransfer
    );
    assert_eq!(PaymentKind::from_name("Bank Slip"), PaymentKind::BankSlip);
    assert_eq!(PaymentKind::from_name("crypto"), PaymentKind::Other);
}

#[test]
fn test_booking_code_is_zero_padded() {
    assert_eq!(booking_code(1), "P000001");
    assert_eq!(booking_code(42), "P000042");
    assert_eq!(booking_code(1234567), "P1234567");
}
