//! Unit tests for the seat allocator.

use airline_ops_api::models::enums::CabinClass;
use airline_ops_api::services::seating::seat_label;

#[test]
fn test_economy_fills_thirty_abreast_rows() {
    assert_eq!(seat_label(CabinClass::Economy, 0), "A1");
    assert_eq!(seat_label(CabinClass::Economy, 1), "A2");
    assert_eq!(seat_label(CabinClass::Economy, 29), "A30");
    assert_eq!(seat_label(CabinClass::Economy, 30), "B1");
    assert_eq!(seat_label(CabinClass::Economy, 61), "C2");
}

#[test]
fn test_business_rows_start_at_e() {
    assert_eq!(seat_label(CabinClass::Business, 0), "E1");
    assert_eq!(seat_label(CabinClass::Business, 5), "E6");
    assert_eq!(seat_label(CabinClass::Business, 6), "F1");
    assert_eq!(seat_label(CabinClass::Business, 13), "G2");
}

#[test]
fn test_first_class_is_one_row_of_eight() {
    assert_eq!(seat_label(CabinClass::First, 0), "P1");
    assert_eq!(seat_label(CabinClass::First, 7), "P8");
    // The allocator wraps rather than overflowing; the availability check
    // is the ceiling.
    assert_eq!(seat_label(CabinClass::First, 8), "P1");
}

#[test]
fn test_labels_distinct_within_a_row_cycle() {
    let economy: Vec<String> = (0..60).map(|n| seat_label(CabinClass::Economy, n)).collect();
    let unique: std::collections::HashSet<&String> = economy.iter().collect();
    assert_eq!(unique.len(), economy.len());

    let business: Vec<String> = (0..18)
        .map(|n| seat_label(CabinClass::Business, n))
        .collect();
    let unique: std::collections::HashSet<&String> = business.iter().collect();
    assert_eq!(unique.len(), business.len());
}

#[test]
fn test_negative_count_is_clamped() {
    assert_eq!(seat_label(CabinClass::Economy, -5), "A1");
}
