//! Fare engine: class multiplier plus payment-method discount.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::enums::{CabinClass, PaymentKind};

/// Result of pricing one ticket. All values are rounded to the currency's
/// minor unit (2 decimal places, half-up).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareBreakdown {
    /// Base fare after the cabin-class multiplier.
    pub adjusted: Decimal,
    /// Discount taken off the class-adjusted price.
    pub discount: Decimal,
    /// What the passenger pays.
    pub total: Decimal,
}

/// Compute the final price for a ticket.
///
/// The discount applies to the class-adjusted price, not the base fare:
/// instant transfer always gets 5%, bank slip gets 3% only when paid in a
/// single installment, everything else pays full price.
pub fn compute_fare(
    base_fare: Decimal,
    cabin: CabinClass,
    method: PaymentKind,
    installments: i32,
) -> FareBreakdown {
    let adjusted = round_currency(base_fare * cabin_multiplier(cabin));
    let discount = round_currency(adjusted * discount_rate(method, installments));
    FareBreakdown {
        adjusted,
        discount,
        total: adjusted - discount,
    }
}

fn cabin_multiplier(cabin: CabinClass) -> Decimal {
    match cabin {
        CabinClass::Economy => Decimal::ONE,
        CabinClass::Business => Decimal::new(15, 1),
        CabinClass::First => Decimal::TWO,
    }
}

fn discount_rate(method: PaymentKind, installments: i32) -> Decimal {
    match method {
        PaymentKind::InstantTransfer => Decimal::new(5, 2),
        PaymentKind::BankSlip if installments == 1 => Decimal::new(3, 2),
        _ => Decimal::ZERO,
    }
}

pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
