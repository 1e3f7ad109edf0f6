use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::FlightStatus;

/// A scheduled flight with live seat inventory.
///
/// Invariant: `0 <= seats_remaining <= capacity`. The counter is decremented
/// exactly once per confirmed ticket and incremented exactly once per
/// cancellation, always inside the same storage transaction as the ticket
/// write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: i64,
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub base_fare: Decimal,
    pub capacity: i32,
    pub seats_remaining: i32,
    pub status: FlightStatus,
}

impl Flight {
    pub fn summary(&self) -> FlightSummary {
        FlightSummary {
            code: self.code.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_at: self.departure_at,
            arrival_at: self.arrival_at,
        }
    }
}

/// Flight fields echoed back on a purchase receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightSummary {
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
}

/// Payload for creating a flight. Seat inventory starts at full capacity.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFlight {
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub base_fare: Decimal,
    pub capacity: i32,
}
