use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{CabinClass, TicketStatus};

/// A sold seat on a flight. Mutated only by cancellation, which flips the
/// status and releases the seat; the row itself is retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub flight_id: i64,
    pub user_id: i64,
    pub seat: String,
    pub cabin: CabinClass,
    pub payment_method: String,
    pub installments: i32,
    pub final_price: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub status: TicketStatus,
}

impl Ticket {
    /// Human-readable booking code, e.g. "P000042".
    pub fn code(&self) -> String {
        booking_code(self.id)
    }
}

pub fn booking_code(ticket_id: i64) -> String {
    format!("P{:06}", ticket_id)
}

/// Insert payload for a confirmed sale. The seat label is assigned by the
/// storage backend inside the sale transaction.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub flight_id: i64,
    pub user_id: i64,
    pub cabin: CabinClass,
    pub payment_method: String,
    pub installments: i32,
    pub final_price: Decimal,
}

/// Ticket row joined with its flight and passenger, for list views.
#[derive(Debug, Clone, Serialize)]
pub struct TicketRecord {
    pub id: i64,
    pub code: String,
    pub seat: String,
    pub cabin: CabinClass,
    pub payment_method: String,
    pub installments: i32,
    pub final_price: Decimal,
    pub purchased_at: DateTime<Utc>,
    pub status: TicketStatus,
    pub flight_code: String,
    pub origin: String,
    pub destination: String,
    pub departure_at: DateTime<Utc>,
    pub passenger_name: String,
}
