//! Services module - fare computation, seat allocation, payment simulation
//! and the settlement coordinator.

pub mod fare;
pub mod gateway;
pub mod seating;
pub mod settlement;

// Re-export for convenience
pub use fare::{FareBreakdown, compute_fare};
pub use gateway::{PaymentGateway, PaymentOutcome, SimulatedGateway};
pub use seating::seat_label;
pub use settlement::{PurchaseRequest, SettlementError, SettlementService, TicketReceipt};
