//! Settlement coordinator: validates a purchase, prices it, charges the
//! gateway and records the sale atomically. Also owns cancellation and
//! check-in, which operate on existing tickets.

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::enums::{CabinClass, PaymentKind, TicketStatus};
use crate::models::{CheckIn, FlightSummary, NewTicket, booking_code};
use crate::services::fare::{self, FareBreakdown};
use crate::services::gateway::{ChargeRequest, PaymentDetails, PaymentGateway, PaymentOutcome};
use crate::storage::{StorageBackend, StorageError};

/// Hours before departure past which a ticket can no longer be cancelled.
const CANCELLATION_WINDOW_HOURS: i64 = 24;

/// Share of the final price refunded on cancellation (flat 20% fee).
fn refund_rate() -> Decimal {
    Decimal::new(8, 1)
}

/// Purchase request as received from the HTTP layer. The identity
/// collaborator has already resolved and authorized `user_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    pub flight_id: Option<i64>,
    pub user_id: Option<i64>,
    pub payment_method: Option<String>,
    #[serde(default = "default_installments")]
    pub installments: i32,
    /// Raw class name; unknown values settle as economy.
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub payment_details: PaymentDetails,
}

fn default_installments() -> i32 {
    1
}

/// Everything the caller gets back for a confirmed sale.
#[derive(Debug, Clone, Serialize)]
pub struct TicketReceipt {
    pub ticket_id: i64,
    pub code: String,
    pub seat: String,
    pub cabin: CabinClass,
    pub payment_method: String,
    pub installments: i32,
    pub adjusted_price: Decimal,
    pub discount: Decimal,
    pub final_price: Decimal,
    pub flight: FlightSummary,
    pub payment: PaymentOutcome,
    pub payment_note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundInfo {
    pub ticket_id: i64,
    pub code: String,
    pub refund_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub checkin_id: i64,
    pub ticket_id: i64,
    pub seat: String,
    pub bag_count: i32,
}

/// Failure taxonomy for purchase, cancellation and check-in. Every variant
/// is recovered locally and surfaced as a typed result; only storage faults
/// represent unexpected conditions.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("flight, user and payment method are required")]
    InvalidRequest,
    #[error("payment method is invalid or unavailable")]
    InvalidPaymentMethod,
    #[error("invalid installment count for {method}: maximum is {max}x")]
    InvalidInstallments { method: String, max: i32 },
    #[error("flight not found")]
    FlightNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("ticket not found")]
    TicketNotFound,
    #[error("no seats available on this flight")]
    NoSeatsAvailable,
    #[error("payment failed: {0}")]
    PaymentDeclined(String),
    #[error("check-in already completed for this ticket")]
    AlreadyCheckedIn,
    #[error("ticket has already been cancelled")]
    AlreadyCancelled,
    #[error("cancellation is not allowed within {CANCELLATION_WINDOW_HOURS} hours of departure")]
    CancellationWindowClosed,
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl SettlementError {
    /// Stable machine-readable kind, carried alongside the message on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementError::InvalidRequest => "INVALID_REQUEST",
            SettlementError::InvalidPaymentMethod => "INVALID_PAYMENT_METHOD",
            SettlementError::InvalidInstallments { .. } => "INVALID_INSTALLMENTS",
            SettlementError::FlightNotFound => "FLIGHT_NOT_FOUND",
            SettlementError::UserNotFound => "USER_NOT_FOUND",
            SettlementError::TicketNotFound => "TICKET_NOT_FOUND",
            SettlementError::NoSeatsAvailable => "NO_SEATS_AVAILABLE",
            SettlementError::PaymentDeclined(_) => "PAYMENT_DECLINED",
            SettlementError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            SettlementError::AlreadyCancelled => "ALREADY_CANCELLED",
            SettlementError::CancellationWindowClosed => "CANCELLATION_WINDOW_CLOSED",
            SettlementError::Storage(_) => "STORAGE_FAILURE",
        }
    }
}

/// The one authoritative purchase/cancel/check-in path. Collaborators are
/// injected at construction; there is no global connection state.
pub struct SettlementService {
    storage: Arc<dyn StorageBackend>,
    gateway: Arc<dyn PaymentGateway>,
}

impl SettlementService {
    pub fn new(storage: Arc<dyn StorageBackend>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { storage, gateway }
    }

    /// Run a purchase end to end. Validations short-circuit in a fixed
    /// order; the ticket insert and the seat decrement happen as one
    /// storage transaction, so a failure at any step leaves no partial
    /// state behind.
    pub async fn purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<TicketReceipt, SettlementError> {
        let (flight_id, user_id, method_name) = match (
            request.flight_id,
            request.user_id,
            request.payment_method.as_deref(),
        ) {
            (Some(f), Some(u), Some(m)) if !m.trim().is_empty() => (f, u, m.trim().to_string()),
            _ => return Err(SettlementError::InvalidRequest),
        };

        let method = self
            .storage
            .get_payment_method(&method_name)
            .await?
            .filter(|m| m.active)
            .ok_or(SettlementError::InvalidPaymentMethod)?;

        if request.installments < 1 || request.installments > method.max_installments {
            return Err(SettlementError::InvalidInstallments {
                method: method.name.clone(),
                max: method.max_installments,
            });
        }

        let flight = self
            .storage
            .get_flight(flight_id)
            .await?
            .ok_or(SettlementError::FlightNotFound)?;

        if flight.seats_remaining <= 0 {
            return Err(SettlementError::NoSeatsAvailable);
        }

        self.storage
            .get_user(user_id)
            .await?
            .ok_or(SettlementError::UserNotFound)?;

        let cabin = CabinClass::from_request(request.cabin.as_deref().unwrap_or(""));
        let FareBreakdown {
            adjusted,
            discount,
            total,
        } = fare::compute_fare(flight.base_fare, cabin, method.kind(), request.installments);

        let payment = self
            .gateway
            .charge(&ChargeRequest {
                method: method.kind(),
                installments: request.installments,
                amount: total,
                details: request.payment_details,
            })
            .await;

        if !payment.approved {
            warn!(
                flight_id,
                user_id,
                method = %method.name,
                "payment declined: {}",
                payment.message
            );
            return Err(SettlementError::PaymentDeclined(payment.message));
        }

        // The storage backend re-checks availability under its own lock;
        // losing the last seat to a concurrent purchase surfaces here.
        let ticket = self
            .storage
            .record_sale(NewTicket {
                flight_id,
                user_id,
                cabin,
                payment_method: method.name.clone(),
                installments: request.installments,
                final_price: total,
            })
            .await
            .map_err(|e| match e {
                StorageError::SoldOut => SettlementError::NoSeatsAvailable,
                other => SettlementError::Storage(other),
            })?;

        info!(
            ticket_id = ticket.id,
            flight = %flight.code,
            seat = %ticket.seat,
            "ticket sold for {}",
            total
        );

        Ok(TicketReceipt {
            ticket_id: ticket.id,
            code: ticket.code(),
            seat: ticket.seat.clone(),
            cabin,
            payment_method: method.name.clone(),
            installments: request.installments,
            adjusted_price: adjusted,
            discount,
            final_price: total,
            flight: flight.summary(),
            payment,
            payment_note: payment_note(method.kind(), request.installments),
        })
    }

    /// Cancel a confirmed ticket, releasing its seat and computing the
    /// refund. Rejected inside the 24-hour window before departure.
    pub async fn cancel(&self, ticket_id: i64) -> Result<RefundInfo, SettlementError> {
        let (ticket, flight) = self
            .storage
            .get_ticket_with_flight(ticket_id)
            .await?
            .ok_or(SettlementError::TicketNotFound)?;

        if ticket.status == TicketStatus::Cancelled {
            return Err(SettlementError::AlreadyCancelled);
        }

        if flight.departure_at - Utc::now() < ChronoDuration::hours(CANCELLATION_WINDOW_HOURS) {
            return Err(SettlementError::CancellationWindowClosed);
        }

        self.storage.cancel_ticket(ticket_id).await?;

        let refund_amount = fare::round_currency(ticket.final_price * refund_rate());
        info!(ticket_id, flight = %flight.code, "ticket cancelled, refunding {refund_amount}");

        Ok(RefundInfo {
            ticket_id,
            code: booking_code(ticket_id),
            refund_amount,
        })
    }

    /// Check a passenger in. Gated only on the ticket existing and not
    /// having been checked in before; the unique constraint in storage
    /// backs the gate against concurrent calls.
    pub async fn check_in(
        &self,
        ticket_id: i64,
        bag_count: i32,
    ) -> Result<CheckInReceipt, SettlementError> {
        let ticket = self
            .storage
            .get_ticket(ticket_id)
            .await?
            .ok_or(SettlementError::TicketNotFound)?;

        if self
            .storage
            .get_checkin_for_ticket(ticket_id)
            .await?
            .is_some()
        {
            return Err(SettlementError::AlreadyCheckedIn);
        }

        let checkin: CheckIn = self
            .storage
            .insert_checkin(ticket_id, bag_count.max(0))
            .await
            .map_err(|e| match e {
                StorageError::Duplicate => SettlementError::AlreadyCheckedIn,
                other => SettlementError::Storage(other),
            })?;

        info!(ticket_id, bag_count = checkin.bag_count, "check-in completed");

        Ok(CheckInReceipt {
            checkin_id: checkin.id,
            ticket_id,
            seat: ticket.seat,
            bag_count: checkin.bag_count,
        })
    }
}

fn payment_note(method: PaymentKind, installments: i32) -> String {
    match method {
        PaymentKind::InstantTransfer => "Instant transfer payment, 5% discount applied".to_string(),
        PaymentKind::BankSlip if installments == 1 => {
            "Bank slip issued, 3% discount applied".to_string()
        }
        PaymentKind::BankSlip => "Bank slip issued".to_string(),
        PaymentKind::Card => format!("Card payment in {installments}x"),
        PaymentKind::Other => "Payment processed".to_string(),
    }
}
