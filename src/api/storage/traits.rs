//! Storage trait definition for the API storage backends.

use crate::models::enums::CabinClass;
use crate::models::{
    CheckIn, CheckInRecord, Flight, NewFlight, NewTicket, NewUser, PaymentMethod, Ticket,
    TicketRecord, User,
};

/// Storage backend trait for database operations.
///
/// The sale and cancellation operations are transactional units: the ticket
/// write and the seat-counter update fail or succeed together, and the
/// same-class seat count used for label assignment is read under the same
/// lock as the insert.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a flight by id
    async fn get_flight(&self, flight_id: i64) -> Result<Option<Flight>, super::StorageError>;

    /// List all flights, soonest departure first
    async fn list_flights(&self) -> Result<Vec<Flight>, super::StorageError>;

    /// Create a flight with a full seat inventory
    async fn insert_flight(&self, flight: NewFlight) -> Result<Flight, super::StorageError>;

    /// Get a user by id
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, super::StorageError>;

    /// Register a user; the national ID is stored with formatting stripped
    async fn insert_user(&self, user: NewUser) -> Result<User, super::StorageError>;

    /// Look up a payment method by its exact name
    async fn get_payment_method(
        &self,
        name: &str,
    ) -> Result<Option<PaymentMethod>, super::StorageError>;

    /// List active payment methods
    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, super::StorageError>;

    /// Count confirmed tickets on a flight in one cabin class
    async fn count_confirmed_tickets(
        &self,
        flight_id: i64,
        cabin: CabinClass,
    ) -> Result<i64, super::StorageError>;

    /// Record a confirmed sale: assign the seat label from the in-transaction
    /// same-class count, decrement `seats_remaining` (compare-and-swap on
    /// `> 0`) and insert the ticket, all in one transaction. Fails with
    /// `SoldOut` when no seat is left.
    async fn record_sale(&self, sale: NewTicket) -> Result<Ticket, super::StorageError>;

    /// Get a ticket by id
    async fn get_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, super::StorageError>;

    /// Get a ticket together with its flight
    async fn get_ticket_with_flight(
        &self,
        ticket_id: i64,
    ) -> Result<Option<(Ticket, Flight)>, super::StorageError>;

    /// All tickets with flight and passenger context, newest purchase first
    async fn list_tickets(&self) -> Result<Vec<TicketRecord>, super::StorageError>;

    /// One user's tickets, newest purchase first
    async fn list_tickets_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TicketRecord>, super::StorageError>;

    /// Flip a confirmed ticket to cancelled and release its seat, in one
    /// transaction. A ticket that is missing or already cancelled fails
    /// with `NotFound`.
    async fn cancel_ticket(&self, ticket_id: i64) -> Result<(), super::StorageError>;

    /// Create the check-in for a ticket; at most one may exist (`Duplicate`
    /// on a second attempt)
    async fn insert_checkin(
        &self,
        ticket_id: i64,
        bag_count: i32,
    ) -> Result<CheckIn, super::StorageError>;

    /// Get the check-in for a ticket, if any
    async fn get_checkin_for_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<Option<CheckIn>, super::StorageError>;

    /// Check-ins for a flight joined with seat and passenger, ordered by seat
    async fn list_checkins_for_flight(
        &self,
        flight_id: i64,
    ) -> Result<Vec<CheckInRecord>, super::StorageError>;
}
