//! PostgreSQL storage backend implementation.
//!
//! Uses sqlx for database operations and implements the StorageBackend
//! trait. The sale path takes a row lock on the flight so the seat count,
//! the inventory decrement and the ticket insert are serialized per flight.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::StorageError;
use super::traits::StorageBackend;
use crate::models::enums::{
    CabinClass, CheckInStatus, FlightStatus, TicketStatus, UserRole,
};
use crate::models::{
    CheckIn, CheckInRecord, Flight, NewFlight, NewTicket, NewUser, PaymentMethod, Ticket,
    TicketRecord, User, user,
};
use crate::services::seating;

/// PostgreSQL storage backend implementation.
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Create a backend over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::ConnectionError(format!("Migration failed: {}", e)))?;
        Ok(Self { pool })
    }
}

fn from_sqlx(e: sqlx::Error) -> StorageError {
    if e.as_database_error()
        .is_some_and(|d| d.is_unique_violation())
    {
        return StorageError::Duplicate;
    }
    StorageError::ConnectionError(e.to_string())
}

fn flight_from_row(row: &PgRow) -> Result<Flight, sqlx::Error> {
    Ok(Flight {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        origin: row.try_get("origin")?,
        destination: row.try_get("destination")?,
        departure_at: row.try_get("departure_at")?,
        arrival_at: row.try_get("arrival_at")?,
        base_fare: row.try_get("base_fare")?,
        capacity: row.try_get("capacity")?,
        seats_remaining: row.try_get("seats_remaining")?,
        status: FlightStatus::from_str_or_scheduled(row.try_get::<&str, _>("status")?),
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, sqlx::Error> {
    Ok(Ticket {
        id: row.try_get("id")?,
        flight_id: row.try_get("flight_id")?,
        user_id: row.try_get("user_id")?,
        seat: row.try_get("seat")?,
        cabin: CabinClass::from_request(row.try_get::<&str, _>("cabin")?),
        payment_method: row.try_get("payment_method")?,
        installments: row.try_get("installments")?,
        final_price: row.try_get("final_price")?,
        purchased_at: row.try_get("purchased_at")?,
        status: TicketStatus::from_str_or_confirmed(row.try_get::<&str, _>("status")?),
    })
}

fn ticket_record_from_row(row: &PgRow) -> Result<TicketRecord, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    Ok(TicketRecord {
        id,
        code: crate::models::booking_code(id),
        seat: row.try_get("seat")?,
        cabin: CabinClass::from_request(row.try_get::<&str, _>("cabin")?),
        payment_method: row.try_get("payment_method")?,
        installments: row.try_get("installments")?,
        final_price: row.try_get("final_price")?,
        purchased_at: row.try_get("purchased_at")?,
        status: TicketStatus::from_str_or_confirmed(row.try_get::<&str, _>("status")?),
        flight_code: row.try_get("flight_code")?,
        origin: row.try_get("origin")?,
        destination: row.try_get("destination")?,
        departure_at: row.try_get("departure_at")?,
        passenger_name: row.try_get("passenger_name")?,
    })
}

fn payment_method_from_row(row: &PgRow) -> Result<PaymentMethod, sqlx::Error> {
    Ok(PaymentMethod {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        max_installments: row.try_get("max_installments")?,
        active: row.try_get("active")?,
    })
}

const TICKET_RECORD_QUERY: &str = "SELECT t.id, t.seat, t.cabin, t.payment_method, t.installments,
            t.final_price, t.purchased_at, t.status,
            f.code AS flight_code, f.origin, f.destination, f.departure_at,
            u.full_name AS passenger_name
     FROM tickets t
     JOIN flights f ON t.flight_id = f.id
     JOIN users u ON t.user_id = u.id";

#[async_trait]
impl StorageBackend for PostgresBackend {
    async fn get_flight(&self, flight_id: i64) -> Result<Option<Flight>, StorageError> {
        let row = sqlx::query("SELECT * FROM flights WHERE id = $1")
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;
        row.as_ref().map(flight_from_row).transpose().map_err(from_sqlx)
    }

    async fn list_flights(&self) -> Result<Vec<Flight>, StorageError> {
        let rows = sqlx::query("SELECT * FROM flights ORDER BY departure_at")
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;
        rows.iter().map(flight_from_row).collect::<Result<_, _>>().map_err(from_sqlx)
    }

    async fn insert_flight(&self, flight: NewFlight) -> Result<Flight, StorageError> {
        if flight.capacity < 0 {
            return Err(StorageError::Other("capacity must not be negative".into()));
        }
        let row = sqlx::query(
            "INSERT INTO flights (code, origin, destination, departure_at, arrival_at, base_fare, capacity, seats_remaining, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, 'scheduled')
             RETURNING id",
        )
        .bind(&flight.code)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure_at)
        .bind(flight.arrival_at)
        .bind(flight.base_fare)
        .bind(flight.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;
        let id: i64 = row.try_get("id").map_err(from_sqlx)?;
        Ok(Flight {
            id,
            code: flight.code,
            origin: flight.origin,
            destination: flight.destination,
            departure_at: flight.departure_at,
            arrival_at: flight.arrival_at,
            base_fare: flight.base_fare,
            capacity: flight.capacity,
            seats_remaining: flight.capacity,
            status: FlightStatus::Scheduled,
        })
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            "SELECT id, full_name, national_id, role, badge_code, email, phone, active
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        row.map(|row| {
            Ok(User {
                id: row.try_get("id")?,
                full_name: row.try_get("full_name")?,
                national_id: row.try_get("national_id")?,
                role: UserRole::from_str(row.try_get::<&str, _>("role")?)
                    .unwrap_or(UserRole::Client),
                badge_code: row.try_get("badge_code")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                active: row.try_get("active")?,
            })
        })
        .transpose()
        .map_err(from_sqlx)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StorageError> {
        let national_id = user::normalize_national_id(&new_user.national_id)
            .ok_or_else(|| StorageError::Other("national ID must have 11 digits".into()))?;
        if !user::badge_code_valid(new_user.role, new_user.badge_code.as_deref()) {
            return Err(StorageError::Other(
                "badge code does not match the role format".into(),
            ));
        }

        let row = sqlx::query(
            "INSERT INTO users (full_name, national_id, role, badge_code, email, phone, active)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING id",
        )
        .bind(&new_user.full_name)
        .bind(&national_id)
        .bind(new_user.role.as_str())
        .bind(&new_user.badge_code)
        .bind(&new_user.email)
        .bind(&new_user.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;
        let id: i64 = row.try_get("id").map_err(from_sqlx)?;
        Ok(User {
            id,
            full_name: new_user.full_name,
            national_id,
            role: new_user.role,
            badge_code: new_user.badge_code,
            email: new_user.email,
            phone: new_user.phone,
            active: true,
        })
    }

    async fn get_payment_method(
        &self,
        name: &str,
    ) -> Result<Option<PaymentMethod>, StorageError> {
        let row = sqlx::query(
            "SELECT id, name, max_installments, active FROM payment_methods WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        row.as_ref()
            .map(payment_method_from_row)
            .transpose()
            .map_err(from_sqlx)
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, name, max_installments, active FROM payment_methods
             WHERE active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        rows.iter()
            .map(payment_method_from_row)
            .collect::<Result<_, _>>()
            .map_err(from_sqlx)
    }

    async fn count_confirmed_tickets(
        &self,
        flight_id: i64,
        cabin: CabinClass,
    ) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets
             WHERE flight_id = $1 AND cabin = $2 AND status = 'confirmed'",
        )
        .bind(flight_id)
        .bind(cabin.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)
    }

    async fn record_sale(&self, sale: NewTicket) -> Result<Ticket, StorageError> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;

        // Row lock serializes concurrent sales on the same flight.
        let seats: Option<i32> =
            sqlx::query_scalar("SELECT seats_remaining FROM flights WHERE id = $1 FOR UPDATE")
                .bind(sale.flight_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(from_sqlx)?;
        let seats = seats.ok_or_else(|| StorageError::not_found("flight", sale.flight_id))?;
        if seats <= 0 {
            return Err(StorageError::SoldOut);
        }

        let sold: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets
             WHERE flight_id = $1 AND cabin = $2 AND status = 'confirmed'",
        )
        .bind(sale.flight_id)
        .bind(sale.cabin.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(from_sqlx)?;
        let seat = seating::seat_label(sale.cabin, sold);
        let purchased_at = Utc::now();

        sqlx::query("UPDATE flights SET seats_remaining = seats_remaining - 1 WHERE id = $1")
            .bind(sale.flight_id)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tickets (flight_id, user_id, seat, cabin, payment_method, installments, final_price, purchased_at, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'confirmed')
             RETURNING id",
        )
        .bind(sale.flight_id)
        .bind(sale.user_id)
        .bind(&seat)
        .bind(sale.cabin.as_str())
        .bind(&sale.payment_method)
        .bind(sale.installments)
        .bind(sale.final_price)
        .bind(purchased_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(from_sqlx)?;

        tx.commit().await.map_err(from_sqlx)?;

        Ok(Ticket {
            id,
            flight_id: sale.flight_id,
            user_id: sale.user_id,
            seat,
            cabin: sale.cabin,
            payment_method: sale.payment_method,
            installments: sale.installments,
            final_price: sale.final_price,
            purchased_at,
            status: TicketStatus::Confirmed,
        })
    }

    async fn get_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, StorageError> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?;
        row.as_ref().map(ticket_from_row).transpose().map_err(from_sqlx)
    }

    async fn get_ticket_with_flight(
        &self,
        ticket_id: i64,
    ) -> Result<Option<(Ticket, Flight)>, StorageError> {
        let ticket = match self.get_ticket(ticket_id).await? {
            Some(t) => t,
            None => return Ok(None),
        };
        let flight = self
            .get_flight(ticket.flight_id)
            .await?
            .ok_or_else(|| StorageError::not_found("flight", ticket.flight_id))?;
        Ok(Some((ticket, flight)))
    }

    async fn list_tickets(&self) -> Result<Vec<TicketRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "{TICKET_RECORD_QUERY} ORDER BY t.purchased_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        rows.iter()
            .map(ticket_record_from_row)
            .collect::<Result<_, _>>()
            .map_err(from_sqlx)
    }

    async fn list_tickets_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TicketRecord>, StorageError> {
        let rows = sqlx::query(&format!(
            "{TICKET_RECORD_QUERY} WHERE t.user_id = $1 ORDER BY t.purchased_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        rows.iter()
            .map(ticket_record_from_row)
            .collect::<Result<_, _>>()
            .map_err(from_sqlx)
    }

    async fn cancel_ticket(&self, ticket_id: i64) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx)?;

        let flight_id: Option<i64> = sqlx::query_scalar(
            "UPDATE tickets SET status = 'cancelled'
             WHERE id = $1 AND status = 'confirmed'
             RETURNING flight_id",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(from_sqlx)?;
        let flight_id =
            flight_id.ok_or_else(|| StorageError::not_found("ticket", ticket_id))?;

        sqlx::query("UPDATE flights SET seats_remaining = seats_remaining + 1 WHERE id = $1")
            .bind(flight_id)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx)?;

        tx.commit().await.map_err(from_sqlx)
    }

    async fn insert_checkin(
        &self,
        ticket_id: i64,
        bag_count: i32,
    ) -> Result<CheckIn, StorageError> {
        let checked_in_at = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO checkins (ticket_id, checked_in_at, bag_count, status)
             VALUES ($1, $2, $3, 'completed')
             RETURNING id",
        )
        .bind(ticket_id)
        .bind(checked_in_at)
        .bind(bag_count)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;
        Ok(CheckIn {
            id,
            ticket_id,
            checked_in_at,
            bag_count,
            status: CheckInStatus::Completed,
        })
    }

    async fn get_checkin_for_ticket(
        &self,
        ticket_id: i64,
    ) -> Result<Option<CheckIn>, StorageError> {
        let row = sqlx::query(
            "SELECT id, ticket_id, checked_in_at, bag_count FROM checkins WHERE ticket_id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?;
        row.map(|row| {
            Ok(CheckIn {
                id: row.try_get("id")?,
                ticket_id: row.try_get("ticket_id")?,
                checked_in_at: row.try_get("checked_in_at")?,
                bag_count: row.try_get("bag_count")?,
                status: CheckInStatus::Completed,
            })
        })
        .transpose()
        .map_err(from_sqlx)
    }

    async fn list_checkins_for_flight(
        &self,
        flight_id: i64,
    ) -> Result<Vec<CheckInRecord>, StorageError> {
        let rows = sqlx::query(
            "SELECT c.id, c.ticket_id, c.checked_in_at, c.bag_count,
                    t.seat, t.cabin, u.full_name AS passenger_name, f.code AS flight_code
             FROM checkins c
             JOIN tickets t ON c.ticket_id = t.id
             JOIN users u ON t.user_id = u.id
             JOIN flights f ON t.flight_id = f.id
             WHERE t.flight_id = $1
             ORDER BY t.seat",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        rows.iter()
            .map(|row| {
                Ok(CheckInRecord {
                    id: row.try_get("id")?,
                    ticket_id: row.try_get("ticket_id")?,
                    checked_in_at: row.try_get("checked_in_at")?,
                    bag_count: row.try_get("bag_count")?,
                    seat: row.try_get("seat")?,
                    cabin: CabinClass::from_request(row.try_get::<&str, _>("cabin")?),
                    passenger_name: row.try_get("passenger_name")?,
                    flight_code: row.try_get("flight_code")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(from_sqlx)
    }
}
