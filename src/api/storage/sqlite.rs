//! SQLite storage backend.
//!
//! Default store for development and tests. A single guarded connection
//! gives the per-flight single-writer semantics the sale path needs; sale
//! and cancellation run as immediate transactions.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::info;

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

/// SQLite storage backend.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) a database file and initialize the schema.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by the test suite.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(std::time::Duration::from_secs(3))
            .map_err(from_sqlite)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(from_sqlite)?;
        init_schema(&conn).map_err(from_sqlite)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a handful of upcoming flights when the table is empty, so a
    /// fresh development database is immediately usable.
    pub async fn seed_demo_flights(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        let existing: i64 = conn
            .query_row("SELECT COUNT(*) FROM flights", [], |r| r.get(0))
            .map_err(from_sqlite)?;
        if existing > 0 {
            return Ok(());
        }

        let now = Utc::now();
        let demo = [
            ("AO1001", "GRU", "GIG", 3, "350.00", 186),
            ("AO1002", "GIG", "BSB", 5, "420.00", 180),
            ("AO1003", "GRU", "SSA", 7, "510.00", 124),
        ];
        for (code, origin, destination, days_out, base_fare, capacity) in demo {
            let departure = now + chrono::Duration::days(days_out);
            let arrival = departure + chrono::Duration::hours(2);
            conn.execute(
                "INSERT INTO flights (code, origin, destination, departure_at, arrival_at, base_fare, capacity, seats_remaining, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 'scheduled')",
                params![code, origin, destination, departure, arrival, base_fare, capacity],
            )
            .map_err(from_sqlite)?;
        }
        info!("Seeded {} demo flights", demo.len());
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS flights (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT UNIQUE NOT NULL,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            departure_at TEXT NOT NULL,
            arrival_at TEXT NOT NULL,
            base_fare TEXT NOT NULL,
            capacity INTEGER NOT NULL,
            seats_remaining INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'scheduled',
            CHECK (seats_remaining >= 0 AND seats_remaining <= capacity)
        );

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            full_name TEXT NOT NULL,
            national_id TEXT UNIQUE NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('client', 'attendant', 'pilot', 'director')),
            badge_code TEXT UNIQUE,
            email TEXT,
            phone TEXT,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS payment_methods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            max_installments INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS tickets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flight_id INTEGER NOT NULL REFERENCES flights (id),
            user_id INTEGER NOT NULL REFERENCES users (id),
            seat TEXT NOT NULL,
            cabin TEXT NOT NULL DEFAULT 'economy',
            payment_method TEXT NOT NULL,
            installments INTEGER NOT NULL DEFAULT 1,
            final_price TEXT NOT NULL,
            purchased_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'confirmed'
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_flight_cabin
            ON tickets (flight_id, cabin, status);

        CREATE TABLE IF NOT EXISTS checkins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticket_id INTEGER NOT NULL UNIQUE REFERENCES tickets (id),
            checked_in_at TEXT NOT NULL,
            bag_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'completed'
        );

        INSERT OR IGNORE INTO payment_methods (name, max_installments, active) VALUES
            ('Credit Card', 18, 1),
            ('Pix', 1, 1),
            ('Bank Slip', 10, 1);",
    )
}

fn from_sqlite(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StorageError::Duplicate
        }
        _ => StorageError::Other(e.to_string()),
    }
}

fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

const FLIGHT_COLUMNS: &str =
    "id, code, origin, destination, departure_at, arrival_at, base_fare, capacity, seats_remaining, status";

fn flight_from_row(row: &Row<'_>) -> rusqlite::Result<Flight> {
    Ok(Flight {
        id: row.get(0)?,
        code: row.get(1)?,
        origin: row.get(2)?,
        destination: row.get(3)?,
        departure_at: row.get(4)?,
        arrival_at: row.get(5)?,
        base_fare: decimal_col(row, 6)?,
        capacity: row.get(7)?,
        seats_remaining: row.get(8)?,
        status: FlightStatus::from_str_or_scheduled(&row.get::<_, String>(9)?),
    })
}

const TICKET_COLUMNS: &str =
    "id, flight_id, user_id, seat, cabin, payment_method, installments, final_price, purchased_at, status";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        flight_id: row.get(1)?,
        user_id: row.get(2)?,
        seat: row.get(3)?,
        cabin: CabinClass::from_request(&row.get::<_, String>(4)?),
        payment_method: row.get(5)?,
        installments: row.get(6)?,
        final_price: decimal_col(row, 7)?,
        purchased_at: row.get(8)?,
        status: TicketStatus::from_str_or_confirmed(&row.get::<_, String>(9)?),
    })
}

fn ticket_record_from_row(row: &Row<'_>) -> rusqlite::Result<TicketRecord> {
    let id: i64 = row.get(0)?;
    Ok(TicketRecord {
        id,
        code: crate::models::booking_code(id),
        seat: row.get(1)?,
        cabin: CabinClass::from_request(&row.get::<_, String>(2)?),
        payment_method: row.get(3)?,
        installments: row.get(4)?,
        final_price: decimal_col(row, 5)?,
        purchased_at: row.get(6)?,
        status: TicketStatus::from_str_or_confirmed(&row.get::<_, String>(7)?),
        flight_code: row.get(8)?,
        origin: row.get(9)?,
        destination: row.get(10)?,
        departure_at: row.get(11)?,
        passenger_name: row.get(12)?,
    })
}

const TICKET_RECORD_QUERY: &str = "SELECT t.id, t.seat, t.cabin, t.payment_method, t.installments,
            t.final_price, t.purchased_at, t.status,
            f.code, f.origin, f.destination, f.departure_at,
            u.full_name
     FROM tickets t
     JOIN flights f ON t.flight_id = f.id
     JOIN users u ON t.user_id = u.id";

#[async_trait::async_trait]
impl StorageBackend for SqliteBackend {
    async fn get_flight(&self, flight_id: i64) -> Result<Option<Flight>, StorageError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE id = ?1"),
            params![flight_id],
            flight_from_row,
        )
        .optional()
        .map_err(from_sqlite)
    }

    async fn list_flights(&self) -> Result<Vec<Flight>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {FLIGHT_COLUMNS} FROM flights ORDER BY departure_at"
            ))
            .map_err(from_sqlite)?;
        let flights = stmt
            .query_map([], flight_from_row)
            .map_err(from_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_sqlite)?;
        Ok(flights)
    }

    async fn insert_flight(&self, flight: NewFlight) -> Result<Flight, StorageError> {
        if flight.capacity < 0 {
            return Err(StorageError::Other("capacity must not be negative".into()));
        }
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO flights (code, origin, destination, departure_at, arrival_at, base_fare, capacity, seats_remaining, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, 'scheduled')",
            params![
                flight.code,
                flight.origin,
                flight.destination,
                flight.departure_at,
                flight.arrival_at,
                flight.base_fare.to_string(),
                flight.capacity,
            ],
        )
        .map_err(from_sqlite)?;
        let id = conn.last_insert_rowid();
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
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, full_name, national_id, role, badge_code, email, phone, active
             FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    national_id: row.get(2)?,
                    role: UserRole::from_str(&row.get::<_, String>(3)?)
                        .unwrap_or(UserRole::Client),
                    badge_code: row.get(4)?,
                    email: row.get(5)?,
                    phone: row.get(6)?,
                    active: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(from_sqlite)
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User, StorageError> {
        let national_id = user::normalize_national_id(&new_user.national_id)
            .ok_or_else(|| StorageError::Other("national ID must have 11 digits".into()))?;
        if !user::badge_code_valid(new_user.role, new_user.badge_code.as_deref()) {
            return Err(StorageError::Other(
                "badge code does not match the role format".into(),
            ));
        }

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (full_name, national_id, role, badge_code, email, phone, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![
                new_user.full_name,
                national_id,
                new_user.role.as_str(),
                new_user.badge_code,
                new_user.email,
                new_user.phone,
            ],
        )
        .map_err(from_sqlite)?;
        let id = conn.last_insert_rowid();
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
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, max_installments, active FROM payment_methods WHERE name = ?1",
            params![name],
            |row| {
                Ok(PaymentMethod {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    max_installments: row.get(2)?,
                    active: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(from_sqlite)
    }

    async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, max_installments, active FROM payment_methods
                 WHERE active = 1 ORDER BY id",
            )
            .map_err(from_sqlite)?;
        let methods = stmt
            .query_map([], |row| {
                Ok(PaymentMethod {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    max_installments: row.get(2)?,
                    active: row.get(3)?,
                })
            })
            .map_err(from_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_sqlite)?;
        Ok(methods)
    }

    async fn count_confirmed_tickets(
        &self,
        flight_id: i64,
        cabin: CabinClass,
    ) -> Result<i64, StorageError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM tickets
             WHERE flight_id = ?1 AND cabin = ?2 AND status = 'confirmed'",
            params![flight_id, cabin.as_str()],
            |r| r.get(0),
        )
        .map_err(from_sqlite)
    }

    async fn record_sale(&self, sale: NewTicket) -> Result<Ticket, StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_sqlite)?;

        // Compare-and-swap on the seat counter: losing the race means the
        // flight sold out between the availability check and now.
        let updated = tx
            .execute(
                "UPDATE flights SET seats_remaining = seats_remaining - 1
                 WHERE id = ?1 AND seats_remaining > 0",
                params![sale.flight_id],
            )
            .map_err(from_sqlite)?;
        if updated == 0 {
            let exists = tx
                .query_row(
                    "SELECT 1 FROM flights WHERE id = ?1",
                    params![sale.flight_id],
                    |_| Ok(()),
                )
                .optional()
                .map_err(from_sqlite)?
                .is_some();
            return Err(if exists {
                StorageError::SoldOut
            } else {
                StorageError::not_found("flight", sale.flight_id)
            });
        }

        let sold: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM tickets
                 WHERE flight_id = ?1 AND cabin = ?2 AND status = 'confirmed'",
                params![sale.flight_id, sale.cabin.as_str()],
                |r| r.get(0),
            )
            .map_err(from_sqlite)?;
        let seat = seating::seat_label(sale.cabin, sold);
        let purchased_at = Utc::now();

        tx.execute(
            "INSERT INTO tickets (flight_id, user_id, seat, cabin, payment_method, installments, final_price, purchased_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'confirmed')",
            params![
                sale.flight_id,
                sale.user_id,
                seat,
                sale.cabin.as_str(),
                sale.payment_method,
                sale.installments,
                sale.final_price.to_string(),
                purchased_at,
            ],
        )
        .map_err(from_sqlite)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(from_sqlite)?;

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
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
            params![ticket_id],
            ticket_from_row,
        )
        .optional()
        .map_err(from_sqlite)
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
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!("{TICKET_RECORD_QUERY} ORDER BY t.purchased_at DESC"))
            .map_err(from_sqlite)?;
        let tickets = stmt
            .query_map([], ticket_record_from_row)
            .map_err(from_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_sqlite)?;
        Ok(tickets)
    }

    async fn list_tickets_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<TicketRecord>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "{TICKET_RECORD_QUERY} WHERE t.user_id = ?1 ORDER BY t.purchased_at DESC"
            ))
            .map_err(from_sqlite)?;
        let tickets = stmt
            .query_map(params![user_id], ticket_record_from_row)
            .map_err(from_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_sqlite)?;
        Ok(tickets)
    }

    async fn cancel_ticket(&self, ticket_id: i64) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_sqlite)?;

        let flight_id: Option<i64> = tx
            .query_row(
                "SELECT flight_id FROM tickets WHERE id = ?1 AND status = 'confirmed'",
                params![ticket_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(from_sqlite)?;
        let flight_id =
            flight_id.ok_or_else(|| StorageError::not_found("ticket", ticket_id))?;

        tx.execute(
            "UPDATE tickets SET status = 'cancelled' WHERE id = ?1",
            params![ticket_id],
        )
        .map_err(from_sqlite)?;
        tx.execute(
            "UPDATE flights SET seats_remaining = seats_remaining + 1 WHERE id = ?1",
            params![flight_id],
        )
        .map_err(from_sqlite)?;
        tx.commit().map_err(from_sqlite)
    }

    async fn insert_checkin(
        &self,
        ticket_id: i64,
        bag_count: i32,
    ) -> Result<CheckIn, StorageError> {
        let conn = self.conn.lock().await;
        let checked_in_at = Utc::now();
        conn.execute(
            "INSERT INTO checkins (ticket_id, checked_in_at, bag_count, status)
             VALUES (?1, ?2, ?3, 'completed')",
            params![ticket_id, checked_in_at, bag_count],
        )
        .map_err(from_sqlite)?;
        Ok(CheckIn {
            id: conn.last_insert_rowid(),
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
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, ticket_id, checked_in_at, bag_count FROM checkins WHERE ticket_id = ?1",
            params![ticket_id],
            |row| {
                Ok(CheckIn {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    checked_in_at: row.get(2)?,
                    bag_count: row.get(3)?,
                    status: CheckInStatus::Completed,
                })
            },
        )
        .optional()
        .map_err(from_sqlite)
    }

    async fn list_checkins_for_flight(
        &self,
        flight_id: i64,
    ) -> Result<Vec<CheckInRecord>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT c.id, c.ticket_id, c.checked_in_at, c.bag_count,
                        t.seat, t.cabin, u.full_name, f.code
                 FROM checkins c
                 JOIN tickets t ON c.ticket_id = t.id
                 JOIN users u ON t.user_id = u.id
                 JOIN flights f ON t.flight_id = f.id
                 WHERE t.flight_id = ?1
                 ORDER BY t.seat",
            )
            .map_err(from_sqlite)?;
        let checkins = stmt
            .query_map(params![flight_id], |row| {
                Ok(CheckInRecord {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    checked_in_at: row.get(2)?,
                    bag_count: row.get(3)?,
                    seat: row.get(4)?,
                    cabin: CabinClass::from_request(&row.get::<_, String>(5)?),
                    passenger_name: row.get(6)?,
                    flight_code: row.get(7)?,
                })
            })
            .map_err(from_sqlite)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(from_sqlite)?;
        Ok(checkins)
    }
}
