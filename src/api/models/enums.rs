use serde::{Deserialize, Serialize};

/// Cabin class of a ticket. Each class has its own fare multiplier and
/// seat-row numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

impl CabinClass {
    /// Parse a request-supplied class name. Unknown values fall back to
    /// economy rather than failing the purchase.
    pub fn from_request(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "business" => CabinClass::Business,
            "first" => CabinClass::First,
            _ => CabinClass::Economy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl FlightStatus {
    pub fn from_str_or_scheduled(value: &str) -> Self {
        match value {
            "completed" => FlightStatus::Completed,
            "cancelled" => FlightStatus::Cancelled,
            _ => FlightStatus::Scheduled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Completed => "completed",
            FlightStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Confirmed,
    Cancelled,
}

impl TicketStatus {
    pub fn from_str_or_confirmed(value: &str) -> Self {
        match value {
            "cancelled" => TicketStatus::Cancelled,
            _ => TicketStatus::Confirmed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Confirmed => "confirmed",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Attendant,
    Pilot,
    Director,
}

impl UserRole {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "client" => Some(UserRole::Client),
            "attendant" => Some(UserRole::Attendant),
            "pilot" => Some(UserRole::Pilot),
            "director" => Some(UserRole::Director),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Attendant => "attendant",
            UserRole::Pilot => "pilot",
            UserRole::Director => "director",
        }
    }

    /// Badge codes are prefixed with three letters identifying the role.
    /// Clients carry no badge.
    pub fn badge_prefix(&self) -> Option<&'static str> {
        match self {
            UserRole::Client => None,
            UserRole::Attendant => Some("ATT"),
            UserRole::Pilot => Some("PIL"),
            UserRole::Director => Some("DIR"),
        }
    }
}

/// Settlement channel classification derived from a payment method's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Card,
    InstantTransfer,
    BankSlip,
    Other,
}

impl PaymentKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "credit card" | "card" => PaymentKind::Card,
            "pix" | "instant transfer" => PaymentKind::InstantTransfer,
            "bank slip" | "boleto" => PaymentKind::BankSlip,
            _ => PaymentKind::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInStatus {
    Completed,
}

impl CheckInStatus {
    pub fn as_str(&self) -> &'static str {
        "completed"
    }
}
