use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{CabinClass, CheckInStatus};

/// A completed check-in. At most one exists per ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: i64,
    pub ticket_id: i64,
    pub checked_in_at: DateTime<Utc>,
    pub bag_count: i32,
    pub status: CheckInStatus,
}

/// Check-in joined with seat and passenger details, for the flight manifest.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInRecord {
    pub id: i64,
    pub ticket_id: i64,
    pub checked_in_at: DateTime<Utc>,
    pub bag_count: i32,
    pub seat: String,
    pub cabin: CabinClass,
    pub passenger_name: String,
    pub flight_code: String,
}
