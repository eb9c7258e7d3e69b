//! Domain types shared by `reservation-db` and `reservation-daemon`: the
//! seat/hold/booking data model, the engine's error taxonomy, and the
//! `Clock` seam used to make hold expiry deterministic in tests.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::ReservationError;

// ---------------------------------------------------------------------------
// Seat lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Held,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Held => "held",
            SeatStatus::Booked => "booked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SeatStatus::Available),
            "held" => Some(SeatStatus::Held),
            "booked" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// One row of the per-seat status array returned by `get_seat_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatDetail {
    pub seat_id: String,
    pub status: SeatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_expires_at: Option<DateTime<Utc>>,
}

/// Aggregate + per-seat view of a show, as returned by `GET /shows/{id}/seats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatStatusReport {
    pub total_seats: i64,
    pub available_seats: i64,
    pub held_seats: i64,
    pub booked_seats: i64,
    pub seats: Vec<SeatDetail>,
}

// ---------------------------------------------------------------------------
// Hold / Booking results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldResult {
    pub hold_id: String,
    pub expires_at: DateTime<Utc>,
    pub seat_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResult {
    pub booking_id: String,
    pub seat_ids: Vec<String>,
    pub booked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetReport {
    pub holds_cleared: i64,
    pub bookings_cleared: i64,
    pub seats_reset: i64,
}

/// `(show_id, seat_count)` — the success payload of `initialize_show`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    pub show_id: String,
    pub seat_count: i64,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Monotonic source of "now" in UTC, injected so hold-expiry tests don't
/// depend on wall-clock sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only advances when told to. Starts at the wall-clock
/// instant it was constructed; call `advance` to simulate elapsed time
/// without sleeping.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Mutex::new(start))
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.0.lock().expect("FixedClock mutex poisoned");
        *guard += duration;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("FixedClock mutex poisoned")
    }
}
