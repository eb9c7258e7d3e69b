//! Request and response types for every reservation-daemon HTTP endpoint.
//!
//! Plain `Serialize + Deserialize` structs, no business logic. Boundary
//! coercion rules (duration clamping, seat-id trimming) live in
//! `validation.rs`, not here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/initialize
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub seat_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub message: String,
    pub show_id: String,
    pub seat_count: i64,
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/hold
// ---------------------------------------------------------------------------

/// `hold_duration_seconds` accepts ints or digit-only strings (client
/// libraries that serialize numbers as strings); booleans and non-numeric
/// strings are rejected at the field level, not coerced.
#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub seat_ids: Vec<String>,
    #[serde(default)]
    pub hold_duration_seconds: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub hold_id: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub seat_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/book
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub hold_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub booking_id: String,
    pub seat_ids: Vec<String>,
    pub booked_at: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/release-hold
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReleaseHoldRequest {
    pub hold_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub holds_cleared: i64,
    pub bookings_cleared: i64,
    pub seats_reset: i64,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub shows: i64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One rejected field from boundary validation, reported so clients can
/// point at exactly what was wrong rather than parsing free text.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: &'static str,
    pub details: Vec<FieldError>,
}

/// Error body for failures surfaced by the reservation engine itself
/// (post-validation) — `ShowNotFound`, `SeatsUnavailable`, etc.
#[derive(Debug, Serialize)]
pub struct EngineErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_seats: Option<Vec<String>>,
}
