//! Error taxonomy for reservation engine operations.
//!
//! Kept as a typed enum (rather than `anyhow::Error` all the way through)
//! because the HTTP adapter needs to match on variant, not message text, to
//! choose a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("show not found")]
    ShowNotFound,

    #[error("show already exists")]
    ShowAlreadyExists,

    #[error("invalid seat ids: {reason}")]
    InvalidSeatIds { reason: String },

    #[error("seats unavailable: {unavailable_seats:?}")]
    SeatsUnavailable { unavailable_seats: Vec<String> },

    #[error("hold not found")]
    HoldNotFound,

    #[error("hold expired")]
    HoldExpired,

    #[error("hold invalidated")]
    HoldInvalidated,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ReservationError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // unique_violation on shows.show_id
            if db_err.code().as_deref() == Some("23505") {
                return ReservationError::ShowAlreadyExists;
            }
        }
        if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
            return ReservationError::Unavailable(err.to_string());
        }
        ReservationError::Internal(err.to_string())
    }
}
