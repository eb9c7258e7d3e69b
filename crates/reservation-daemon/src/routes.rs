//! Axum router and all HTTP handlers for reservation-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reservation_schemas::ReservationError;
use tracing::info;

use crate::{
    api_types::{
        BookRequest, BookResponse, EngineErrorResponse, HealthResponse, HoldRequest,
        HoldResponse, InitializeRequest, InitializeResponse, MessageResponse,
        ReleaseHoldRequest, ResetResponse, ValidationErrorResponse,
    },
    state::AppState,
    validation,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/shows/:show_id/initialize", post(initialize_show))
        .route("/shows/:show_id/seats", get(get_seats))
        .route("/shows/:show_id/hold", post(hold_seats))
        .route("/shows/:show_id/book", post(book_hold))
        .route("/shows/:show_id/release-hold", post(release_hold))
        .route("/reset", post(reset_all))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

impl IntoResponse for EngineErrorWrapper {
    fn into_response(self) -> Response {
        let (status, error, unavailable_seats) = match self.0 {
            ReservationError::ShowNotFound => (StatusCode::NOT_FOUND, "ShowNotFound", None),
            ReservationError::ShowAlreadyExists => {
                (StatusCode::CONFLICT, "ShowAlreadyExists", None)
            }
            ReservationError::InvalidSeatIds { .. } => {
                (StatusCode::BAD_REQUEST, "InvalidSeatIds", None)
            }
            ReservationError::SeatsUnavailable {
                ref unavailable_seats,
            } => (
                StatusCode::CONFLICT,
                "SeatsUnavailable",
                Some(unavailable_seats.clone()),
            ),
            ReservationError::HoldNotFound => (StatusCode::NOT_FOUND, "HoldNotFound", None),
            ReservationError::HoldExpired => (StatusCode::BAD_REQUEST, "HoldExpired", None),
            ReservationError::HoldInvalidated => {
                (StatusCode::BAD_REQUEST, "HoldInvalidated", None)
            }
            ReservationError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Unavailable", None)
            }
            ReservationError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal", None)
            }
        };

        let message = self.0.to_string();
        (
            status,
            Json(EngineErrorResponse {
                error: format!("{error}: {message}"),
                unavailable_seats,
            }),
        )
            .into_response()
    }
}

/// Newtype so `ReservationError` (defined in `reservation-schemas`) can get
/// an `IntoResponse` impl here without violating the orphan rule.
struct EngineErrorWrapper(ReservationError);

/// `book_hold`'s own error mapping. Per spec.md §6 the `/book` route buckets
/// every failure — including an unknown, expired, or already-consumed
/// `hold_id` — as 400, unlike `release_hold`'s `/release-hold` route, which
/// keeps `HoldNotFound` at 404. `EngineErrorWrapper` serves `release_hold`
/// unchanged; `book_hold` remaps `HoldNotFound` before falling back to it.
fn book_hold_error_response(err: ReservationError) -> Response {
    if matches!(err, ReservationError::HoldNotFound) {
        let message = err.to_string();
        return (
            StatusCode::BAD_REQUEST,
            Json(EngineErrorResponse {
                error: format!("HoldNotFound: {message}"),
                unavailable_seats: None,
            }),
        )
            .into_response();
    }
    EngineErrorWrapper(err).into_response()
}

fn validation_failed(details: Vec<crate::api_types::FieldError>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ValidationErrorResponse {
            error: "validation_failed",
            details,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> Response {
    let shows: Result<i64, sqlx::Error> = sqlx::query_scalar("select count(*) from shows")
        .fetch_one(&st.pool)
        .await;

    match shows {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "connected",
                shows: count,
            }),
        )
            .into_response(),
        Err(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "degraded",
                database: "unavailable",
                shows: 0,
            }),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/initialize
// ---------------------------------------------------------------------------

pub(crate) async fn initialize_show(
    State(st): State<Arc<AppState>>,
    Path(show_id): Path<String>,
    Json(body): Json<InitializeRequest>,
) -> Response {
    let show_id = match validation::validate_show_id(&show_id) {
        Ok(v) => v.to_string(),
        Err(e) => return validation_failed(vec![e]),
    };
    let seat_ids = match validation::validate_seat_ids(&body.seat_ids) {
        Ok(v) => v,
        Err(errors) => return validation_failed(errors),
    };

    match reservation_db::initialize_show(&st.pool, &show_id, &seat_ids).await {
        Ok(result) => {
            info!(show_id = %result.show_id, seat_count = result.seat_count, "show initialized");
            (
                StatusCode::CREATED,
                Json(InitializeResponse {
                    message: "show initialized".to_string(),
                    show_id: result.show_id,
                    seat_count: result.seat_count,
                }),
            )
                .into_response()
        }
        Err(e) => EngineErrorWrapper(e).into_response(),
    }
}

// ---------------------------------------------------------------------------
// GET /shows/{show_id}/seats
// ---------------------------------------------------------------------------

pub(crate) async fn get_seats(
    State(st): State<Arc<AppState>>,
    Path(show_id): Path<String>,
) -> Response {
    match reservation_db::get_seat_status(&st.pool, &show_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => EngineErrorWrapper(e).into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/hold
// ---------------------------------------------------------------------------

pub(crate) async fn hold_seats(
    State(st): State<Arc<AppState>>,
    Path(show_id): Path<String>,
    Json(body): Json<HoldRequest>,
) -> Response {
    let seat_ids = match validation::validate_seat_ids(&body.seat_ids) {
        Ok(v) => v,
        Err(errors) => return validation_failed(errors),
    };
    let duration_sec = match validation::clamp_duration(body.hold_duration_seconds.as_ref()) {
        Ok(v) => v,
        Err(e) => return validation_failed(vec![e]),
    };

    match reservation_db::hold_seats(&st.pool, st.clock.as_ref(), &show_id, &seat_ids, duration_sec)
        .await
    {
        Ok(hold) => {
            info!(show_id = %show_id, hold_id = %hold.hold_id, "seats held");
            (
                StatusCode::CREATED,
                Json(HoldResponse {
                    hold_id: hold.hold_id,
                    expires_at: hold.expires_at,
                    seat_ids: hold.seat_ids,
                }),
            )
                .into_response()
        }
        Err(e) => EngineErrorWrapper(e).into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/book
// ---------------------------------------------------------------------------

pub(crate) async fn book_hold(
    State(st): State<Arc<AppState>>,
    Path(show_id): Path<String>,
    Json(body): Json<BookRequest>,
) -> Response {
    let hold_id = match validation::validate_hold_id(&body.hold_id) {
        Ok(v) => v,
        Err(e) => return validation_failed(vec![e]),
    };

    match reservation_db::book_hold(&st.pool, st.clock.as_ref(), &show_id, hold_id).await {
        Ok(booking) => {
            info!(show_id = %show_id, booking_id = %booking.booking_id, "hold booked");
            (
                StatusCode::OK,
                Json(BookResponse {
                    booking_id: booking.booking_id,
                    seat_ids: booking.seat_ids,
                    booked_at: booking.booked_at,
                }),
            )
                .into_response()
        }
        Err(e) => book_hold_error_response(e),
    }
}

// ---------------------------------------------------------------------------
// POST /shows/{show_id}/release-hold
// ---------------------------------------------------------------------------

pub(crate) async fn release_hold(
    State(st): State<Arc<AppState>>,
    Path(show_id): Path<String>,
    Json(body): Json<ReleaseHoldRequest>,
) -> Response {
    let hold_id = match validation::validate_hold_id(&body.hold_id) {
        Ok(v) => v,
        Err(e) => return validation_failed(vec![e]),
    };

    match reservation_db::release_hold(&st.pool, &show_id, hold_id).await {
        Ok(()) => {
            info!(show_id = %show_id, hold_id, "hold released");
            (
                StatusCode::OK,
                Json(MessageResponse {
                    message: "hold released".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => EngineErrorWrapper(e).into_response(),
    }
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

pub(crate) async fn reset_all(State(st): State<Arc<AppState>>) -> Response {
    match reservation_db::reset_all(&st.pool).await {
        Ok(report) => {
            info!(
                holds_cleared = report.holds_cleared,
                bookings_cleared = report.bookings_cleared,
                seats_reset = report.seats_reset,
                "reservation state reset"
            );
            (
                StatusCode::OK,
                Json(ResetResponse {
                    message: "reservation state reset".to_string(),
                    holds_cleared: report.holds_cleared,
                    bookings_cleared: report.bookings_cleared,
                    seats_reset: report.seats_reset,
                }),
            )
                .into_response()
        }
        Err(e) => EngineErrorWrapper(e).into_response(),
    }
}
