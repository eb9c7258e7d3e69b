//! Store + Reservation Engine over Postgres.
//!
//! Every public function here is a single transaction: begin, acquire row
//! locks in ascending `seat_id` order (Hold row first when a hold is also
//! locked, per the outer-to-inner hierarchy), mutate, commit. Nothing here
//! holds state across calls; correctness comes entirely from Postgres row
//! locks, not from anything in this process.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reservation_schemas::{
    BookingResult, Clock, HoldResult, InitializeResult, ReservationError, ResetReport, SeatDetail,
    SeatStatus, SeatStatusReport,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

pub const ENV_DB_URL: &str = "DATABASE_URL";

/// Connect to Postgres with the pool shape SPEC_FULL.md §5 calls for
/// (bounded overflow, hourly recycle) instead of sqlx's defaults.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    recycle: Duration,
) -> Result<PgPool, ReservationError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .max_lifetime(recycle)
        .connect(database_url)
        .await
        .map_err(ReservationError::from)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), ReservationError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ReservationError::Internal(format!("migrate failed: {e}")))
}

/// Test helper: connect using `DATABASE_URL` and ensure migrations are applied.
pub async fn testkit_db_pool() -> Result<PgPool, ReservationError> {
    let url = std::env::var(ENV_DB_URL)
        .map_err(|_| ReservationError::Internal(format!("missing env var {ENV_DB_URL}")))?;
    let pool = connect(&url, 5, Duration::from_secs(3600)).await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Run `fut` with a deadline; an elapsed deadline maps to `Unavailable`
/// rather than panicking or hanging the caller. Operations don't thread a
/// deadline parameter through every signature — the HTTP adapter wraps the
/// call site instead, matching SPEC_FULL.md §5's "propagated to the Store"
/// requirement without bloating every function below.
pub async fn with_deadline<F, T>(deadline: Duration, fut: F) -> Result<T, ReservationError>
where
    F: std::future::Future<Output = Result<T, ReservationError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ReservationError::Unavailable(
            "operation exceeded deadline".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Validation shared by initialize_show / hold_seats
// ---------------------------------------------------------------------------

fn ensure_distinct_nonempty(label: &str, seat_ids: &[String]) -> Result<(), ReservationError> {
    if seat_ids.is_empty() {
        return Err(ReservationError::InvalidSeatIds {
            reason: format!("{label} must be a non-empty list"),
        });
    }
    let mut seen = HashSet::with_capacity(seat_ids.len());
    for seat_id in seat_ids {
        if seat_id.is_empty() {
            return Err(ReservationError::InvalidSeatIds {
                reason: format!("{label} must not contain empty strings"),
            });
        }
        if !seen.insert(seat_id.as_str()) {
            return Err(ReservationError::InvalidSeatIds {
                reason: format!("{label} contains duplicate seat_id {seat_id:?}"),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// initialize_show
// ---------------------------------------------------------------------------

pub async fn initialize_show(
    pool: &PgPool,
    show_id: &str,
    seat_ids: &[String],
) -> Result<InitializeResult, ReservationError> {
    if show_id.is_empty() {
        return Err(ReservationError::InvalidSeatIds {
            reason: "show_id must not be empty".to_string(),
        });
    }
    ensure_distinct_nonempty("seat_ids", seat_ids)?;

    let mut tx = pool.begin().await?;

    let inserted: Option<(String,)> = sqlx::query_as(
        "insert into shows (show_id) values ($1) on conflict do nothing returning show_id",
    )
    .bind(show_id)
    .fetch_optional(&mut *tx)
    .await?;

    if inserted.is_none() {
        // Transaction rolls back on drop; nothing to undo.
        return Err(ReservationError::ShowAlreadyExists);
    }

    for seat_id in seat_ids {
        sqlx::query(
            "insert into seats (show_id, seat_id, status) values ($1, $2, 'available')",
        )
        .bind(show_id)
        .bind(seat_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(InitializeResult {
        show_id: show_id.to_string(),
        seat_count: seat_ids.len() as i64,
    })
}

// ---------------------------------------------------------------------------
// hold_seats
// ---------------------------------------------------------------------------

struct LockedSeatRow {
    seat_id: String,
    status: String,
    hold_id: Option<Uuid>,
}

async fn lock_seats_ascending(
    tx: &mut Transaction<'_, Postgres>,
    show_id: &str,
    seat_ids: &[String],
) -> Result<Vec<LockedSeatRow>, ReservationError> {
    let rows = sqlx::query(
        "select seat_id, status, hold_id from seats \
         where show_id = $1 and seat_id = any($2) \
         order by seat_id for update",
    )
    .bind(show_id)
    .bind(seat_ids)
    .fetch_all(&mut **tx)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(LockedSeatRow {
            seat_id: row.try_get("seat_id")?,
            status: row.try_get("status")?,
            hold_id: row.try_get("hold_id")?,
        });
    }
    Ok(out)
}

pub async fn hold_seats(
    pool: &PgPool,
    clock: &dyn Clock,
    show_id: &str,
    seat_ids: &[String],
    duration_sec: i64,
) -> Result<HoldResult, ReservationError> {
    let mut tx = pool.begin().await?;

    // Show existence is checked before seat_ids validity, matching the
    // precondition order in spec.md §4.3.2.
    let show_exists: bool =
        sqlx::query_scalar("select exists(select 1 from shows where show_id = $1)")
            .bind(show_id)
            .fetch_one(&mut *tx)
            .await?;
    if !show_exists {
        return Err(ReservationError::ShowNotFound);
    }

    ensure_distinct_nonempty("seat_ids", seat_ids)?;

    let locked = lock_seats_ascending(&mut tx, show_id, seat_ids).await?;
    if locked.len() != seat_ids.len() {
        return Err(ReservationError::InvalidSeatIds {
            reason: "one or more seat_ids are unknown to this show".to_string(),
        });
    }

    let unavailable: Vec<String> = locked
        .iter()
        .filter(|s| s.status != "available")
        .map(|s| s.seat_id.clone())
        .collect();
    if !unavailable.is_empty() {
        return Err(ReservationError::SeatsUnavailable {
            unavailable_seats: unavailable,
        });
    }

    let hold_id = Uuid::new_v4();
    let expires_at = clock.now() + chrono::Duration::seconds(duration_sec);

    sqlx::query(
        "insert into holds (hold_id, show_id, seat_ids, expires_at) values ($1, $2, $3, $4)",
    )
    .bind(hold_id)
    .bind(show_id)
    .bind(seat_ids)
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "update seats set status = 'held', hold_id = $1, hold_expires_at = $2 \
         where show_id = $3 and seat_id = any($4)",
    )
    .bind(hold_id)
    .bind(expires_at)
    .bind(show_id)
    .bind(seat_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HoldResult {
        hold_id: hold_id.to_string(),
        expires_at,
        seat_ids: seat_ids.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// book_hold (idempotent)
// ---------------------------------------------------------------------------

struct HoldRow {
    hold_id: Uuid,
    seat_ids: Vec<String>,
    expires_at: DateTime<Utc>,
}

pub async fn book_hold(
    pool: &PgPool,
    clock: &dyn Clock,
    show_id: &str,
    hold_id: &str,
) -> Result<BookingResult, ReservationError> {
    let Ok(hold_uuid) = hold_id.parse::<Uuid>() else {
        return Err(ReservationError::HoldNotFound);
    };

    let mut tx = pool.begin().await?;

    let hold_row = sqlx::query(
        "select hold_id, seat_ids, expires_at from holds \
         where hold_id = $1 and show_id = $2 for update",
    )
    .bind(hold_uuid)
    .bind(show_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = hold_row else {
        // No live hold — check whether this is a retried confirmation of a
        // booking we already made (booking_id == hold_id by contract).
        let existing = sqlx::query(
            "select booking_id, seat_ids, booked_at from bookings \
             where booking_id = $1 and show_id = $2",
        )
        .bind(hold_uuid)
        .bind(show_id)
        .fetch_optional(&mut *tx)
        .await?;

        return match existing {
            Some(row) => {
                let booking_id: Uuid = row.try_get("booking_id")?;
                let seat_ids: Vec<String> = row.try_get("seat_ids")?;
                let booked_at: DateTime<Utc> = row.try_get("booked_at")?;
                Ok(BookingResult {
                    booking_id: booking_id.to_string(),
                    seat_ids,
                    booked_at,
                })
            }
            None => Err(ReservationError::HoldNotFound),
        };
    };

    let hold = HoldRow {
        hold_id: row.try_get("hold_id")?,
        seat_ids: row.try_get("seat_ids")?,
        expires_at: row.try_get("expires_at")?,
    };

    if hold.expires_at <= clock.now() {
        cleanup_hold_in_tx(&mut tx, hold.hold_id, show_id, &hold.seat_ids).await?;
        tx.commit().await?;
        return Err(ReservationError::HoldExpired);
    }

    let locked = lock_seats_ascending(&mut tx, show_id, &hold.seat_ids).await?;
    let all_match = locked.len() == hold.seat_ids.len()
        && locked
            .iter()
            .all(|s| s.status == "held" && s.hold_id == Some(hold.hold_id));
    if !all_match {
        return Err(ReservationError::HoldInvalidated);
    }

    let booked_at = clock.now();

    sqlx::query(
        "insert into bookings (booking_id, show_id, seat_ids, booked_at) values ($1, $2, $3, $4)",
    )
    .bind(hold.hold_id)
    .bind(show_id)
    .bind(&hold.seat_ids)
    .bind(booked_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "update seats set status = 'booked', hold_id = null, hold_expires_at = null \
         where show_id = $1 and seat_id = any($2)",
    )
    .bind(show_id)
    .bind(&hold.seat_ids)
    .execute(&mut *tx)
    .await?;

    sqlx::query("delete from holds where hold_id = $1")
        .bind(hold.hold_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(BookingResult {
        booking_id: hold.hold_id.to_string(),
        seat_ids: hold.seat_ids,
        booked_at,
    })
}

// ---------------------------------------------------------------------------
// release_hold
// ---------------------------------------------------------------------------

pub async fn release_hold(
    pool: &PgPool,
    show_id: &str,
    hold_id: &str,
) -> Result<(), ReservationError> {
    let Ok(hold_uuid) = hold_id.parse::<Uuid>() else {
        return Err(ReservationError::HoldNotFound);
    };

    let mut tx = pool.begin().await?;

    let row = sqlx::query("select hold_id, seat_ids from holds where hold_id = $1 and show_id = $2 for update")
        .bind(hold_uuid)
        .bind(show_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        return Err(ReservationError::HoldNotFound);
    };

    let hold_id: Uuid = row.try_get("hold_id")?;
    let seat_ids: Vec<String> = row.try_get("seat_ids")?;

    cleanup_hold_in_tx(&mut tx, hold_id, show_id, &seat_ids).await?;
    tx.commit().await?;
    Ok(())
}

/// Return a hold's seats to `available` and delete the hold row, within the
/// caller's ambient transaction. The `hold_id` guard on the UPDATE protects
/// against a hold whose seats were already reclaimed by a concurrent
/// cleanup — impossible under this engine's lock order, but cheap to keep
/// correct if that ever changes.
async fn cleanup_hold_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    hold_id: Uuid,
    show_id: &str,
    seat_ids: &[String],
) -> Result<(), ReservationError> {
    sqlx::query(
        "update seats set status = 'available', hold_id = null, hold_expires_at = null \
         where show_id = $1 and seat_id = any($2) and hold_id = $3",
    )
    .bind(show_id)
    .bind(seat_ids)
    .bind(hold_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query("delete from holds where hold_id = $1")
        .bind(hold_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// get_seat_status (read-only, no locks)
// ---------------------------------------------------------------------------

pub async fn get_seat_status(
    pool: &PgPool,
    show_id: &str,
) -> Result<SeatStatusReport, ReservationError> {
    let show_exists: bool =
        sqlx::query_scalar("select exists(select 1 from shows where show_id = $1)")
            .bind(show_id)
            .fetch_one(pool)
            .await?;
    if !show_exists {
        return Err(ReservationError::ShowNotFound);
    }

    let rows = sqlx::query(
        "select seat_id, status, hold_expires_at from seats \
         where show_id = $1 order by seat_id",
    )
    .bind(show_id)
    .fetch_all(pool)
    .await?;

    let mut seats = Vec::with_capacity(rows.len());
    let (mut available, mut held, mut booked) = (0i64, 0i64, 0i64);
    for row in rows {
        let status_str: String = row.try_get("status")?;
        let status = SeatStatus::parse(&status_str)
            .ok_or_else(|| ReservationError::Internal(format!("unknown seat status {status_str}")))?;
        match status {
            SeatStatus::Available => available += 1,
            SeatStatus::Held => held += 1,
            SeatStatus::Booked => booked += 1,
        }
        seats.push(SeatDetail {
            seat_id: row.try_get("seat_id")?,
            status,
            hold_expires_at: row.try_get("hold_expires_at")?,
        });
    }

    Ok(SeatStatusReport {
        total_seats: available + held + booked,
        available_seats: available,
        held_seats: held,
        booked_seats: booked,
        seats,
    })
}

// ---------------------------------------------------------------------------
// reset_all
// ---------------------------------------------------------------------------

pub async fn reset_all(pool: &PgPool) -> Result<ResetReport, ReservationError> {
    let mut tx = pool.begin().await?;

    let holds_cleared = sqlx::query("delete from holds")
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

    let bookings_cleared = sqlx::query("delete from bookings")
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

    // No WHERE filter: `seats_reset` counts every seat row, available or
    // not, matching the original's unfiltered bulk update.
    let seats_reset = sqlx::query(
        "update seats set status = 'available', hold_id = null, hold_expires_at = null",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected() as i64;

    tx.commit().await?;

    Ok(ResetReport {
        holds_cleared,
        bookings_cleared,
        seats_reset,
    })
}

// ---------------------------------------------------------------------------
// Expiry reaper — one tick
// ---------------------------------------------------------------------------

/// Reclaim every hold whose deadline has passed, in `hold_id` order (stable
/// lock order across ticks). Returns the number of holds reclaimed.
pub async fn reap_expired_holds(
    pool: &PgPool,
    clock: &dyn Clock,
) -> Result<usize, ReservationError> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "select hold_id, show_id, seat_ids from holds \
         where expires_at <= $1 order by hold_id for update",
    )
    .bind(clock.now())
    .fetch_all(&mut *tx)
    .await?;

    let mut reclaimed = 0usize;
    for row in rows {
        let hold_id: Uuid = row.try_get("hold_id")?;
        let show_id: String = row.try_get("show_id")?;
        let seat_ids: Vec<String> = row.try_get("seat_ids")?;
        cleanup_hold_in_tx(&mut tx, hold_id, &show_id, &seat_ids).await?;
        reclaimed += 1;
    }

    tx.commit().await?;
    Ok(reclaimed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_distinct_nonempty_rejects_empty_list() {
        let err = ensure_distinct_nonempty("seat_ids", &[]).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSeatIds { .. }));
    }

    #[test]
    fn ensure_distinct_nonempty_rejects_duplicates() {
        let seats = vec!["A1".to_string(), "A1".to_string()];
        let err = ensure_distinct_nonempty("seat_ids", &seats).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSeatIds { .. }));
    }

    #[test]
    fn ensure_distinct_nonempty_rejects_empty_string_entries() {
        let seats = vec!["A1".to_string(), String::new()];
        let err = ensure_distinct_nonempty("seat_ids", &seats).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidSeatIds { .. }));
    }

    #[test]
    fn ensure_distinct_nonempty_accepts_valid_list() {
        let seats = vec!["A1".to_string(), "A2".to_string()];
        assert!(ensure_distinct_nonempty("seat_ids", &seats).is_ok());
    }
}
