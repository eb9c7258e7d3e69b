//! reservation-daemon entry point.
//!
//! Thin by design: load config, connect the pool, spawn the reaper, wire
//! middleware, serve. All route handlers live in `routes.rs`; all shared
//! state lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use reservation_daemon::{routes, state};
use reservation_schemas::SystemClock;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience: silent if the file doesn't exist. Production injects
    // env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = reservation_config::load_from_env().context("loading configuration")?;

    let pool = reservation_db::connect(
        &config.database_url,
        config.db_pool_burst_connections(),
        Duration::from_secs(config.db_pool_recycle_secs),
    )
    .await
    .context("connecting to database")?;
    reservation_db::migrate(&pool)
        .await
        .context("running migrations")?;

    if config.seed_demo {
        seed_demo_show(&pool).await?;
    }

    let shared = Arc::new(state::AppState::new(pool.clone()));

    // Dedicated pool for the reaper so it never head-of-line blocks behind
    // request traffic (SPEC_FULL.md §5).
    let reaper_pool = reservation_db::connect(
        &config.database_url,
        2,
        Duration::from_secs(config.db_pool_recycle_secs),
    )
    .await
    .context("connecting reaper pool")?;
    let cancel = CancellationToken::new();
    let reaper_handle = state::spawn_reaper(
        reaper_pool,
        Arc::new(SystemClock),
        Duration::from_secs(config.reap_interval_secs),
        cancel.clone(),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("reservation-daemon listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    cancel.cancel();
    reaper_handle.await.context("reaper task panicked")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Optional ambient convenience, gated behind `RESERVATION_SEED_DEMO=1`: a
/// ready-to-poke demo show so a fresh checkout has something to hit without
/// a curl script.
async fn seed_demo_show(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    const DEMO_SHOW_ID: &str = "avengers_2026_7pm";
    let rows = ["A", "B", "C", "D", "E"];
    let seat_ids: Vec<String> = rows
        .iter()
        .flat_map(|row| (1..=10).map(move |n| format!("{row}{n}")))
        .collect();

    match reservation_db::initialize_show(pool, DEMO_SHOW_ID, &seat_ids).await {
        Ok(result) => {
            info!(show_id = %result.show_id, seat_count = result.seat_count, "seeded demo show");
        }
        Err(reservation_schemas::ReservationError::ShowAlreadyExists) => {
            info!(show_id = DEMO_SHOW_ID, "demo show already seeded");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
