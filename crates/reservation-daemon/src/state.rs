//! Shared runtime state for reservation-daemon.
//!
//! Handlers receive `State<Arc<AppState>>`; this module owns nothing async
//! itself beyond the reaper task it spawns.

use std::sync::Arc;
use std::time::Duration;

use reservation_schemas::{Clock, SystemClock};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub clock: Arc<dyn Clock>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
            build: BuildInfo {
                service: "reservation-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}

/// Spawn the expiry reaper on its own dedicated pool and clock handle so
/// it never head-of-line blocks behind request traffic (SPEC_FULL.md §5).
/// Ticks on `interval` until `cancel` fires; an in-flight tick always
/// finishes before the task exits.
pub fn spawn_reaper(
    reaper_pool: PgPool,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("reaper received shutdown signal, exiting");
                    break;
                }
                _ = ticker.tick() => {
                    match reservation_db::reap_expired_holds(&reaper_pool, clock.as_ref()).await {
                        Ok(reclaimed) if reclaimed > 0 => {
                            info!(reclaimed, "reaper reclaimed expired holds");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            // Transient Store errors must not crash the process — log and
                            // retry on the next tick.
                            warn!(error = %e, "reaper tick failed, will retry next tick");
                        }
                    }
                }
            }
        }
    })
}
