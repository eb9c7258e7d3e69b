//! Environment-driven configuration, loaded once at daemon startup.
//!
//! A typed config struct built by a single `Context`-wrapped loader
//! function, rather than scattering `std::env::var` calls across
//! `main.rs` and `routes.rs`.

use anyhow::{Context, Result};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_REAP_INTERVAL_SECS: &str = "RESERVATION_REAP_INTERVAL_SECS";
pub const ENV_DB_POOL_SIZE: &str = "RESERVATION_DB_POOL_SIZE";
pub const ENV_DB_POOL_OVERFLOW: &str = "RESERVATION_DB_POOL_OVERFLOW";
pub const ENV_DB_POOL_RECYCLE_SECS: &str = "RESERVATION_DB_POOL_RECYCLE_SECS";
pub const ENV_SEED_DEMO: &str = "RESERVATION_SEED_DEMO";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub reap_interval_secs: u64,
    pub db_pool_max_connections: u32,
    pub db_pool_overflow: u32,
    pub db_pool_recycle_secs: u64,
    pub seed_demo: bool,
}

impl AppConfig {
    /// Total connections the request-serving pool may open at burst
    /// (base size + overflow), matching `PgPoolOptions::max_connections`.
    pub fn db_pool_burst_connections(&self) -> u32 {
        self.db_pool_max_connections + self.db_pool_overflow
    }
}

/// Load configuration from process environment, applying the same defaults
/// documented in SPEC_FULL.md §6.
pub fn load_from_env() -> Result<AppConfig> {
    let database_url = std::env::var(ENV_DATABASE_URL)
        .with_context(|| format!("missing required env var {ENV_DATABASE_URL}"))?;

    let port = env_or_default(ENV_PORT, 5000u16)?;
    let reap_interval_secs = env_or_default(ENV_REAP_INTERVAL_SECS, 10u64)?;
    let db_pool_max_connections = env_or_default(ENV_DB_POOL_SIZE, 20u32)?;
    let db_pool_overflow = env_or_default(ENV_DB_POOL_OVERFLOW, 40u32)?;
    let db_pool_recycle_secs = env_or_default(ENV_DB_POOL_RECYCLE_SECS, 3600u64)?;

    let seed_demo = std::env::var(ENV_SEED_DEMO)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if !(1..=60).contains(&reap_interval_secs) {
        anyhow::bail!(
            "{ENV_REAP_INTERVAL_SECS} must be within [1, 60] seconds, got {reap_interval_secs}"
        );
    }

    Ok(AppConfig {
        database_url,
        port,
        reap_interval_secs,
        db_pool_max_connections,
        db_pool_overflow,
        db_pool_recycle_secs,
        seed_demo,
    })
}

fn env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_default_falls_back_when_unset() {
        std::env::remove_var("RESERVATION_TEST_UNSET_VAR");
        let v: u16 = env_or_default("RESERVATION_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn env_or_default_parses_when_set() {
        std::env::set_var("RESERVATION_TEST_SET_VAR", "7");
        let v: u32 = env_or_default("RESERVATION_TEST_SET_VAR", 1).unwrap();
        assert_eq!(v, 7);
        std::env::remove_var("RESERVATION_TEST_SET_VAR");
    }

    #[test]
    fn env_or_default_rejects_garbage() {
        std::env::set_var("RESERVATION_TEST_BAD_VAR", "not-a-number");
        let result: Result<u32> = env_or_default("RESERVATION_TEST_BAD_VAR", 1);
        assert!(result.is_err());
        std::env::remove_var("RESERVATION_TEST_BAD_VAR");
    }
}
