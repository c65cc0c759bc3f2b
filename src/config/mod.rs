//! Configuration module for the Warrantree backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use crate::warranty::DEFAULT_EXPIRY_WINDOW_DAYS;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
const EXPIRY_WINDOW_DAYS_RANGE: RangeInclusive<i64> = 0..=3650;
const SESSION_TTL_HOURS_RANGE: RangeInclusive<i64> = 1..=24 * 365;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Days before expiry during which an item counts as expiring soon
    pub expiry_window_days: i64,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    /// Create the demo user, vault and items on startup
    pub seed_demo: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("WARRANTREE_DB_PATH")
            .unwrap_or_else(|_| "./data/warrantree.sqlite".to_string())
            .into();

        let bind_addr = env::var("WARRANTREE_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .unwrap_or_else(|_| {
                tracing::warn!("Invalid WARRANTREE_BIND_ADDR, using {}", DEFAULT_BIND_ADDR);
                SocketAddr::from(([127, 0, 0, 1], 8080))
            });

        let log_level = env::var("WARRANTREE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let expiry_window_days = bounded_number(
            "WARRANTREE_EXPIRY_WINDOW_DAYS",
            env::var("WARRANTREE_EXPIRY_WINDOW_DAYS").ok(),
            EXPIRY_WINDOW_DAYS_RANGE,
            DEFAULT_EXPIRY_WINDOW_DAYS,
        );

        let session_ttl_hours = bounded_number(
            "WARRANTREE_SESSION_TTL_HOURS",
            env::var("WARRANTREE_SESSION_TTL_HOURS").ok(),
            SESSION_TTL_HOURS_RANGE,
            DEFAULT_SESSION_TTL_HOURS,
        );

        let seed_demo = env::var("WARRANTREE_SEED_DEMO")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            db_path,
            bind_addr,
            log_level,
            expiry_window_days,
            session_ttl_hours,
            seed_demo,
        }
    }
}

/// Parse a numeric setting. Unset or invalid values fall back to `default`.
fn bounded_number(key: &str, raw: Option<String>, range: RangeInclusive<i64>, default: i64) -> i64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if range.contains(&value) => value,
        _ => {
            tracing::warn!(
                "Invalid {} {:?} (expected {}..={}), using {}",
                key,
                raw,
                range.start(),
                range.end(),
                default
            );
            default
        }
    }
}
