//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::SchedulingConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; unset keeps appointments in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `DATABASE_ACQUIRE_TIMEOUT_SECS`: wait for a pooled connection (default: `5`)
/// - `REDIS_URL`: Redis URL; unset keeps the slot cache in memory
/// - `SLOT_CACHE_TTL_SECS`: free-slot cache lifetime (default: `60`)
/// - `SLOT_CACHE_TIMEOUT_MS`: limit for the Redis connect and each cache call (default: `250`)
/// - `NOTIFICATION_QUEUE_CAPACITY`: pending notifications before dropping (default: `100`)
/// - `REALTIME_CHANNEL_CAPACITY`: realtime events buffered per subscriber (default: `256`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub slot_cache_ttl_secs: u64,
    pub slot_cache_timeout_ms: u64,
    pub notification_queue_capacity: usize,
    pub realtime_channel_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; empty URLs count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let url = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: url("DATABASE_URL"),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_acquire_timeout_secs: parse_or(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                defaults.database_acquire_timeout_secs,
            ),
            redis_url: url("REDIS_URL"),
            slot_cache_ttl_secs: parse_or(
                &lookup,
                "SLOT_CACHE_TTL_SECS",
                defaults.slot_cache_ttl_secs,
            ),
            slot_cache_timeout_ms: parse_or(
                &lookup,
                "SLOT_CACHE_TIMEOUT_MS",
                defaults.slot_cache_timeout_ms,
            ),
            notification_queue_capacity: parse_or(
                &lookup,
                "NOTIFICATION_QUEUE_CAPACITY",
                defaults.notification_queue_capacity,
            ),
            realtime_channel_capacity: parse_or(
                &lookup,
                "REALTIME_CHANNEL_CAPACITY",
                defaults.realtime_channel_capacity,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.database_acquire_timeout_secs)
    }

    pub fn slot_cache_timeout(&self) -> Duration {
        Duration::from_millis(self.slot_cache_timeout_ms)
    }

    /// Engine tunables derived from this configuration.
    pub fn scheduling(&self) -> SchedulingConfig {
        SchedulingConfig::default()
            .with_cache_ttl(Duration::from_secs(self.slot_cache_ttl_secs))
            .with_cache_timeout(self.slot_cache_timeout())
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 10,
            database_acquire_timeout_secs: 5,
            redis_url: None,
            slot_cache_ttl_secs: 60,
            slot_cache_timeout_ms: 250,
            notification_queue_capacity: 100,
            realtime_channel_capacity: 256,
        }
    }
}
