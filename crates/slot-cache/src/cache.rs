use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::UserId;

use crate::{CacheError, Result};

/// Builds the cache key for a provider's slots on one date: `slots:<provider>:<YYYY-MM-DD>`.
pub fn slot_key(provider_id: UserId, date: NaiveDate) -> String {
    format!("slots:{}:{}", provider_id, date.format("%Y-%m-%d"))
}

/// Runs a cache call, giving up after `limit`.
///
/// An elapsed limit is reported as [`CacheError::Unavailable`], so a stalled
/// backend degrades to a miss instead of blocking the caller.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Unavailable(format!(
            "no response within {}ms",
            limit.as_millis()
        ))),
    }
}

/// Byte-oriented key-value cache with per-entry TTL.
#[async_trait]
pub trait SlotCache: Send + Sync {
    /// Returns the stored bytes, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Removes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
