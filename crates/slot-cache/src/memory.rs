use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{CacheError, Result, SlotCache};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process cache with lazy TTL expiry.
///
/// Expiry uses `tokio::time`, so tests can pause and advance the clock.
/// Useful for tests and single-instance deployments without Redis.
#[derive(Clone, Default)]
pub struct InMemorySlotCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySlotCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served, including failed ones.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls served, including failed ones.
    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls served, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Simulates an outage: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns true if a live entry exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .is_some_and(|e| e.expires_at > Instant::now())
    }

    /// Writes an entry directly, bypassing the outage toggle and counters.
    pub async fn seed(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("in-memory cache offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SlotCache for InMemorySlotCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a fresh value was written meanwhile.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        self.entries.write().await.remove(key);
        Ok(())
    }
}
