use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::{CacheError, Result, SlotCache, with_timeout};

/// Redis-backed slot cache.
///
/// Uses a [`ConnectionManager`], which reconnects transparently after a
/// dropped connection. Every command is bounded by `timeout`; failures and
/// elapsed limits are returned to the caller, who treats them as a miss.
#[derive(Clone)]
pub struct RedisSlotCache {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisSlotCache {
    /// Connects to Redis at `url` (for example `redis://127.0.0.1:6379`).
    ///
    /// The connection attempt and each later command give up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = with_timeout(timeout, async {
            let conn = client.get_connection_manager().await?;
            Ok::<_, CacheError>(conn)
        })
        .await?;
        debug!("Connected slot cache to Redis");
        Ok(Self { conn, timeout })
    }

    /// Wraps an existing connection manager.
    pub fn new(conn: ConnectionManager, timeout: Duration) -> Self {
        Self { conn, timeout }
    }
}

/// Redis rejects `EX 0`, so sub-second TTLs round up to one second.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl SlotCache for RedisSlotCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        with_timeout(self.timeout, async {
            let value = redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<Vec<u8>>>(&mut conn)
                .await?;
            Ok::<_, CacheError>(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(self.timeout, async {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok::<_, CacheError>(())
        })
        .await?;
        debug!(key = %key, ttl_secs = ttl_secs(ttl), "Cached slots");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(self.timeout, async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok::<_, CacheError>(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn ttl_rounds_up_to_one_second() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(60)), 60);
    }

    /// Accepts connections, reads whatever arrives and never answers.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });
        format!("redis://{addr}")
    }

    #[tokio::test]
    async fn unresponsive_server_reports_unavailable() {
        let url = silent_server().await;
        let limit = Duration::from_millis(200);

        let outcome = tokio::time::timeout(Duration::from_secs(5), async {
            let cache = RedisSlotCache::connect(&url, limit).await?;
            cache.delete("slots:x:2030-01-07").await
        })
        .await
        .expect("cache call was not bounded");

        assert!(matches!(outcome, Err(CacheError::Unavailable(_))));
    }
}
