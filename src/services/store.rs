use crate::error::WatchError;
use async_trait::async_trait;
use moka::future::Cache;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Redis hash holding `mint -> first_seen_at`.
pub const SEEN_KEY: &str = "sell_watch:seen";

/// Append-only set of mints that have already produced an alert.
#[async_trait]
pub trait SeenStore: Send + Sync {
    async fn has(&self, mint: &str) -> bool;

    /// Insert-if-absent. Returns true only for the caller whose insert created
    /// the entry; every later or concurrent call for the same mint gets false.
    async fn mark_seen(&self, mint: &str, seen_at: i64) -> bool;

    async fn count(&self) -> usize;

    fn backend(&self) -> &'static str;

    /// False when entries would not survive a restart.
    fn is_persistent(&self) -> bool;
}

pub async fn connect_redis(redis_url: &str) -> Result<redis::aio::ConnectionManager, WatchError> {
    let client = redis::Client::open(redis_url)
        .map_err(|e| WatchError::StoreFailure(format!("Redis client creation failed: {}", e)))?;
    let mut conn = client
        .get_connection_manager()
        .await
        .map_err(|e| WatchError::StoreFailure(format!("Redis connection failed: {}", e)))?;

    redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .map_err(|e| WatchError::StoreFailure(format!("Redis ping failed: {}", e)))?;

    tracing::info!("Redis connected successfully");
    Ok(conn)
}

pub struct MemorySeenStore {
    seen: Cache<String, i64>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        // No capacity or TTL: entries must never be evicted.
        Self {
            seen: Cache::builder().build(),
        }
    }

    async fn insert_if_absent(&self, mint: &str, seen_at: i64) -> bool {
        self.seen
            .entry(mint.to_string())
            .or_insert(seen_at)
            .await
            .is_fresh()
    }
}

impl Default for MemorySeenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn has(&self, mint: &str) -> bool {
        self.seen.contains_key(mint)
    }

    async fn mark_seen(&self, mint: &str, seen_at: i64) -> bool {
        self.insert_if_absent(mint, seen_at).await
    }

    async fn count(&self) -> usize {
        self.seen.run_pending_tasks().await;
        self.seen.entry_count() as usize
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Redis-backed seen set with a write-through memory mirror.
///
/// The mirror is loaded from the hash at startup and afterwards only learns a
/// mint once Redis has committed it (or reported it present). While Redis is
/// failing, claims go to the mirror and are queued; every later call retries
/// Redis, and the first success writes the queue back.
pub struct RedisSeenStore {
    redis: redis::aio::ConnectionManager,
    key: String,
    mirror: MemorySeenStore,
    degraded: AtomicBool,
    pending: Mutex<Vec<(String, i64)>>,
}

impl RedisSeenStore {
    pub async fn connect(redis_url: &str) -> Result<Self, WatchError> {
        let conn = connect_redis(redis_url).await?;
        Self::with_connection(conn, SEEN_KEY).await
    }

    pub async fn with_connection(
        mut redis: redis::aio::ConnectionManager,
        key: &str,
    ) -> Result<Self, WatchError> {
        let existing: HashMap<String, i64> = redis
            .hgetall(key)
            .await
            .map_err(|e| WatchError::StoreFailure(format!("Redis HGETALL failed: {}", e)))?;

        let mirror = MemorySeenStore::new();
        for (mint, seen_at) in &existing {
            mirror.insert_if_absent(mint, *seen_at).await;
        }

        tracing::info!("Seen store ready: {} mints already alerted", existing.len());

        Ok(Self {
            redis,
            key: key.to_string(),
            mirror,
            degraded: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
        })
    }

    fn degrade(&self, err: &redis::RedisError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::error!(
                "Redis seen store failed: {}. Continuing from the memory mirror until Redis \
                 answers again",
                err
            );
        }
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn queue(&self, mint: &str, seen_at: i64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push((mint.to_string(), seen_at));
        }
    }

    /// Called after a successful Redis round trip. Writes back the claims made
    /// while Redis was failing.
    async fn recover(&self) {
        if !self.degraded.swap(false, Ordering::SeqCst) {
            return;
        }

        let queued = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Vec::new(),
        };

        let mut redis = self.redis.clone();
        let mut flushed = 0;
        for (i, (mint, seen_at)) in queued.iter().enumerate() {
            if let Err(e) = redis.hset_nx::<_, _, _, bool>(&self.key, mint, *seen_at).await {
                for (mint, seen_at) in &queued[i..] {
                    self.queue(mint, *seen_at);
                }
                self.degrade(&e);
                return;
            }
            flushed += 1;
        }

        tracing::info!("Redis seen store recovered, wrote back {} queued mints", flushed);
    }
}

#[async_trait]
impl SeenStore for RedisSeenStore {
    async fn has(&self, mint: &str) -> bool {
        if self.mirror.has(mint).await {
            return true;
        }

        let mut redis = self.redis.clone();
        match redis.hget::<_, _, Option<i64>>(&self.key, mint).await {
            Ok(found) => {
                self.recover().await;
                if let Some(seen_at) = found {
                    self.mirror.insert_if_absent(mint, seen_at).await;
                }
                found.is_some()
            }
            Err(e) => {
                self.degrade(&e);
                false
            }
        }
    }

    async fn mark_seen(&self, mint: &str, seen_at: i64) -> bool {
        if self.mirror.has(mint).await {
            return false;
        }

        let mut redis = self.redis.clone();
        match redis.hset_nx::<_, _, _, bool>(&self.key, mint, seen_at).await {
            Ok(inserted) => {
                self.recover().await;
                self.mirror.insert_if_absent(mint, seen_at).await;
                if inserted {
                    tracing::debug!("Marked {} seen", mint);
                }
                inserted
            }
            Err(e) => {
                self.degrade(&e);
                let fresh = self.mirror.insert_if_absent(mint, seen_at).await;
                if fresh {
                    self.queue(mint, seen_at);
                }
                fresh
            }
        }
    }

    async fn count(&self) -> usize {
        if self.is_degraded() {
            return self.mirror.count().await;
        }

        let mut redis = self.redis.clone();
        match redis.hlen::<_, usize>(&self.key).await {
            Ok(n) => n,
            Err(e) => {
                self.degrade(&e);
                self.mirror.count().await
            }
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }

    fn is_persistent(&self) -> bool {
        !self.is_degraded()
    }
}
