use crate::models::MintObservation;
use crate::services::TokenAgeLookup;
use async_trait::async_trait;
use moka::future::Cache;
use redis::AsyncCommands;

/// Redis hash holding `mint -> creation time`.
pub const MINT_CREATED_KEY: &str = "sell_watch:mint_created";

/// Creation times learned passively from `TOKEN_MINT` webhook events.
pub struct MintBook {
    memory: Cache<String, i64>,
    redis: Option<redis::aio::ConnectionManager>,
}

impl MintBook {
    pub fn in_memory() -> Self {
        Self {
            memory: Self::memory_cache(),
            redis: None,
        }
    }

    pub fn with_redis(redis: redis::aio::ConnectionManager) -> Self {
        Self {
            memory: Self::memory_cache(),
            redis: Some(redis),
        }
    }

    fn memory_cache() -> Cache<String, i64> {
        Cache::builder().max_capacity(100_000).build()
    }

    /// Records the first observed creation time of a mint. Later observations
    /// of the same mint are ignored.
    pub async fn record(&self, observation: &MintObservation) -> bool {
        let MintObservation { mint, created_at } = observation;

        if let Some(mut redis) = self.redis.clone() {
            match redis.hset_nx::<_, _, _, bool>(MINT_CREATED_KEY, mint, *created_at).await {
                Ok(false) => return false,
                Ok(true) => {}
                Err(e) => tracing::warn!("Redis mint book write failed for {}: {}", mint, e),
            }
        }

        let fresh = self
            .memory
            .entry(mint.clone())
            .or_insert(*created_at)
            .await
            .is_fresh();

        if fresh {
            tracing::debug!("Observed mint {} created at {}", mint, created_at);
        }
        fresh
    }

    pub async fn get(&self, mint: &str) -> Option<i64> {
        if let Some(created_at) = self.memory.get(mint).await {
            return Some(created_at);
        }

        let mut redis = self.redis.clone()?;
        match redis.hget::<_, _, Option<i64>>(MINT_CREATED_KEY, mint).await {
            Ok(Some(created_at)) => {
                self.memory.insert(mint.to_string(), created_at).await;
                Some(created_at)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Redis mint book read failed for {}: {}", mint, e);
                None
            }
        }
    }
}

#[async_trait]
impl TokenAgeLookup for MintBook {
    async fn creation_time(&self, mint: &str) -> Option<i64> {
        self.get(mint).await
    }
}
