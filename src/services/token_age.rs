use async_trait::async_trait;
use std::sync::Arc;

/// Resolves the creation time (unix seconds) of a mint. `None` covers both
/// "unknown" and "lookup failed"; callers treat either as a skip.
#[async_trait]
pub trait TokenAgeLookup: Send + Sync {
    async fn creation_time(&self, mint: &str) -> Option<i64>;
}

/// Tries each lookup in order and returns the first hit.
pub struct AgeResolver {
    sources: Vec<Arc<dyn TokenAgeLookup>>,
}

impl AgeResolver {
    pub fn new(sources: Vec<Arc<dyn TokenAgeLookup>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenAgeLookup for AgeResolver {
    async fn creation_time(&self, mint: &str) -> Option<i64> {
        for source in &self.sources {
            if let Some(created_at) = source.creation_time(mint).await {
                return Some(created_at);
            }
        }
        None
    }
}
