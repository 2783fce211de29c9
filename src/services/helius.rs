use crate::{
    error::WatchError,
    models::{parse_batch, TransactionRecord},
    services::TokenAgeLookup,
};
use async_trait::async_trait;
use moka::future::Cache;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    /// Signature of the last record of the previous page.
    pub before: Option<String>,
    pub limit: Option<u32>,
    pub type_filter: Option<String>,
}

/// A page-at-a-time feed of the wallet's transactions, newest first.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_page(
        &self,
        wallet: &str,
        query: &PageQuery,
    ) -> Result<Vec<TransactionRecord>, WatchError>;
}

pub struct HeliusClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    created: Cache<String, i64>,
}

impl HeliusClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WatchError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            // Creation times never change, so hits are kept without a TTL.
            created: Cache::builder().max_capacity(10_000).build(),
        })
    }

    async fn fetch_creation_time(&self, mint: &str) -> Result<Option<i64>, WatchError> {
        let response = self
            .client
            .post(format!("{}/v0/token-metadata", self.base_url))
            .query(&[("api-key", self.api_key.as_str())])
            .json(&json!({ "mintAccounts": [mint] }))
            .send()
            .await
            .map_err(|e| WatchError::SourceUnavailable(e.without_url().to_string()))?;

        if !response.status().is_success() {
            return Err(WatchError::SourceUnavailable(format!(
                "token metadata returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| e.without_url())?;
        Ok(extract_creation_time(&body))
    }
}

fn extract_creation_time(body: &Value) -> Option<i64> {
    ["/0/onChainMetadata/mint/createdAt", "/0/creationTime"]
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(Value::as_i64)
        .filter(|t| *t > 0)
}

#[async_trait]
impl TransactionSource for HeliusClient {
    async fn fetch_page(
        &self,
        wallet: &str,
        query: &PageQuery,
    ) -> Result<Vec<TransactionRecord>, WatchError> {
        let mut params = vec![("api-key", self.api_key.clone())];
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(before) = &query.before {
            params.push(("before", before.clone()));
        }
        if let Some(kind) = &query.type_filter {
            params.push(("type", kind.clone()));
        }

        let response = self
            .client
            .get(format!("{}/v0/addresses/{}/transactions", self.base_url, wallet))
            .query(&params)
            .send()
            .await
            .map_err(|e| WatchError::SourceUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::SourceUnavailable(format!(
                "transactions endpoint returned HTTP {}",
                status
            )));
        }

        let body: Value = response.json().await.map_err(|e| e.without_url())?;
        let batch = parse_batch(body)
            .map_err(|e| WatchError::SourceUnavailable(format!("unexpected response: {}", e)))?;

        if batch.rejected > 0 {
            tracing::warn!("Skipped {} undecodable transactions from Helius", batch.rejected);
        }
        tracing::debug!(
            "Fetched {} transactions (before: {:?})",
            batch.records.len(),
            query.before
        );

        Ok(batch.records)
    }
}

#[async_trait]
impl TokenAgeLookup for HeliusClient {
    async fn creation_time(&self, mint: &str) -> Option<i64> {
        if let Some(cached) = self.created.get(mint).await {
            return Some(cached);
        }

        match self.fetch_creation_time(mint).await {
            Ok(Some(created_at)) => {
                self.created.insert(mint.to_string(), created_at).await;
                Some(created_at)
            }
            Ok(None) => {
                tracing::debug!("No creation time known for {}", mint);
                None
            }
            Err(e) => {
                tracing::warn!("Token metadata lookup failed for {}: {}", mint, e);
                None
            }
        }
    }
}
