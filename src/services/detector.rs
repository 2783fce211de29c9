use crate::{
    models::{Direction, NormalizedTransfer, SellEvent, TransactionRecord},
    services::{SeenStore, TokenAgeLookup},
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Only tokens whose age at the time of the sale falls in `[0, max_age_secs]`
/// are reported.
pub struct AgeFilter {
    pub max_age_secs: i64,
    pub lookup: Arc<dyn TokenAgeLookup>,
}

/// Decides which outgoing transfers of the watched wallet are first sells.
///
/// Every emitted event has already been claimed in the seen store, and a
/// claim is only won by one caller, so overlapping batches that carry the
/// same mint produce a single event between them.
pub struct SellDetector {
    wallet: String,
    store: Arc<dyn SeenStore>,
    ignore_mints: HashSet<String>,
    type_filter: Option<String>,
    require_native_proceeds: bool,
    age_filter: Option<AgeFilter>,
}

impl SellDetector {
    pub fn new(wallet: impl Into<String>, store: Arc<dyn SeenStore>) -> Self {
        Self {
            wallet: wallet.into(),
            store,
            ignore_mints: HashSet::new(),
            type_filter: None,
            require_native_proceeds: false,
            age_filter: None,
        }
    }

    pub fn with_ignore_mints(mut self, mints: HashSet<String>) -> Self {
        self.ignore_mints = mints;
        self
    }

    pub fn with_type_filter(mut self, kind: Option<String>) -> Self {
        self.type_filter = kind;
        self
    }

    pub fn with_native_proceeds(mut self, required: bool) -> Self {
        self.require_native_proceeds = required;
        self
    }

    pub fn with_age_filter(mut self, filter: AgeFilter) -> Self {
        self.age_filter = Some(filter);
        self
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn store(&self) -> &Arc<dyn SeenStore> {
        &self.store
    }

    /// Outgoing transfers from the wallet, ignore-listed mints removed.
    /// Wallet comparison is exact: base58 addresses are case-sensitive.
    fn outgoing<'a>(
        &'a self,
        record: &'a TransactionRecord,
    ) -> impl Iterator<Item = NormalizedTransfer<'a>> + 'a {
        record
            .transfers
            .iter()
            .filter_map(|t| t.normalize())
            .filter(move |t| t.direction == Direction::Outgoing && t.account == self.wallet)
            .filter(move |t| !self.ignore_mints.contains(t.mint))
    }

    fn is_candidate(&self, record: &TransactionRecord) -> bool {
        if record.transfers.is_empty() {
            return false;
        }
        if let Some(kind) = &self.type_filter {
            if record.kind.as_deref() != Some(kind.as_str()) {
                return false;
            }
        }
        if self.require_native_proceeds && record.native_delta(&self.wallet) <= 0 {
            tracing::debug!("No native proceeds in {}, not a sell", record.signature);
            return false;
        }
        true
    }

    pub async fn detect(&self, records: &[TransactionRecord]) -> Vec<SellEvent> {
        let mut events = Vec::new();

        for record in records {
            if !self.is_candidate(record) {
                continue;
            }

            for transfer in self.outgoing(record) {
                let mint = transfer.mint;

                if self.store.has(mint).await {
                    tracing::debug!("Token {} already alerted, skipping", mint);
                    continue;
                }

                let (created_at, age_secs) = match &self.age_filter {
                    Some(filter) => match self.token_age(filter, mint, record.timestamp).await {
                        Some((created_at, age)) => (Some(created_at), Some(age)),
                        None => continue,
                    },
                    None => (None, None),
                };

                if !self.store.mark_seen(mint, Utc::now().timestamp()).await {
                    tracing::debug!("Token {} was claimed by another delivery", mint);
                    continue;
                }

                tracing::info!("First sell of {} in {}", mint, record.signature);
                events.push(SellEvent {
                    mint: mint.to_string(),
                    signature: record.signature.clone(),
                    timestamp: record.timestamp,
                    amount: Some(transfer.amount),
                    created_at,
                    age_secs,
                });
            }
        }

        events
    }

    async fn token_age(
        &self,
        filter: &AgeFilter,
        mint: &str,
        sold_at: Option<i64>,
    ) -> Option<(i64, i64)> {
        let Some(created_at) = filter.lookup.creation_time(mint).await else {
            tracing::debug!("Could not determine creation time for {}", mint);
            return None;
        };

        // Records without a block time are treated as happening now.
        let sold_at = sold_at.unwrap_or_else(|| Utc::now().timestamp());
        let age = sold_at - created_at;

        if age < 0 || age > filter.max_age_secs {
            tracing::debug!(
                "Token {} was {}s old at sale, outside [0, {}]",
                mint,
                age,
                filter.max_age_secs
            );
            return None;
        }

        Some((created_at, age))
    }

    /// Marks every outgoing mint in `records` as seen without emitting events.
    /// Used to absorb the wallet's history before alerting starts.
    pub async fn mark_history(&self, records: &[TransactionRecord]) -> usize {
        let now = Utc::now().timestamp();
        let mut marked = 0;

        for record in records {
            for transfer in self.outgoing(record) {
                if self.store.mark_seen(transfer.mint, now).await {
                    marked += 1;
                }
            }
        }

        marked
    }
}
