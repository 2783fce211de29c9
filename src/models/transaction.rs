use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the sign of a transfer's amount is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferShape {
    /// Transfer-list entry: a positive amount left `from_account`.
    Transfer,
    /// Balance-change entry for `from_account`: negative means tokens left it.
    BalanceDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub mint: String,
    pub from_account: String,
    pub to_account: Option<String>,
    pub raw_amount: f64,
    pub decimals: u8,
    pub shape: TransferShape,
}

/// A transfer reduced to `(mint, account, direction)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTransfer<'a> {
    pub mint: &'a str,
    pub account: &'a str,
    pub direction: Direction,
    pub amount: f64,
}

impl TokenTransfer {
    pub fn normalize(&self) -> Option<NormalizedTransfer<'_>> {
        let direction = match self.shape {
            TransferShape::Transfer if self.raw_amount > 0.0 => Direction::Outgoing,
            TransferShape::BalanceDelta if self.raw_amount < 0.0 => Direction::Outgoing,
            TransferShape::BalanceDelta if self.raw_amount > 0.0 => Direction::Incoming,
            _ => return None,
        };

        Some(NormalizedTransfer {
            mint: &self.mint,
            account: &self.from_account,
            direction,
            amount: self.ui_amount().abs(),
        })
    }

    pub fn ui_amount(&self) -> f64 {
        self.raw_amount / 10f64.powi(self.decimals as i32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeBalanceChange {
    pub account: String,
    pub lamports: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub timestamp: Option<i64>,
    pub kind: Option<String>,
    pub transfers: Vec<TokenTransfer>,
    pub native_balance_changes: Vec<NativeBalanceChange>,
}

impl TransactionRecord {
    /// Net lamport change of `account` within this transaction.
    pub fn native_delta(&self, account: &str) -> i64 {
        self.native_balance_changes
            .iter()
            .filter(|c| c.account == account)
            .map(|c| c.lamports)
            .sum()
    }
}

/// Creation time of a mint learned from a `TOKEN_MINT` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintObservation {
    pub mint: String,
    pub created_at: i64,
}

/// A decoded inbound or polled page of enhanced transactions.
#[derive(Debug, Default)]
pub struct Batch {
    pub records: Vec<TransactionRecord>,
    pub mint_observations: Vec<MintObservation>,
    pub rejected: usize,
}

// Helius enhanced-transaction wire shapes. Every collection is optional since
// the provider sends `null` as often as it omits a field.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnhancedTransaction {
    signature: String,
    #[serde(default, alias = "blockTime")]
    timestamp: Option<i64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    token_transfers: Option<Vec<RawTokenTransfer>>,
    #[serde(default)]
    account_data: Option<Vec<RawAccountData>>,
    #[serde(default)]
    events: Option<RawEvents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenTransfer {
    #[serde(default)]
    from_user_account: Option<String>,
    #[serde(default)]
    to_user_account: Option<String>,
    #[serde(default)]
    token_amount: f64,
    mint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAccountData {
    account: String,
    #[serde(default)]
    native_balance_change: Option<i64>,
    #[serde(default)]
    token_balance_changes: Option<Vec<RawTokenBalanceChange>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenBalanceChange {
    user_account: String,
    mint: String,
    raw_token_amount: RawTokenAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenAmount {
    token_amount: String,
    #[serde(default)]
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvents {
    #[serde(default)]
    swap: Option<RawSwapEvent>,
    #[serde(default)]
    token: Option<RawTokenEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSwapEvent {
    #[serde(default)]
    token_inputs: Option<Vec<RawSwapTokenAmount>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSwapTokenAmount {
    user_account: String,
    mint: String,
    raw_token_amount: RawTokenAmount,
}

#[derive(Debug, Deserialize)]
struct RawTokenEvent {
    #[serde(default)]
    mint: Option<String>,
}

impl EnhancedTransaction {
    fn mint_observation(&self) -> Option<MintObservation> {
        if self.kind.as_deref() != Some("TOKEN_MINT") {
            return None;
        }
        let created_at = self.timestamp?;

        let from_event = self
            .events
            .as_ref()
            .and_then(|e| e.token.as_ref())
            .and_then(|t| t.mint.clone());
        let mint = from_event.or_else(|| {
            self.token_transfers
                .as_ref()
                .and_then(|transfers| transfers.first())
                .map(|t| t.mint.clone())
        })?;

        Some(MintObservation { mint, created_at })
    }

    fn into_record(self) -> TransactionRecord {
        let mut transfers = Vec::new();
        let mut native_balance_changes = Vec::new();

        for t in self.token_transfers.unwrap_or_default() {
            transfers.push(TokenTransfer {
                mint: t.mint,
                from_account: t.from_user_account.unwrap_or_default(),
                to_account: t.to_user_account.filter(|a| !a.is_empty()),
                raw_amount: t.token_amount,
                decimals: 0,
                shape: TransferShape::Transfer,
            });
        }

        for account in self.account_data.unwrap_or_default() {
            if let Some(lamports) = account.native_balance_change {
                native_balance_changes.push(NativeBalanceChange {
                    account: account.account.clone(),
                    lamports,
                });
            }
            for change in account.token_balance_changes.unwrap_or_default() {
                let Some(raw_amount) = parse_amount(&change.raw_token_amount.token_amount) else {
                    continue;
                };
                transfers.push(TokenTransfer {
                    mint: change.mint,
                    from_account: change.user_account,
                    to_account: None,
                    raw_amount,
                    decimals: change.raw_token_amount.decimals,
                    shape: TransferShape::BalanceDelta,
                });
            }
        }

        let swap_inputs = self
            .events
            .and_then(|e| e.swap)
            .and_then(|s| s.token_inputs)
            .unwrap_or_default();
        for input in swap_inputs {
            let Some(raw_amount) = parse_amount(&input.raw_token_amount.token_amount) else {
                continue;
            };
            transfers.push(TokenTransfer {
                mint: input.mint,
                from_account: input.user_account,
                to_account: None,
                raw_amount,
                decimals: input.raw_token_amount.decimals,
                shape: TransferShape::Transfer,
            });
        }

        TransactionRecord {
            signature: self.signature,
            timestamp: self.timestamp,
            kind: self.kind,
            transfers,
            native_balance_changes,
        }
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decodes a JSON array of enhanced transactions. Anything other than an
/// array is rejected; individual entries that do not decode are counted and
/// skipped.
pub fn parse_batch(payload: Value) -> Result<Batch, WatchError> {
    let Value::Array(entries) = payload else {
        return Err(WatchError::MalformedPayload(format!(
            "expected an array of transactions, got {}",
            json_kind(&payload)
        )));
    };

    let mut batch = Batch::default();
    for entry in entries {
        match serde_json::from_value::<EnhancedTransaction>(entry) {
            Ok(tx) if !tx.signature.is_empty() => {
                if let Some(observation) = tx.mint_observation() {
                    batch.mint_observations.push(observation);
                }
                batch.records.push(tx.into_record());
            }
            Ok(_) => batch.rejected += 1,
            Err(e) => {
                tracing::debug!("Skipping undecodable transaction: {}", e);
                batch.rejected += 1;
            }
        }
    }

    Ok(batch)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
