use serde::{Deserialize, Serialize};

/// A first sell of `mint` by the watched wallet that warrants an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellEvent {
    pub mint: String,
    pub signature: String,
    pub timestamp: Option<i64>,
    pub amount: Option<f64>,
    pub created_at: Option<i64>,
    pub age_secs: Option<i64>,
}
