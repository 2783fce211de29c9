use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct WebhookAck {
    pub success: bool,
    pub received: usize,
    pub rejected: usize,
    pub mints_observed: usize,
    pub alerts_sent: usize,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub store: String,
    pub persistent: bool,
    pub seen_mints: usize,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub polls_total: u64,
    pub poll_failures: u64,
    pub webhook_batches: u64,
    pub sells_detected: u64,
    pub alerts_sent: u64,
    pub alert_failures: u64,
    pub uptime_seconds: u64,
}
