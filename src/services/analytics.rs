use crate::models::Stats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-lifetime counters behind `/stats`.
pub struct Analytics {
    polls_total: AtomicU64,
    poll_failures: AtomicU64,
    webhook_batches: AtomicU64,
    sells_detected: AtomicU64,
    alerts_sent: AtomicU64,
    alert_failures: AtomicU64,
    start_time: Instant,
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            polls_total: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
            webhook_batches: AtomicU64::new(0),
            sells_detected: AtomicU64::new(0),
            alerts_sent: AtomicU64::new(0),
            alert_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
    
    pub fn record_poll(&self, succeeded: bool) {
        self.polls_total.fetch_add(1, Ordering::SeqCst);
        if !succeeded {
            self.poll_failures.fetch_add(1, Ordering::SeqCst);
        }
    }
    
    pub fn record_webhook_batch(&self) {
        self.webhook_batches.fetch_add(1, Ordering::SeqCst);
    }
    
    pub fn record_detections(&self, count: usize) {
        self.sells_detected.fetch_add(count as u64, Ordering::SeqCst);
    }
    
    pub fn record_alert(&self, delivered: bool) {
        if delivered {
            self.alerts_sent.fetch_add(1, Ordering::SeqCst);
        } else {
            self.alert_failures.fetch_add(1, Ordering::SeqCst);
        }
    }
    
    pub fn get_stats(&self) -> Stats {
        Stats {
            polls_total: self.polls_total.load(Ordering::SeqCst),
            poll_failures: self.poll_failures.load(Ordering::SeqCst),
            webhook_batches: self.webhook_batches.load(Ordering::SeqCst),
            sells_detected: self.sells_detected.load(Ordering::SeqCst),
            alerts_sent: self.alerts_sent.load(Ordering::SeqCst),
            alert_failures: self.alert_failures.load(Ordering::SeqCst),
            uptime_seconds: self.uptime_seconds(),
        }
    }
    
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}
