use crate::{
    error::NotifyError,
    models::TransactionRecord,
    services::{format_sell_alert, Analytics, Notifier, SellDetector},
};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub detected: usize,
    pub notified: usize,
    pub failed: usize,
    /// Set when the sink rejected the destination; the batch stops there.
    pub fatal: Option<NotifyError>,
}

/// Runs the detector over a batch and sends one alert per first sell.
///
/// Alerts are at-most-once: a mint is marked seen before its message goes
/// out, and a failed send is logged, never retried.
pub struct SellWatcher {
    detector: SellDetector,
    notifier: Arc<dyn Notifier>,
    analytics: Arc<Analytics>,
    explorer_tx_url: String,
}

impl SellWatcher {
    pub fn new(
        detector: SellDetector,
        notifier: Arc<dyn Notifier>,
        analytics: Arc<Analytics>,
        explorer_tx_url: String,
    ) -> Self {
        Self {
            detector,
            notifier,
            analytics,
            explorer_tx_url,
        }
    }

    pub fn detector(&self) -> &SellDetector {
        &self.detector
    }

    /// An `InvalidDestination` error stops the batch and is reported in
    /// `BatchOutcome::fatal`; the caller decides how to shut down.
    pub async fn process(&self, records: &[TransactionRecord]) -> BatchOutcome {
        let events = self.detector.detect(records).await;
        self.analytics.record_detections(events.len());

        let mut outcome = BatchOutcome {
            detected: events.len(),
            ..Default::default()
        };

        for event in &events {
            let message = format_sell_alert(self.detector.wallet(), event, &self.explorer_tx_url);

            match self.notifier.notify(&message).await {
                Ok(()) => {
                    self.analytics.record_alert(true);
                    outcome.notified += 1;
                    tracing::info!("Alert sent for {} (tx: {})", event.mint, event.signature);
                }
                Err(NotifyError::TransientNetwork(reason)) => {
                    self.analytics.record_alert(false);
                    outcome.failed += 1;
                    tracing::warn!(
                        "Alert for {} not delivered: {}. Mint stays marked seen",
                        event.mint,
                        reason
                    );
                }
                Err(e @ NotifyError::InvalidDestination(_)) => {
                    self.analytics.record_alert(false);
                    outcome.failed += 1;
                    tracing::error!("Telegram rejected the destination: {}", e);
                    outcome.fatal = Some(e);
                    break;
                }
            }
        }

        outcome
    }
}
