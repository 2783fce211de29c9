use crate::{
    error::WatchError,
    handlers::AppState,
    models::{parse_batch, WebhookAck},
};
use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Push-mode entry point. Any JSON array is acknowledged with 200, whether
/// or not it held a sell or its alert could be sent; anything else is a 400
/// and leaves the store alone.
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookAck>, WatchError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| WatchError::MalformedPayload(format!("invalid JSON: {}", e)))?;
    let batch = parse_batch(payload)?;

    state.analytics.record_webhook_batch();

    let mut mints_observed = 0;
    for observation in &batch.mint_observations {
        if state.mint_book.record(observation).await {
            mints_observed += 1;
        }
    }

    let outcome = state.watcher.process(&batch.records).await;
    if let Some(e) = &outcome.fatal {
        // The batch itself was fine; only the sink is unusable.
        tracing::error!("Stopping after fatal notification error: {}", e);
        state.fatal.notify_one();
    }

    tracing::info!(
        "Webhook batch: {} transactions, {} rejected, {} mints observed, {} alerts",
        batch.records.len(),
        batch.rejected,
        mints_observed,
        outcome.notified
    );

    Ok(Json(WebhookAck {
        success: true,
        received: batch.records.len(),
        rejected: batch.rejected,
        mints_observed,
        alerts_sent: outcome.notified,
        timestamp: Utc::now(),
        request_id: Uuid::new_v4().to_string(),
    }))
}
