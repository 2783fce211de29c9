mod common;

use axum::http::StatusCode;
use common::{harness, harness_with_store, HarnessOptions, WALLET};
use sell_watch::{
    error::NotifyError,
    services::{MemorySeenStore, SeenStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const T: i64 = 1_700_000_000;

fn sell_payload(signature: &str, mint: &str, timestamp: i64) -> Value {
    json!([{
        "signature": signature,
        "timestamp": timestamp,
        "type": "SWAP",
        "tokenTransfers": [{
            "fromUserAccount": WALLET,
            "toUserAccount": "pool",
            "tokenAmount": 1000.0,
            "mint": mint
        }]
    }])
}

#[tokio::test]
async fn object_payload_is_rejected_without_store_mutation() {
    let h = harness(HarnessOptions::default());

    let payload = json!({ "events": sell_payload("s1", "MintA", T) });
    let (status, body) = h.post_webhook(payload.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "MALFORMED_PAYLOAD");
    assert_eq!(h.store.count().await, 0);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let h = harness(HarnessOptions::default());

    let (status, _) = h.post_webhook("[{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn array_without_sells_is_acknowledged() {
    let h = harness(HarnessOptions::default());

    let (status, body) = h.post_webhook("[]").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["alerts_sent"], 0);
}

#[tokio::test]
async fn redelivered_payload_alerts_once() {
    let h = harness(HarnessOptions::default());
    let payload = sell_payload("s1", "MintA", T).to_string();

    let (status, body) = h.post_webhook(payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts_sent"], 1);

    let (status, body) = h.post_webhook(payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts_sent"], 0);

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Token Mint: MintA"));
    assert!(sent[0].contains("https://solscan.io/tx/s1"));
}

#[tokio::test]
async fn concurrent_redelivery_alerts_once() {
    let h = harness(HarnessOptions::default());
    let payload = sell_payload("s1", "MintA", T).to_string();

    let (first, second) = tokio::join!(
        h.post_webhook(payload.clone()),
        h.post_webhook(payload.clone())
    );

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(h.sent().len(), 1);
    assert_eq!(h.store.count().await, 1);
}

#[tokio::test]
async fn preseeded_mint_is_not_alerted_after_restart() {
    let store = Arc::new(MemorySeenStore::new());
    assert!(store.mark_seen("X", T - 3600).await);

    let h = harness_with_store(store, HarnessOptions::default());
    let (status, body) = h.post_webhook(sell_payload("s1", "X", T).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alerts_sent"], 0);
    assert!(h.sent().is_empty());
}

#[tokio::test]
async fn observed_mint_age_drives_the_age_filter() {
    let h = harness(HarnessOptions {
        max_age_secs: Some(7200),
        ..Default::default()
    });

    let mints = json!([
        { "signature": "m1", "type": "TOKEN_MINT", "timestamp": T - 5000,
          "events": { "token": { "mint": "Young" } } },
        { "signature": "m2", "type": "TOKEN_MINT", "timestamp": T - 10_000,
          "events": { "token": { "mint": "Old" } } }
    ]);
    let (status, body) = h.post_webhook(mints.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mints_observed"], 2);

    let (_, body) = h.post_webhook(sell_payload("s1", "Young", T).to_string()).await;
    assert_eq!(body["alerts_sent"], 1);

    let (_, body) = h.post_webhook(sell_payload("s2", "Old", T).to_string()).await;
    assert_eq!(body["alerts_sent"], 0);

    // Unknown age is a skip, and the mint stays eligible.
    let (_, body) = h.post_webhook(sell_payload("s3", "Unseen", T).to_string()).await;
    assert_eq!(body["alerts_sent"], 0);
    assert!(!h.store.has("Unseen").await);

    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Sold 1h 23m after creation"));
}

#[tokio::test]
async fn invalid_destination_is_acknowledged_and_signals_shutdown() {
    let h = harness(HarnessOptions {
        fail_with: Some(NotifyError::InvalidDestination("chat not found".into())),
        ..Default::default()
    });

    let (status, body) = h.post_webhook(sell_payload("s1", "MintA", T).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["alerts_sent"], 0);

    let signalled = tokio::time::timeout(Duration::from_secs(1), h.state.fatal.notified()).await;
    assert!(signalled.is_ok());
}

#[tokio::test]
async fn webhook_route_is_absent_in_poll_mode() {
    let h = harness(HarnessOptions {
        serve_webhook: false,
        ..Default::default()
    });

    let (status, _) = h.post_webhook("[]").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
