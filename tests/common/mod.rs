#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sell_watch::{
    error::NotifyError,
    handlers::{router, AppState},
    services::{
        AgeFilter, Analytics, MemorySeenStore, MintBook, Notifier, SellDetector, SellWatcher,
    },
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tower::ServiceExt;

pub const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail_with: Option<NotifyError>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.to_string());
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemorySeenStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct HarnessOptions {
    pub max_age_secs: Option<i64>,
    pub serve_webhook: bool,
    pub fail_with: Option<NotifyError>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            max_age_secs: None,
            serve_webhook: true,
            fail_with: None,
        }
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    harness_with_store(Arc::new(MemorySeenStore::new()), options)
}

pub fn harness_with_store(store: Arc<MemorySeenStore>, options: HarnessOptions) -> Harness {
    let notifier = Arc::new(RecordingNotifier {
        sent: Mutex::new(Vec::new()),
        fail_with: options.fail_with,
    });
    let mint_book = Arc::new(MintBook::in_memory());
    let analytics = Arc::new(Analytics::new());

    let mut detector = SellDetector::new(WALLET, store.clone());
    if let Some(max_age_secs) = options.max_age_secs {
        detector = detector.with_age_filter(AgeFilter {
            max_age_secs,
            lookup: mint_book.clone(),
        });
    }

    let watcher = Arc::new(SellWatcher::new(
        detector,
        notifier.clone(),
        analytics.clone(),
        "https://solscan.io/tx/".into(),
    ));

    let state = AppState {
        watcher,
        mint_book,
        store: store.clone(),
        analytics,
        fatal: Arc::new(Notify::new()),
    };

    Harness {
        app: router(state.clone(), options.serve_webhook),
        state,
        store,
        notifier,
    }
}

impl Harness {
    pub fn sent(&self) -> Vec<String> {
        self.notifier.sent.lock().unwrap().clone()
    }

    pub async fn post_webhook(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        send(self.app.clone(), request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(self.app.clone(), request).await
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
