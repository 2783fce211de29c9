pub mod health;
pub mod stats;
pub mod webhook;

pub use health::*;
pub use stats::*;
pub use webhook::*;

use crate::services::{Analytics, MintBook, SeenStore, SellWatcher};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone)]
pub struct AppState {
    pub watcher: Arc<SellWatcher>,
    pub mint_book: Arc<MintBook>,
    pub store: Arc<dyn SeenStore>,
    pub analytics: Arc<Analytics>,
    /// Signalled when a handler hits an error the process cannot continue past.
    pub fatal: Arc<Notify>,
}

pub fn router(state: AppState, serve_webhook: bool) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats));

    if serve_webhook {
        app = app.route("/webhook", post(receive_webhook));
    }

    app.with_state(state)
}
