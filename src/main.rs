use anyhow::{Context, Result};
use sell_watch::{
    config::Config,
    error::NotifyError,
    handlers::{router, AppState},
    services::{store::SEEN_KEY, *},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
    
    // Load configuration
    let config = Config::from_env()?;
    
    tracing::info!("Starting sell-watch v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Watching wallet {}", config.wallet_address);
    
    // Persistence: an unreachable store at startup is fatal
    let (store, mint_book): (Arc<dyn SeenStore>, Arc<MintBook>) = match &config.redis_url {
        Some(url) => {
            let redis = connect_redis(url).await.context("Seen store unavailable")?;
            let store = RedisSeenStore::with_connection(redis.clone(), SEEN_KEY)
                .await
                .context("Seen store unavailable")?;
            (Arc::new(store), Arc::new(MintBook::with_redis(redis)))
        }
        None => {
            tracing::warn!(
                "REDIS_URL not set: alerted mints are kept in memory only and will be \
                 alerted again after a restart"
            );
            (Arc::new(MemorySeenStore::new()), Arc::new(MintBook::in_memory()))
        }
    };
    
    // Initialize services
    let helius = Arc::new(HeliusClient::new(
        &config.helius_api_url,
        &config.helius_api_key,
        config.http_timeout,
    )?);
    let notifier: Arc<dyn Notifier> = Arc::new(
        TelegramNotifier::new(
            &config.telegram_api_url,
            &config.telegram_token,
            &config.telegram_chat_id,
            config.http_timeout,
        )
        .context("Failed to build Telegram client")?,
    );
    let analytics = Arc::new(Analytics::new());
    
    let mut detector = SellDetector::new(config.wallet_address.clone(), store.clone())
        .with_ignore_mints(config.ignore_mints.clone())
        .with_type_filter(config.tx_type_filter.clone())
        .with_native_proceeds(config.require_native_proceeds);
    
    if let Some(max_age_secs) = config.max_token_age_secs {
        let lookup = AgeResolver::new(vec![
            mint_book.clone() as Arc<dyn TokenAgeLookup>,
            helius.clone() as Arc<dyn TokenAgeLookup>,
        ]);
        detector = detector.with_age_filter(AgeFilter {
            max_age_secs,
            lookup: Arc::new(lookup),
        });
        tracing::info!("Alerting only on tokens sold within {}s of creation", max_age_secs);
    }
    
    let watcher = Arc::new(SellWatcher::new(
        detector,
        notifier.clone(),
        analytics.clone(),
        config.explorer_tx_url.clone(),
    ));
    
    if config.startup_notice {
        match notifier.notify("🚨 Sell watcher started and connected successfully.").await {
            Ok(()) => tracing::info!("Startup notice sent"),
            Err(e @ NotifyError::InvalidDestination(_)) => {
                return Err(e).context("Telegram rejected TG_TOKEN/TG_CHAT_ID");
            }
            Err(e) => tracing::warn!("Startup notice not delivered: {}", e),
        }
    }
    
    let fatal = Arc::new(Notify::new());
    
    // Pull mode
    if config.mode.polls() {
        let poller = Poller::new(
            watcher.clone(),
            helius.clone(),
            analytics.clone(),
            PollSettings {
                interval: config.poll_interval,
                page_limit: config.page_limit,
                type_filter: config.tx_type_filter.clone(),
            },
        );
        
        if config.preload_history {
            poller.preload(config.preload_max_pages).await;
        }
        
        let fatal = fatal.clone();
        tokio::spawn(async move {
            if let Err(e) = poller.run().await {
                tracing::error!("Poller stopped: {}", e);
                fatal.notify_one();
            }
        });
    }
    
    // Build application state
    let app_state = AppState {
        watcher,
        mint_book,
        store,
        analytics,
        fatal: fatal.clone(),
    };
    
    let app = router(app_state, config.mode.serves_webhook()).layer(
        TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default().include_headers(false)),
    );
    
    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    
    tracing::info!("Server listening on http://{}", addr);
    if config.mode.serves_webhook() {
        tracing::info!("Webhook endpoint: http://{}/webhook", addr);
    }
    tracing::info!("Health check: http://{}/health", addr);
    
    let failed = Arc::new(AtomicBool::new(false));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(fatal, failed.clone()))
        .await?;
    
    if failed.load(Ordering::SeqCst) {
        anyhow::bail!("Stopped after a fatal error");
    }
    
    Ok(())
}

async fn shutdown_signal(fatal: Arc<Notify>, failed: Arc<AtomicBool>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl+c: {}", e);
            }
            tracing::info!("Shutting down gracefully...");
        }
        _ = fatal.notified() => {
            failed.store(true, Ordering::SeqCst);
            tracing::error!("Fatal error reported, shutting down...");
        }
    }
}
