use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinSet;

/// Posts a saved webhook payload to a running watcher, optionally several
/// times at once to imitate an upstream redelivery.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    
    // Load configuration
    dotenvy::dotenv().ok();
    
    let base_url = std::env::var("SELL_WATCH_URL")
        .unwrap_or_else(|_| "http://localhost:10000".to_string());
    let copies: usize = std::env::var("REPLAY_COPIES")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .context("Invalid REPLAY_COPIES")?;
    let Some(path) = std::env::args().nth(1) else {
        bail!("Usage: webhook-replay <payload.json>");
    };
    
    let raw = std::fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path))?;
    let payload: Value = serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", path))?;
    if !payload.is_array() {
        println!("[WARN] Payload is not an array; the watcher will answer 400");
    }
    
    println!("Sell-watch Webhook Replay");
    println!("=========================");
    println!("Server: {}", base_url);
    println!("Payload: {} ({} copies)", path, copies);
    println!();
    
    let client = Client::new();
    let url = format!("{}/webhook", base_url.trim_end_matches('/'));
    
    let mut deliveries = JoinSet::new();
    for copy in 0..copies.max(1) {
        let client = client.clone();
        let url = url.clone();
        let payload = payload.clone();
        deliveries.spawn(async move {
            let response = client.post(&url).json(&payload).send().await?;
            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            Ok::<_, reqwest::Error>((copy, status, body))
        });
    }
    
    while let Some(joined) = deliveries.join_next().await {
        match joined? {
            Ok((copy, status, body)) => {
                println!("[{}] delivery #{}", status, copy + 1);
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(e) => println!("[FAILED] {}", e),
        }
    }
    
    Ok(())
}
