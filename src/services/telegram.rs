use crate::{error::NotifyError, models::SellEvent};
use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Sends plain-text messages to one chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(default)]
    description: String,
}

impl TelegramNotifier {
    pub fn new(
        api_url: &str,
        token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let request = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            disable_web_page_preview: true,
        };

        // The URL carries the bot token, so it is stripped from every error.
        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url, self.token))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::TransientNetwork(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let description = response
            .json::<ApiError>()
            .await
            .unwrap_or_default()
            .description;
        let reason = format!("HTTP {} {}", status.as_u16(), description).trim().to_string();

        match status.as_u16() {
            401 | 403 | 404 => Err(NotifyError::InvalidDestination(reason)),
            400 if description.to_lowercase().contains("chat") => {
                Err(NotifyError::InvalidDestination(reason))
            }
            _ => Err(NotifyError::TransientNetwork(reason)),
        }
    }
}

pub fn format_sell_alert(wallet: &str, event: &SellEvent, explorer_tx_url: &str) -> String {
    let mut msg = format!(
        "🚨 Token Sell Detected!\n\n\
         Wallet: {}\n\
         Token Mint: {}",
        wallet, event.mint
    );

    if let Some(amount) = event.amount {
        msg.push_str(&format!("\nAmount: {}", amount));
    }

    if let Some(created) = event.created_at.and_then(|t| DateTime::from_timestamp(t, 0)) {
        msg.push_str(&format!("\nCreated: {}", created.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if let Some(age) = event.age_secs {
        msg.push_str(&format!("\nSold {} after creation", format_age(age)));
    }

    msg.push_str(&format!("\nTransaction: {}{}", explorer_tx_url, event.signature));
    msg
}

fn format_age(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
