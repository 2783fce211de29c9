use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::time::Duration;

/// Wrapped SOL, USDC and USDT. Moving these out of the wallet is not a sell
/// of a launched token.
pub const DEFAULT_IGNORE_MINTS: [&str; 3] = [
    "So11111111111111111111111111111111111111112",
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    Poll,
    Webhook,
    Both,
}

impl WatchMode {
    pub fn polls(self) -> bool {
        matches!(self, WatchMode::Poll | WatchMode::Both)
    }

    pub fn serves_webhook(self) -> bool {
        matches!(self, WatchMode::Webhook | WatchMode::Both)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub mode: WatchMode,

    // Helius (transaction source + token metadata)
    pub helius_api_key: String,
    pub helius_api_url: String,
    pub wallet_address: String,
    pub page_limit: u32,
    pub tx_type_filter: Option<String>,

    // Telegram
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,
    pub startup_notice: bool,
    pub explorer_tx_url: String,

    // Persistence
    pub redis_url: Option<String>,

    // Detection
    pub max_token_age_secs: Option<i64>,
    pub ignore_mints: HashSet<String>,
    pub require_native_proceeds: bool,

    // Scheduling
    pub poll_interval: Duration,
    pub preload_history: bool,
    pub preload_max_pages: u32,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} required", key))
        };

        let config = Self {
            environment: Self::parse_environment(&var("ENVIRONMENT", "development"))?,
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "10000").parse().context("Invalid PORT")?,
            mode: Self::parse_mode(&var("WATCH_MODE", "both"))?,

            helius_api_key: required("HELIUS_API_KEY")?,
            helius_api_url: var("HELIUS_API_URL", "https://api.helius.xyz")
                .trim_end_matches('/')
                .to_string(),
            wallet_address: required("WALLET_ADDRESS")?.trim().to_string(),
            page_limit: var("PAGE_LIMIT", "20").parse().context("Invalid PAGE_LIMIT")?,
            tx_type_filter: lookup("TX_TYPE_FILTER")
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty()),

            telegram_token: required("TG_TOKEN")?,
            telegram_chat_id: required("TG_CHAT_ID")?,
            telegram_api_url: var("TELEGRAM_API_URL", "https://api.telegram.org")
                .trim_end_matches('/')
                .to_string(),
            startup_notice: Self::parse_bool("STARTUP_NOTICE", &var("STARTUP_NOTICE", "true"))?,
            explorer_tx_url: var("EXPLORER_TX_URL", "https://solscan.io/tx/"),

            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),

            max_token_age_secs: Self::parse_max_age(&var("MAX_TOKEN_AGE_SECS", "7200"))?,
            ignore_mints: Self::parse_ignore_mints(lookup("IGNORE_MINTS")),
            require_native_proceeds: Self::parse_bool(
                "REQUIRE_NATIVE_PROCEEDS",
                &var("REQUIRE_NATIVE_PROCEEDS", "false"),
            )?,

            poll_interval: Duration::from_secs(
                var("POLL_INTERVAL_SECS", "300")
                    .parse()
                    .context("Invalid POLL_INTERVAL_SECS")?,
            ),
            preload_history: Self::parse_bool("PRELOAD_HISTORY", &var("PRELOAD_HISTORY", "false"))?,
            preload_max_pages: var("PRELOAD_MAX_PAGES", "50")
                .parse()
                .context("Invalid PRELOAD_MAX_PAGES")?,
            http_timeout: Duration::from_secs(
                var("HTTP_TIMEOUT_SECS", "10")
                    .parse()
                    .context("Invalid HTTP_TIMEOUT_SECS")?,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment(env: &str) -> Result<Environment> {
        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_mode(mode: &str) -> Result<WatchMode> {
        match mode.to_lowercase().as_str() {
            "poll" => Ok(WatchMode::Poll),
            "webhook" => Ok(WatchMode::Webhook),
            "both" => Ok(WatchMode::Both),
            _ => bail!("Unknown WATCH_MODE: {}", mode),
        }
    }

    fn parse_bool(key: &str, value: &str) -> Result<bool> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("Invalid {}: {}", key, value),
        }
    }

    fn parse_max_age(value: &str) -> Result<Option<i64>> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("off") || value.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        let secs: i64 = value.parse().context("Invalid MAX_TOKEN_AGE_SECS")?;
        if secs < 0 {
            bail!("MAX_TOKEN_AGE_SECS must not be negative");
        }
        Ok(Some(secs))
    }

    fn parse_ignore_mints(value: Option<String>) -> HashSet<String> {
        match value {
            Some(list) => list
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            None => DEFAULT_IGNORE_MINTS.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.helius_api_url.starts_with("http") {
            bail!("HELIUS_API_URL must be HTTP(S) URL");
        }
        if !self.telegram_api_url.starts_with("http") {
            bail!("TELEGRAM_API_URL must be HTTP(S) URL");
        }
        if !is_base58_address(&self.wallet_address) {
            bail!("WALLET_ADDRESS is not a base58 address: {}", self.wallet_address);
        }
        if self.page_limit == 0 || self.page_limit > 100 {
            bail!("PAGE_LIMIT must be between 1 and 100");
        }
        if self.poll_interval.is_zero() {
            bail!("POLL_INTERVAL_SECS must be positive");
        }

        tracing::info!(
            "Configuration validated for {:?} environment ({:?} mode)",
            self.environment,
            self.mode
        );

        Ok(())
    }
}

fn is_base58_address(addr: &str) -> bool {
    const ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    (32..=44).contains(&addr.len()) && addr.chars().all(|c| ALPHABET.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const WALLET: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("HELIUS_API_KEY", "key".to_string()),
            ("WALLET_ADDRESS", WALLET.to_string()),
            ("TG_TOKEN", "123:abc".to_string()),
            ("TG_CHAT_ID", "-100200".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_follow_the_polling_scripts() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.port, 10000);
        assert_eq!(config.mode, WatchMode::Both);
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.page_limit, 20);
        assert_eq!(config.max_token_age_secs, Some(7200));
        assert!(config.ignore_mints.contains(DEFAULT_IGNORE_MINTS[0]));
        assert!(config.redis_url.is_none());
        assert!(config.tx_type_filter.is_none());
    }

    #[test]
    fn missing_wallet_is_rejected() {
        let mut env = base_env();
        env.remove("WALLET_ADDRESS");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("WALLET_ADDRESS"));
    }

    #[test]
    fn non_base58_wallet_is_rejected() {
        let mut env = base_env();
        // '0' and 'O' are not in the base58 alphabet
        env.insert("WALLET_ADDRESS", "0OxKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAs".to_string());
        assert!(load(&env).is_err());
    }

    #[test]
    fn age_filter_can_be_disabled() {
        let mut env = base_env();
        env.insert("MAX_TOKEN_AGE_SECS", "off".to_string());
        assert_eq!(load(&env).unwrap().max_token_age_secs, None);
    }

    #[test]
    fn ignore_mints_override_replaces_defaults() {
        let mut env = base_env();
        env.insert("IGNORE_MINTS", " MintA, ,MintB ".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.ignore_mints.len(), 2);
        assert!(config.ignore_mints.contains("MintA"));
        assert!(!config.ignore_mints.contains(DEFAULT_IGNORE_MINTS[0]));
    }

    #[test]
    fn mode_and_type_filter_are_parsed() {
        let mut env = base_env();
        env.insert("WATCH_MODE", "webhook".to_string());
        env.insert("TX_TYPE_FILTER", "swap".to_string());
        let config = load(&env).unwrap();
        assert!(!config.mode.polls());
        assert!(config.mode.serves_webhook());
        assert_eq!(config.tx_type_filter.as_deref(), Some("SWAP"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut env = base_env();
        env.insert("WATCH_MODE", "cron".to_string());
        assert!(load(&env).is_err());
    }
}
