use std::time::Duration;
use serde::{Deserialize, Serialize};

pub mod exchange;
pub mod loader;

pub use exchange::{ExchangeConfig, ExchangeDescriptor};
pub use loader::AppConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PollerConfig {
    pub symbols: Vec<String>,
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub per_exchange_concurrency: usize,
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            symbols: ["BTC", "ETH", "SOL", "HYPE", "ENA", "TAO", "ARB", "LTC"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            poll_interval_secs: 300,  // 5 minutes
            error_backoff_secs: 5,
            per_exchange_concurrency: 2,
            max_workers: 10,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub symbols: Vec<String>,
    pub exchanges: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        SummaryConfig {
            enabled: true,
            interval_secs: 1800,  // 30 minutes
            symbols: vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()],
            exchanges: vec!["bybit".to_string(), "hyperliquid".to_string(), "reya".to_string()],
        }
    }
}

impl SummaryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub cooldown_hours: u64,
    /// Only notify opportunities with this exchange on either leg.
    pub require_exchange: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            enabled: true,
            cooldown_hours: 24,
            require_exchange: None,
            telegram_token: None,
            telegram_chat_id: None,
            telegram_api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_hours * 3600)
    }
}

/// Venue polled every cycle for persistence only: a fixed symbol set plus,
/// when `staking` is set, its staking APY snapshot.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HomeVenueConfig {
    pub exchange: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub staking: bool,
    /// Full staking endpoint; the venue's public one when unset.
    #[serde(default)]
    pub staking_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            dir: "data".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub bind_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            enabled: false,
            bind_addr: "0.0.0.0:9100".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}
