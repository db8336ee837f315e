use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub home: Option<HomeVenueConfig>,
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_exchanges() -> Vec<ExchangeConfig> {
    ["binance", "okx", "bybit", "kucoin", "hyperliquid", "reya"]
        .iter()
        .map(|name| ExchangeConfig::named(name))
        .collect()
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}` and `FUNDING_ARB__*` variables.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("FUNDING_ARB").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.validate()?;
        Ok(app)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.exchanges.iter().any(|e| e.enabled) {
            return Err(Error::ConfigError("no exchange enabled".to_string()));
        }
        if self.poller.symbols.is_empty() {
            return Err(Error::ConfigError("poller.symbols is empty".to_string()));
        }
        if self.poller.per_exchange_concurrency == 0 || self.poller.max_workers == 0 {
            return Err(Error::ConfigError(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        if self.poller.max_retries == 0 {
            return Err(Error::ConfigError("poller.max_retries must be at least 1".to_string()));
        }
        if self.poller.poll_interval_secs == 0 || self.poller.error_backoff_secs == 0 {
            return Err(Error::ConfigError(
                "poller intervals must be at least 1 second".to_string(),
            ));
        }
        if self.summary.enabled && self.summary.interval_secs == 0 {
            return Err(Error::ConfigError(
                "summary.interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn enabled_exchanges(&self) -> impl Iterator<Item = &ExchangeConfig> {
        self.exchanges.iter().filter(|e| e.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.poller.per_exchange_concurrency, 2);
        assert_eq!(config.poller.max_workers, 10);
        assert_eq!(config.poller.poll_interval_secs, 300);
        assert_eq!(config.summary.interval_secs, 1800);
        assert_eq!(config.notification.cooldown_hours, 24);
        assert_eq!(config.exchanges.len(), 6);
        assert_eq!(config.summary.exchanges, vec!["bybit", "hyperliquid", "reya"]);
        assert!(config.home.is_none());
    }

    #[test]
    fn test_explicit_sections() {
        let toml = r#"
            [poller]
            symbols = ["BTC", "ETH"]
            max_retries = 5

            [notification]
            require_exchange = "hyperliquid"

            [home]
            exchange = "reya"
            symbols = ["BTC"]
            staking = true

            [[exchanges]]
            name = "binance"

            [[exchanges]]
            name = "okx"
            enabled = false
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.poller.symbols, vec!["BTC", "ETH"]);
        assert_eq!(config.poller.max_retries, 5);
        assert_eq!(config.poller.retry_delay_ms, 1000);
        assert_eq!(config.notification.require_exchange.as_deref(), Some("hyperliquid"));
        let home = config.home.as_ref().unwrap();
        assert_eq!(home.symbols.len(), 1);
        assert!(home.staking);
        assert!(home.staking_url.is_none());
        assert_eq!(config.enabled_exchanges().count(), 1);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let toml = r#"
            [poller]
            per_exchange_concurrency = 0
        "#;
        assert!(matches!(AppConfig::from_toml_str(toml), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_rejects_zero_intervals() {
        for toml in [
            "[poller]\npoll_interval_secs = 0",
            "[poller]\nerror_backoff_secs = 0",
            "[summary]\ninterval_secs = 0",
        ] {
            assert!(
                matches!(AppConfig::from_toml_str(toml), Err(Error::ConfigError(_))),
                "accepted {:?}",
                toml
            );
        }
    }

    #[test]
    fn test_disabled_summary_ignores_interval() {
        let toml = r#"
            [summary]
            enabled = false
            interval_secs = 0
        "#;
        assert!(AppConfig::from_toml_str(toml).is_ok());
    }
}
