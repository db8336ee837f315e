pub mod binance;
pub mod bybit;
pub mod hyperliquid;
pub mod kucoin;
pub mod okx;
pub mod reya;

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use crate::config::{ExchangeConfig, ExchangeDescriptor, HomeVenueConfig};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, StakingSnapshot};

pub use binance::BinanceConnector;
pub use bybit::BybitConnector;
pub use hyperliquid::HyperliquidConnector;
pub use kucoin::KucoinConnector;
pub use okx::OkxConnector;
pub use reya::{ReyaConnector, ReyaStakingSource};

/// Fetches the current funding rate for a unified market symbol such as
/// `BTC/USDT:USDT`. Implementations translate to their native naming.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FundingConnector: Send + Sync {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse>;
}

/// Staking pool metrics of a venue that offers one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StakingSource: Send + Sync {
    async fn fetch_staking(&self) -> Result<StakingSnapshot>;
}

/// A connector bundled with the descriptor used to address and normalize it.
#[derive(Clone)]
pub struct Exchange {
    pub descriptor: ExchangeDescriptor,
    pub connector: Arc<dyn FundingConnector>,
}

impl Exchange {
    pub fn new(descriptor: ExchangeDescriptor, connector: Arc<dyn FundingConnector>) -> Self {
        Exchange { descriptor, connector }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(concat!("funding-arb/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::from)
}

/// Builds the REST connector for a configured exchange.
pub fn build_exchange(config: &ExchangeConfig, client: Client) -> Result<Exchange> {
    let descriptor = ExchangeDescriptor::from_config(config);
    let base_url = config.base_url.clone();

    let connector: Arc<dyn FundingConnector> = match config.name.to_lowercase().as_str() {
        "binance" => Arc::new(BinanceConnector::new(client, base_url)),
        "bybit" => Arc::new(BybitConnector::new(client, base_url)),
        "okx" => Arc::new(OkxConnector::new(client, base_url)),
        "hyperliquid" => Arc::new(HyperliquidConnector::new(client, base_url)),
        "kucoin" => Arc::new(KucoinConnector::new(client, base_url)),
        "reya" => Arc::new(ReyaConnector::new(client, base_url)),
        _ => return Err(Error::UnsupportedExchange(config.name.clone())),
    };

    Ok(Exchange::new(descriptor, connector))
}

/// Staking source for the home venue, when enabled and the venue has one.
pub fn build_staking_source(
    home: &HomeVenueConfig,
    client: Client,
) -> Result<Option<Arc<dyn StakingSource>>> {
    if !home.staking {
        return Ok(None);
    }

    match home.exchange.to_lowercase().as_str() {
        "reya" => Ok(Some(Arc::new(ReyaStakingSource::new(client, home.staking_url.clone())))),
        _ => Err(Error::ConfigError(format!(
            "{} has no staking source",
            home.exchange
        ))),
    }
}

/// Splits `BASE/QUOTE:SETTLE` into `(BASE, QUOTE)`. A bare symbol maps to USDT.
pub(crate) fn split_market(market_symbol: &str) -> (&str, &str) {
    match market_symbol.split_once('/') {
        Some((base, rest)) => {
            let quote = rest.split(':').next().unwrap_or(rest);
            (base, quote)
        }
        None => (market_symbol, "USDT"),
    }
}

pub(crate) fn parse_f64(exchange: &str, field: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| Error::ExchangeApi {
        exchange: exchange.to_string(),
        message: format!("unparsable {}: {:?}", field, value),
    })
}

pub(crate) async fn check_status(exchange: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::ExchangeApi {
        exchange: exchange.to_string(),
        message: format!("HTTP {}: {}", status, body),
    })
}
