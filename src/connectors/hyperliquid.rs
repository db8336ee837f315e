use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use crate::connectors::{check_status, parse_f64, split_market, FundingConnector};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, Timestamp};

const EXCHANGE: &str = "hyperliquid";
const DEFAULT_BASE_URL: &str = "https://api.hyperliquid.xyz";
const HOUR_MS: u64 = 3_600_000;

/// Hyperliquid perpetuals. Funding settles hourly; the info endpoint returns
/// the whole universe at once and the requested coin is picked out of it.
pub struct HyperliquidConnector {
    client: Client,
    base_url: String,
}

impl HyperliquidConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        HyperliquidConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl FundingConnector for HyperliquidConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let (coin, _) = split_market(market_symbol);

        let response = self.client
            .post(format!("{}/info", self.base_url))
            .json(&json!({ "type": "metaAndAssetCtxs" }))
            .send()
            .await?;
        let response = check_status(EXCHANGE, response).await?;
        let (meta, contexts): (Meta, Vec<serde_json::Value>) = response.json().await?;

        let index = meta
            .universe
            .iter()
            .position(|asset| asset.name.eq_ignore_ascii_case(coin))
            .ok_or_else(|| Error::SymbolNotFound {
                exchange: EXCHANGE.to_string(),
                symbol: coin.to_string(),
            })?;
        let context = contexts.into_iter().nth(index).ok_or_else(|| Error::ExchangeApi {
            exchange: EXCHANGE.to_string(),
            message: format!("asset context missing for {}", coin),
        })?;

        let funding_rate = match context.get("funding").and_then(|v| v.as_str()) {
            Some(raw) if !raw.is_empty() => Some(parse_f64(EXCHANGE, "funding", raw)?),
            _ => None,
        };

        let next_hour = (Timestamp::now().as_millis() / HOUR_MS + 1) * HOUR_MS;

        Ok(RawFundingResponse {
            funding_rate,
            interval: Some("1h".to_string()),
            funding_datetime: Some(Timestamp::from_millis(next_hour).to_iso8601()),
            info: context,
        })
    }
}

#[derive(Deserialize)]
struct Meta {
    universe: Vec<Asset>,
}

#[derive(Deserialize)]
struct Asset {
    name: String,
}
