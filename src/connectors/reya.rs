use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use crate::connectors::{check_status, parse_f64, split_market, FundingConnector, StakingSource};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, StakingSnapshot, Timestamp};

const EXCHANGE: &str = "reya";
const DEFAULT_BASE_URL: &str = "https://api.reya.xyz";
const HOUR_MS: u64 = 3_600_000;

/// Reya perpetuals settled in rUSD. Funding accrues continuously and the
/// market summary reports it already in percent per hour.
pub struct ReyaConnector {
    client: Client,
    base_url: String,
}

impl ReyaConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        ReyaConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// `BTC/RUSD:RUSD` → `BTCRUSDPERP`.
fn native_symbol(market_symbol: &str) -> String {
    let (base, quote) = split_market(market_symbol);
    format!("{}{}PERP", base.to_uppercase(), quote.to_uppercase())
}

#[async_trait]
impl FundingConnector for ReyaConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let symbol = native_symbol(market_symbol);

        let response = self.client
            .get(format!("{}/v2/market/{}/summary", self.base_url, symbol))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::SymbolNotFound {
                exchange: EXCHANGE.to_string(),
                symbol,
            });
        }
        let response = check_status(EXCHANGE, response).await?;
        let summary: Value = response.json().await?;

        let funding_rate = match summary.get("fundingRate") {
            Some(Value::String(raw)) if !raw.is_empty() => Some(parse_f64(EXCHANGE, "fundingRate", raw)?),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        };
        let next_hour = (Timestamp::now().as_millis() / HOUR_MS + 1) * HOUR_MS;

        Ok(RawFundingResponse {
            funding_rate,
            interval: Some("1h".to_string()),
            funding_datetime: Some(Timestamp::from_millis(next_hour).to_iso8601()),
            info: summary,
        })
    }
}

/// APY and share price of the Reya staking pool.
pub struct ReyaStakingSource {
    client: Client,
    url: String,
}

impl ReyaStakingSource {
    /// `url` overrides the full staking endpoint, not just the host.
    pub fn new(client: Client, url: Option<String>) -> Self {
        ReyaStakingSource {
            client,
            url: url.unwrap_or_else(|| format!("{}/v2/staking/summary", DEFAULT_BASE_URL)),
        }
    }
}

#[derive(Deserialize)]
struct StakingSummary {
    apy: Value,
    #[serde(alias = "share_price")]
    #[serde(rename = "sharePrice")]
    share_price: Value,
}

fn number_field(field: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| Error::DeserializationError(
            format!("{} is not a finite number", field),
        )),
        Value::String(raw) => parse_f64(EXCHANGE, field, raw),
        other => Err(Error::DeserializationError(format!("{} has type {}", field, other))),
    }
}

#[async_trait]
impl StakingSource for ReyaStakingSource {
    async fn fetch_staking(&self) -> Result<StakingSnapshot> {
        let response = self.client.get(&self.url).send().await?;
        let response = check_status(EXCHANGE, response).await?;
        let summary: StakingSummary = response.json().await?;

        Ok(StakingSnapshot {
            apy: number_field("apy", &summary.apy)?,
            share_price: number_field("sharePrice", &summary.share_price)?,
            timestamp: Timestamp::now(),
        })
    }
}
