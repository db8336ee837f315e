use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::connectors::{check_status, split_market, FundingConnector};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, Timestamp};

const EXCHANGE: &str = "kucoin";
const DEFAULT_BASE_URL: &str = "https://api-futures.kucoin.com";
const SUCCESS_CODE: &str = "200000";
const HOUR_MS: u64 = 3_600_000;

/// KuCoin Futures linear perpetuals (`XBTUSDTM` style contracts).
pub struct KucoinConnector {
    client: Client,
    base_url: String,
}

impl KucoinConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        KucoinConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

/// KuCoin lists bitcoin as XBT.
fn contract_symbol(market_symbol: &str) -> String {
    let (base, quote) = split_market(market_symbol);
    let base = if base.eq_ignore_ascii_case("BTC") { "XBT" } else { base };
    format!("{}{}M", base.to_uppercase(), quote.to_uppercase())
}

#[async_trait]
impl FundingConnector for KucoinConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let contract = contract_symbol(market_symbol);

        let response = self.client
            .get(format!("{}/api/v1/funding-rate/{}/current", self.base_url, contract))
            .send()
            .await?;
        let response = check_status(EXCHANGE, response).await?;
        let envelope: FundingEnvelope = response.json().await?;

        if envelope.code != SUCCESS_CODE {
            return Err(Error::ExchangeApi {
                exchange: EXCHANGE.to_string(),
                message: format!("code {}: {}", envelope.code, envelope.msg),
            });
        }
        let data = envelope.data.ok_or_else(|| Error::SymbolNotFound {
            exchange: EXCHANGE.to_string(),
            symbol: contract.clone(),
        })?;

        let funding_rate = data.get("value").and_then(|v| v.as_f64());
        let granularity = data.get("granularity").and_then(|v| v.as_u64());
        let time_point = data.get("timePoint").and_then(|v| v.as_u64());

        // Granularity is the settlement period in milliseconds.
        let interval = granularity
            .filter(|ms| *ms >= HOUR_MS)
            .map(|ms| format!("{}h", ms / HOUR_MS));
        let next_funding = match (time_point, granularity) {
            (Some(at), Some(period)) => Some(Timestamp::from_millis(at.saturating_add(period))),
            _ => None,
        };

        Ok(RawFundingResponse {
            funding_rate,
            interval,
            funding_datetime: next_funding.map(|t| t.to_iso8601()),
            info: data,
        })
    }
}

#[derive(Deserialize)]
struct FundingEnvelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}
