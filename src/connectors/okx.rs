use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::connectors::{check_status, parse_f64, split_market, FundingConnector};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, Timestamp};

const EXCHANGE: &str = "okx";
const DEFAULT_BASE_URL: &str = "https://www.okx.com";
const HOUR_MS: u64 = 3_600_000;

/// OKX v5 perpetual swaps, via the public funding-rate endpoint.
pub struct OkxConnector {
    client: Client,
    base_url: String,
}

impl OkxConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        OkxConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl FundingConnector for OkxConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let (base, quote) = split_market(market_symbol);
        let inst_id = format!("{}-{}-SWAP", base, quote);

        let response = self.client
            .get(format!("{}/api/v5/public/funding-rate", self.base_url))
            .query(&[("instId", inst_id.as_str())])
            .send()
            .await?;
        let response = check_status(EXCHANGE, response).await?;
        let envelope: FundingEnvelope = response.json().await?;

        if envelope.code != "0" {
            return Err(Error::ExchangeApi {
                exchange: EXCHANGE.to_string(),
                message: format!("code {}: {}", envelope.code, envelope.msg),
            });
        }

        let entry = envelope.data.into_iter().next().ok_or_else(|| Error::SymbolNotFound {
            exchange: EXCHANGE.to_string(),
            symbol: inst_id.clone(),
        })?;

        let field = |name: &str| entry.get(name).and_then(|v| v.as_str()).filter(|s| !s.is_empty());

        let funding_rate = match field("fundingRate") {
            Some(raw) => Some(parse_f64(EXCHANGE, "fundingRate", raw)?),
            None => None,
        };
        let funding_time = field("fundingTime").and_then(|t| t.parse::<u64>().ok());
        let next_funding_time = field("nextFundingTime").and_then(|t| t.parse::<u64>().ok());

        // The interval is implied by the gap between two settlements.
        let interval = match (funding_time, next_funding_time) {
            (Some(current), Some(next)) if next > current => {
                Some(format!("{}h", (next - current) / HOUR_MS))
            }
            _ => None,
        };

        Ok(RawFundingResponse {
            funding_rate,
            interval,
            funding_datetime: funding_time.map(|t| Timestamp::from_millis(t).to_iso8601()),
            info: entry,
        })
    }
}

#[derive(Deserialize)]
struct FundingEnvelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}
