use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::connectors::{check_status, parse_f64, split_market, FundingConnector};
use crate::error::Result;
use crate::types::{RawFundingResponse, Timestamp};

const EXCHANGE: &str = "binance";
const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

/// Binance USDⓈ-M futures, via the premium index endpoint.
pub struct BinanceConnector {
    client: Client,
    base_url: String,
}

impl BinanceConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        BinanceConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl FundingConnector for BinanceConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let (base, quote) = split_market(market_symbol);
        let native = format!("{}{}", base, quote);

        let response = self.client
            .get(format!("{}/fapi/v1/premiumIndex", self.base_url))
            .query(&[("symbol", native.as_str())])
            .send()
            .await?;
        let response = check_status(EXCHANGE, response).await?;
        let body: serde_json::Value = response.json().await?;
        let index: PremiumIndex = serde_json::from_value(body.clone())?;

        let funding_rate = match index.last_funding_rate.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse_f64(EXCHANGE, "lastFundingRate", raw)?),
            _ => None,
        };

        Ok(RawFundingResponse {
            funding_rate,
            interval: Some("8h".to_string()),
            funding_datetime: index
                .next_funding_time
                .filter(|t| *t > 0)
                .map(|t| Timestamp::from_millis(t).to_iso8601()),
            info: body,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumIndex {
    last_funding_rate: Option<String>,
    next_funding_time: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_parses_premium_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/premiumIndex"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbol": "BTCUSDT",
                "markPrice": "64000.10000000",
                "lastFundingRate": "0.00010000",
                "nextFundingTime": 1714550400000u64,
                "time": 1714540000000u64
            })))
            .mount(&server)
            .await;

        let connector = BinanceConnector::new(Client::new(), Some(server.uri()));
        let raw = connector.fetch_funding_rate("BTC/USDT:USDT").await.unwrap();

        assert_eq!(raw.funding_rate, Some(0.0001));
        assert_eq!(raw.interval.as_deref(), Some("8h"));
        assert_eq!(raw.funding_datetime.as_deref(), Some("2024-05-01T08:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_error_status_is_exchange_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/premiumIndex"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": -1121,
                "msg": "Invalid symbol."
            })))
            .mount(&server)
            .await;

        let connector = BinanceConnector::new(Client::new(), Some(server.uri()));
        let err = connector.fetch_funding_rate("NOPE/USDT:USDT").await.unwrap_err();

        assert!(err.to_string().contains("Invalid symbol"));
    }
}
