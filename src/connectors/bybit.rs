use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::connectors::{check_status, parse_f64, split_market, FundingConnector};
use crate::error::{Error, Result};
use crate::types::{RawFundingResponse, Timestamp};

const EXCHANGE: &str = "bybit";
const DEFAULT_BASE_URL: &str = "https://api.bybit.com";

/// Bybit v5 linear perpetuals, via the tickers endpoint.
pub struct BybitConnector {
    client: Client,
    base_url: String,
}

impl BybitConnector {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        BybitConnector {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl FundingConnector for BybitConnector {
    async fn fetch_funding_rate(&self, market_symbol: &str) -> Result<RawFundingResponse> {
        let (base, quote) = split_market(market_symbol);
        let native = format!("{}{}", base, quote);

        let response = self.client
            .get(format!("{}/v5/market/tickers", self.base_url))
            .query(&[("category", "linear"), ("symbol", native.as_str())])
            .send()
            .await?;
        let response = check_status(EXCHANGE, response).await?;
        let envelope: TickersEnvelope = response.json().await?;

        if envelope.ret_code != 0 {
            return Err(Error::ExchangeApi {
                exchange: EXCHANGE.to_string(),
                message: format!("retCode {}: {}", envelope.ret_code, envelope.ret_msg),
            });
        }

        let ticker = envelope
            .result
            .list
            .into_iter()
            .find(|t| t.get("symbol").and_then(|s| s.as_str()) == Some(native.as_str()))
            .ok_or_else(|| Error::SymbolNotFound {
                exchange: EXCHANGE.to_string(),
                symbol: native.clone(),
            })?;

        let funding_rate = match ticker.get("fundingRate").and_then(|v| v.as_str()) {
            Some(raw) if !raw.is_empty() => Some(parse_f64(EXCHANGE, "fundingRate", raw)?),
            _ => None,
        };
        let interval = ticker
            .get("fundingIntervalHour")
            .and_then(|v| v.as_str())
            .map(|hours| format!("{}h", hours))
            .unwrap_or_else(|| "8h".to_string());
        let funding_datetime = ticker
            .get("nextFundingTime")
            .and_then(|v| v.as_str())
            .and_then(|t| t.parse::<u64>().ok())
            .filter(|t| *t > 0)
            .map(|t| Timestamp::from_millis(t).to_iso8601());

        Ok(RawFundingResponse {
            funding_rate,
            interval: Some(interval),
            funding_datetime,
            info: ticker,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickersEnvelope {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    #[serde(default)]
    result: TickersResult,
}

#[derive(Deserialize, Default)]
struct TickersResult {
    #[serde(default)]
    list: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_parses_ticker_with_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .and(query_param("category", "linear"))
            .and(query_param("symbol", "ETHUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": {
                    "category": "linear",
                    "list": [{
                        "symbol": "ETHUSDT",
                        "fundingRate": "-0.00005",
                        "fundingIntervalHour": "4",
                        "nextFundingTime": "1714550400000"
                    }]
                }
            })))
            .mount(&server)
            .await;

        let connector = BybitConnector::new(Client::new(), Some(server.uri()));
        let raw = connector.fetch_funding_rate("ETH/USDT:USDT").await.unwrap();

        assert_eq!(raw.funding_rate, Some(-0.00005));
        assert_eq!(raw.interval.as_deref(), Some("4h"));
        assert!(raw.funding_datetime.is_some());
    }

    #[tokio::test]
    async fn test_nonzero_ret_code_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "retCode": 10001,
                "retMsg": "params error: symbol invalid",
                "result": {}
            })))
            .mount(&server)
            .await;

        let connector = BybitConnector::new(Client::new(), Some(server.uri()));
        let err = connector.fetch_funding_rate("XYZ/USDT:USDT").await.unwrap_err();

        assert!(matches!(err, Error::ExchangeApi { .. }));
    }
}
