use crate::config::ExchangeDescriptor;
use crate::error::{Error, Result};
use crate::types::{FundingQuote, RawFundingResponse, Timestamp};

/// Funding interval assumed when an exchange does not report a usable one.
pub const DEFAULT_INTERVAL_HOURS: f64 = 8.0;

/// Parses a textual interval such as `"8h"` or `"1"` into hours.
/// Missing, unparsable or non-positive values fall back to [`DEFAULT_INTERVAL_HOURS`].
pub fn parse_interval_hours(interval: Option<&str>) -> f64 {
    let parsed = interval
        .map(|s| s.trim().trim_end_matches(['h', 'H']))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|hours| hours.is_finite() && *hours > 0.0);

    match parsed {
        Some(hours) => hours,
        None => {
            tracing::debug!(
                "Funding interval {:?} unusable, assuming {}h",
                interval,
                DEFAULT_INTERVAL_HOURS
            );
            DEFAULT_INTERVAL_HOURS
        }
    }
}

/// Converts a connector response into a [`FundingQuote`].
///
/// Formula: `hourly_pct = raw_rate * scale_factor / interval_hours`, with the
/// yearly rate derived as `hourly_pct * 8760`.
pub fn normalize(
    descriptor: &ExchangeDescriptor,
    raw: &RawFundingResponse,
    requested_symbol: &str,
    observed_at: Timestamp,
) -> Result<FundingQuote> {
    let rate = raw.funding_rate.ok_or_else(|| Error::MissingRate {
        exchange: descriptor.name.clone(),
        symbol: requested_symbol.to_string(),
    })?;

    if !rate.is_finite() {
        return Err(Error::InvalidRate {
            exchange: descriptor.name.clone(),
            rate,
        });
    }

    let interval_hours = parse_interval_hours(raw.interval.as_deref());
    let hourly_rate_pct = rate * descriptor.scale_factor / interval_hours;

    Ok(FundingQuote::new(
        requested_symbol,
        descriptor.name.clone(),
        hourly_rate_pct,
        interval_hours,
        raw.funding_datetime.clone(),
        observed_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HOURS_PER_YEAR;
    use proptest::prelude::*;

    fn raw(rate: Option<f64>, interval: Option<&str>) -> RawFundingResponse {
        RawFundingResponse {
            funding_rate: rate,
            interval: interval.map(|s| s.to_string()),
            funding_datetime: Some("2024-05-01T08:00:00.000Z".to_string()),
            info: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_parse_interval_hours() {
        assert_eq!(parse_interval_hours(Some("8h")), 8.0);
        assert_eq!(parse_interval_hours(Some("1h")), 1.0);
        assert_eq!(parse_interval_hours(Some("4")), 4.0);
        assert_eq!(parse_interval_hours(Some("weekly")), DEFAULT_INTERVAL_HOURS);
        assert_eq!(parse_interval_hours(Some("0h")), DEFAULT_INTERVAL_HOURS);
        assert_eq!(parse_interval_hours(None), DEFAULT_INTERVAL_HOURS);
    }

    #[test]
    fn test_fraction_exchange_scales_to_percent() {
        let descriptor = ExchangeDescriptor::new("binance");
        let quote = normalize(&descriptor, &raw(Some(0.0008), Some("8h")), "BTC", Timestamp::from_millis(0)).unwrap();

        assert!((quote.hourly_rate_pct() - 0.01).abs() < 1e-12);
        assert!((quote.yearly_rate_pct() - 87.6).abs() < 1e-9);
        assert_eq!(quote.interval_hours, 8.0);
        assert_eq!(quote.symbol, "BTC");
        assert_eq!(quote.exchange, "binance");
    }

    #[test]
    fn test_percent_exchange_is_not_rescaled() {
        let descriptor = ExchangeDescriptor::new("reya");
        let quote = normalize(&descriptor, &raw(Some(0.05), Some("1h")), "ETH", Timestamp::from_millis(0)).unwrap();

        assert!((quote.hourly_rate_pct() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_missing_interval_defaults_to_eight_hours() {
        let descriptor = ExchangeDescriptor::new("okx");
        let quote = normalize(&descriptor, &raw(Some(0.0008), None), "SOL", Timestamp::from_millis(0)).unwrap();

        assert_eq!(quote.interval_hours, 8.0);
        assert!((quote.hourly_rate_pct() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_missing_rate_is_error() {
        let descriptor = ExchangeDescriptor::new("bybit");
        let result = normalize(&descriptor, &raw(None, Some("8h")), "BTC", Timestamp::from_millis(0));

        assert!(matches!(result, Err(Error::MissingRate { .. })));
    }

    #[test]
    fn test_non_finite_rate_is_error() {
        let descriptor = ExchangeDescriptor::new("bybit");
        let result = normalize(&descriptor, &raw(Some(f64::NAN), Some("8h")), "BTC", Timestamp::from_millis(0));

        assert!(matches!(result, Err(Error::InvalidRate { .. })));
    }

    #[test]
    fn test_zero_rate_passes_through_without_signal() {
        let descriptor = ExchangeDescriptor::new("binance");
        let quote = normalize(&descriptor, &raw(Some(0.0), Some("8h")), "BTC", Timestamp::from_millis(0)).unwrap();

        assert_eq!(quote.hourly_rate_pct(), 0.0);
        assert!(!quote.has_signal());
    }

    proptest! {
        #[test]
        fn prop_yearly_is_hourly_times_8760(
            rate in -0.01f64..0.01,
            interval in prop::sample::select(vec!["1h", "4h", "8h", "bogus"]),
            percent_venue in any::<bool>(),
        ) {
            let descriptor = ExchangeDescriptor::new(if percent_venue { "reya" } else { "binance" });
            let quote = normalize(&descriptor, &raw(Some(rate), Some(interval)), "BTC", Timestamp::from_millis(0)).unwrap();

            let expected = (rate / quote.interval_hours) * 24.0 * descriptor.scale_factor * 365.0;
            prop_assert!((quote.yearly_rate_pct() - quote.hourly_rate_pct() * HOURS_PER_YEAR).abs() < 1e-12);
            prop_assert!((quote.yearly_rate_pct() - expected).abs() < 1e-9);
        }
    }
}
