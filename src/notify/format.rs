use std::fmt::Write;
use crate::config::exchange::base_symbol;
use crate::types::{ArbitrageOpportunity, FundingQuote, Timestamp};

/// Yearly percentage beyond which a summary row is flagged as strongly directional.
const SUMMARY_EMOJI_THRESHOLD: f64 = 1.0;

pub fn format_opportunity(opportunity: &ArbitrageOpportunity) -> String {
    format!(
        "Arbitrage Opportunity\n\
         🚀 <b>{symbol}</b>\n\
         \n\
         📈 <b>Long</b> on <b>{long}</b>\n\
         at <b>{long_h:.4}% (1h)</b> | <b>{long_y:.2}% (1Y)</b>\n\
         \n\
         📉 <b>Short</b> on <b>{short}</b>\n\
         at <b>{short_h:.4}% (1h)</b> | <b>{short_y:.2}% (1Y)</b>\n\
         \n\
         🔎 <b>Spread:</b> <b>{spread_h:.4}% (1h)</b> | <b>{spread_y:.2}% (1Y)</b>\n",
        symbol = opportunity.symbol,
        long = opportunity.long_exchange,
        long_h = opportunity.long_rate_hourly,
        long_y = opportunity.long_rate_yearly,
        short = opportunity.short_exchange,
        short_h = opportunity.short_rate_hourly,
        short_y = opportunity.short_rate_yearly,
        spread_h = opportunity.spread_hourly,
        spread_y = opportunity.spread_yearly,
    )
}

fn direction_emoji(yearly_pct: f64) -> &'static str {
    if yearly_pct < -SUMMARY_EMOJI_THRESHOLD {
        "🔴"
    } else if yearly_pct > SUMMARY_EMOJI_THRESHOLD {
        "🟢"
    } else {
        "⚪"
    }
}

/// Renders the periodic summary, one block per base symbol in `symbols` order with
/// rows sorted by yearly rate, highest first. Symbols without quotes are
/// skipped; `None` when no symbol has any.
pub fn format_summary(now: Timestamp, symbols: &[String], quotes: &[FundingQuote]) -> Option<String> {
    let mut message = String::from("📊 <b>Funding Rate Summary</b>\n");
    let _ = write!(
        message,
        "🕐 {}\n\n",
        now.to_datetime().format("%Y-%m-%d %H:%M UTC")
    );

    let mut rendered = 0;
    for symbol in symbols {
        let symbol = base_symbol(symbol);
        let mut rows: Vec<&FundingQuote> = quotes.iter().filter(|q| q.symbol == symbol).collect();
        if rows.is_empty() {
            continue;
        }
        rows.sort_by(|a, b| b.yearly_rate_pct().total_cmp(&a.yearly_rate_pct()));

        let _ = writeln!(message, "<b>{}</b>", symbol);
        for quote in rows {
            let yearly = quote.yearly_rate_pct();
            let _ = writeln!(
                message,
                "{} <b>{}</b>: {:+.2}% (1Y)",
                direction_emoji(yearly),
                quote.exchange,
                yearly
            );
        }
        message.push('\n');
        rendered += 1;
    }

    (rendered > 0).then_some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, exchange: &str, hourly: f64) -> FundingQuote {
        FundingQuote::new(symbol, exchange, hourly, 8.0, None, Timestamp::from_millis(0))
    }

    #[test]
    fn test_opportunity_message() {
        let opportunity = ArbitrageOpportunity::from_legs(
            &quote("BTC", "binance", -0.01),
            &quote("BTC", "bybit", 0.02),
        );

        let text = format_opportunity(&opportunity);

        assert!(text.starts_with("Arbitrage Opportunity\n🚀 <b>BTC</b>\n"));
        assert!(text.contains("📈 <b>Long</b> on <b>binance</b>\nat <b>-0.0100% (1h)</b> | <b>-87.60% (1Y)</b>"));
        assert!(text.contains("📉 <b>Short</b> on <b>bybit</b>\nat <b>0.0200% (1h)</b> | <b>175.20% (1Y)</b>"));
        assert!(text.contains("🔎 <b>Spread:</b> <b>0.0300% (1h)</b> | <b>262.80% (1Y)</b>"));
    }

    #[test]
    fn test_summary_layout_and_ordering() {
        let symbols = vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()];
        let quotes = vec![
            quote("ETH", "okx", 0.00001),
            quote("BTC", "okx", -0.001),
            quote("BTC", "bybit", 0.002),
        ];
        // 2024-05-01T08:30:00Z
        let now = Timestamp::from_millis(1_714_552_200_000);

        let text = format_summary(now, &symbols, &quotes).unwrap();

        assert_eq!(
            text,
            "📊 <b>Funding Rate Summary</b>\n\
             🕐 2024-05-01 08:30 UTC\n\n\
             <b>BTC</b>\n\
             🟢 <b>bybit</b>: +17.52% (1Y)\n\
             🔴 <b>okx</b>: -8.76% (1Y)\n\n\
             <b>ETH</b>\n\
             ⚪ <b>okx</b>: +0.09% (1Y)\n\n"
        );
    }

    #[test]
    fn test_summary_accepts_market_symbols() {
        let symbols = vec!["BTC/USDT:USDT".to_string(), "ETH/RUSD:RUSD".to_string()];
        let quotes = vec![quote("BTC", "bybit", 0.002), quote("ETH", "reya", -0.001)];

        let text = format_summary(Timestamp::from_millis(0), &symbols, &quotes).unwrap();

        assert!(text.contains("<b>BTC</b>\n🟢 <b>bybit</b>: +17.52% (1Y)\n"));
        assert!(text.contains("<b>ETH</b>\n🔴 <b>reya</b>: -8.76% (1Y)\n"));
        assert!(!text.contains("USDT"));
    }

    #[test]
    fn test_summary_without_quotes_is_none() {
        let symbols = vec!["BTC".to_string()];
        assert!(format_summary(Timestamp::from_millis(0), &symbols, &[]).is_none());
        assert!(format_summary(Timestamp::from_millis(0), &symbols, &[quote("DOGE", "okx", 0.1)]).is_none());
    }
}
