use std::sync::Arc;
use std::time::Duration;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Instrument};
use crate::connectors::Exchange;
use crate::funding::FundingFetcher;
use crate::interfaces::Notifier;
use crate::notify::format_summary;
use crate::observability::tracing::trace_summary;
use crate::types::Timestamp;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic ranked digest over a small fixed symbol and exchange set.
pub struct SummaryReporter {
    exchanges: Vec<Exchange>,
    symbols: Vec<String>,
    fetcher: Arc<FundingFetcher>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
}

impl SummaryReporter {
    pub fn new(
        exchanges: Vec<Exchange>,
        symbols: Vec<String>,
        fetcher: Arc<FundingFetcher>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self {
        if interval < MIN_INTERVAL {
            warn!("Summary interval {:?} is too short, using {:?}", interval, MIN_INTERVAL);
        }
        SummaryReporter {
            exchanges,
            symbols,
            fetcher,
            notifier,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `None` when no exchange returned data for any symbol.
    pub async fn build_summary(&self, now: Timestamp) -> Option<String> {
        let quotes = self.fetcher.fetch_unbounded(&self.exchanges, &self.symbols).await;
        format_summary(now, &self.symbols, &quotes)
    }

    /// Sends one summary immediately, then one per interval until shutdown.
    /// A report that panics is logged and skipped; the loop keeps its cadence.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Summary reporter started: {:?} on {} exchanges every {:?}",
            self.symbols,
            self.exchanges.len(),
            self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let closed = tokio::select! {
                _ = ticker.tick() => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            if closed {
                break;
            }
            if *shutdown.borrow() {
                break;
            }

            let report = AssertUnwindSafe(self.report_once().instrument(trace_summary()));
            if report.catch_unwind().await.is_err() {
                error!("Funding summary panicked, skipping this interval");
            }
        }

        info!("Summary reporter stopped");
    }

    async fn report_once(&self) {
        match self.build_summary(Timestamp::now()).await {
            Some(message) => match self.notifier.send(&message).await {
                Ok(()) => info!("Funding summary sent"),
                Err(e) => error!("Error sending funding summary: {}", e),
            },
            None => info!("No funding data for summary, skipping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeDescriptor;
    use crate::connectors::MockFundingConnector;
    use crate::error::Error;
    use crate::funding::FetchPolicy;
    use crate::interfaces::notifier::MockNotifier;
    use crate::types::RawFundingResponse;

    fn fetcher() -> Arc<FundingFetcher> {
        Arc::new(FundingFetcher::new(FetchPolicy {
            per_exchange_concurrency: 1,
            max_workers: 10,
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
        }))
    }

    fn quoting(name: &str, rate: Option<f64>) -> Exchange {
        let mut mock = MockFundingConnector::new();
        mock.expect_fetch_funding_rate().returning(move |_| match rate {
            Some(rate) => Ok(RawFundingResponse {
                funding_rate: Some(rate),
                interval: Some("8h".to_string()),
                ..Default::default()
            }),
            None => Err(Error::Http("connection reset".to_string())),
        });
        Exchange::new(ExchangeDescriptor::new(name), Arc::new(mock))
    }

    fn symbols() -> Vec<String> {
        vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()]
    }

    #[tokio::test]
    async fn test_summary_ranks_exchanges_per_symbol() {
        let reporter = SummaryReporter::new(
            vec![quoting("bybit", Some(-0.0001)), quoting("hyperliquid", Some(0.0002))],
            symbols(),
            fetcher(),
            Arc::new(MockNotifier::new()),
            Duration::from_secs(1800),
        );

        let text = reporter.build_summary(Timestamp::from_millis(0)).await.unwrap();

        assert!(text.starts_with("📊 <b>Funding Rate Summary</b>\n🕐 1970-01-01 00:00 UTC\n\n<b>BTC</b>\n"));
        let hyperliquid = text.find("🟢 <b>hyperliquid</b>").unwrap();
        let bybit = text.find("🔴 <b>bybit</b>").unwrap();
        assert!(hyperliquid < bybit);
        assert!(text.contains("<b>SOL</b>"));
    }

    #[tokio::test]
    async fn test_summary_is_none_without_data() {
        let reporter = SummaryReporter::new(
            vec![quoting("bybit", None), quoting("okx", None)],
            symbols(),
            fetcher(),
            Arc::new(MockNotifier::new()),
            Duration::from_secs(1800),
        );

        assert!(reporter.build_summary(Timestamp::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_run_sends_first_summary_immediately() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|text: &str| text.contains("Funding Rate Summary"))
            .times(1)
            .returning(|_| Ok(()));

        let reporter = Arc::new(SummaryReporter::new(
            vec![quoting("okx", Some(0.0001))],
            symbols(),
            fetcher(),
            Arc::new(notifier),
            Duration::from_secs(3600),
        ));

        let (tx, rx) = watch::channel(false);
        let runner = reporter.clone();
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_| Ok(()));

        let reporter = Arc::new(SummaryReporter::new(
            vec![quoting("okx", Some(0.0001))],
            symbols(),
            fetcher(),
            Arc::new(notifier),
            Duration::ZERO,
        ));
        assert_eq!(reporter.interval(), MIN_INTERVAL);

        let (tx, rx) = watch::channel(false);
        let runner = reporter.clone();
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
