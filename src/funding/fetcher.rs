use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn, Instrument};
use crate::config::PollerConfig;
use crate::config::exchange::base_symbol;
use crate::connectors::Exchange;
use crate::funding::normalizer::normalize;
use crate::interfaces::FundingStore;
use crate::observability::metrics::{
    FETCH_ATTEMPTS, FETCH_FAILURES, PERSISTENCE_FAILURES, QUOTES_COLLECTED,
};
use crate::observability::tracing::trace_fetch;
use crate::types::{FundingQuote, Timestamp};

#[derive(Clone, Debug)]
pub struct FetchPolicy {
    pub per_exchange_concurrency: usize,
    pub max_workers: usize,
    /// Total attempts per (exchange, symbol), the first call included.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            per_exchange_concurrency: 2,
            max_workers: 10,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl From<&PollerConfig> for FetchPolicy {
    fn from(config: &PollerConfig) -> Self {
        FetchPolicy {
            per_exchange_concurrency: config.per_exchange_concurrency.max(1),
            max_workers: config.max_workers.max(1),
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        }
    }
}

/// Fans out one task per (exchange, symbol) and joins them all.
///
/// ## Limits
/// - **Per exchange**: at most `per_exchange_concurrency` calls in flight
/// - **Global**: at most `max_workers` calls in flight
///
/// Permits are RAII guards held by the task, so they are released on success,
/// on failure and after retries are exhausted alike.
///
/// ## Failure isolation
/// A pair that keeps failing is logged and left out of the result. Siblings
/// are never cancelled and the call itself never fails; an empty result is a
/// degraded cycle, not an error.
pub struct FundingFetcher {
    policy: FetchPolicy,
    store: Option<Arc<dyn FundingStore>>,
}

impl FundingFetcher {
    pub fn new(policy: FetchPolicy) -> Self {
        FundingFetcher {
            policy,
            store: None,
        }
    }

    /// Every quote is handed to `store` as soon as it normalizes.
    pub fn with_store(mut self, store: Arc<dyn FundingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub async fn fetch_all(&self, exchanges: &[Exchange], symbols: &[String]) -> Vec<FundingQuote> {
        self.fan_out(exchanges, symbols, Some(self.policy.per_exchange_concurrency), true)
            .await
    }

    /// Same retry policy without the per-exchange cap and without
    /// persistence; meant for small fixed sets.
    pub async fn fetch_unbounded(&self, exchanges: &[Exchange], symbols: &[String]) -> Vec<FundingQuote> {
        self.fan_out(exchanges, symbols, None, false).await
    }

    async fn fan_out(
        &self,
        exchanges: &[Exchange],
        symbols: &[String],
        per_exchange: Option<usize>,
        persist: bool,
    ) -> Vec<FundingQuote> {
        let workers = Arc::new(Semaphore::new(self.policy.max_workers.max(1)));
        let limiters: HashMap<&str, Arc<Semaphore>> = match per_exchange {
            Some(limit) => exchanges
                .iter()
                .map(|e| (e.name(), Arc::new(Semaphore::new(limit.max(1)))))
                .collect(),
            None => HashMap::new(),
        };

        let mut tasks = JoinSet::new();
        let mut slots = 0;
        for exchange in exchanges {
            let limiter = limiters.get(exchange.name()).cloned();

            for symbol in symbols {
                let slot = slots;
                slots += 1;
                let base = base_symbol(symbol).to_string();
                let span = trace_fetch(exchange.name(), &base);
                let exchange = exchange.clone();
                let workers = workers.clone();
                let limiter = limiter.clone();
                let policy = self.policy.clone();

                tasks.spawn(
                    async move {
                        let quote = async {
                            // Exchange slot first so a waiting task never pins a global worker.
                            let _exchange_permit = match limiter {
                                Some(limiter) => Some(limiter.acquire_owned().await.ok()?),
                                None => None,
                            };
                            let _worker_permit = workers.acquire_owned().await.ok()?;

                            fetch_with_retry(&exchange, &base, &policy).await
                        }
                        .await;
                        (slot, quote)
                    }
                    .instrument(span),
                );
            }
        }

        // Results land in completion order; slots restore exchange-then-symbol order.
        let mut ordered: Vec<Option<FundingQuote>> = vec![None; slots];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, Some(quote))) => {
                    QUOTES_COLLECTED.inc();
                    if persist {
                        self.persist(&quote);
                    }
                    ordered[slot] = Some(quote);
                }
                Ok((_, None)) => {}
                Err(e) => error!("Fetch task aborted: {}", e),
            }
        }

        ordered.into_iter().flatten().collect()
    }

    fn persist(&self, quote: &FundingQuote) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let quote = quote.clone();

        tokio::spawn(async move {
            if let Err(e) = store.insert_funding_record(&quote).await {
                PERSISTENCE_FAILURES.inc();
                warn!(
                    "Failed to persist {} {} funding record: {}",
                    quote.exchange, quote.symbol, e
                );
            }
        });
    }
}

/// Calls the connector and normalizes, retrying with a fixed delay.
pub async fn fetch_with_retry(
    exchange: &Exchange,
    base: &str,
    policy: &FetchPolicy,
) -> Option<FundingQuote> {
    let market_symbol = exchange.descriptor.market_symbol(base);
    let attempts = policy.max_retries.max(1);

    for attempt in 1..=attempts {
        FETCH_ATTEMPTS.inc();
        tracing::debug!("Fetching {}/{}", exchange.name(), market_symbol);

        let result = match exchange.connector.fetch_funding_rate(&market_symbol).await {
            Ok(raw) => normalize(&exchange.descriptor, &raw, base, Timestamp::now()),
            Err(e) => Err(e),
        };

        match result {
            Ok(quote) => return Some(quote),
            Err(e) => {
                FETCH_FAILURES.inc();
                if attempt < attempts && e.is_retryable() {
                    warn!(
                        "Error fetching {} {} (attempt {}/{}): {}. Retrying in {:?}",
                        exchange.name(), base, attempt, attempts, e, policy.retry_delay
                    );
                    tokio::time::sleep(policy.retry_delay).await;
                } else {
                    error!(
                        "Error fetching {} {} after {} attempts: {}",
                        exchange.name(), base, attempt, e
                    );
                    return None;
                }
            }
        }
    }

    None
}
