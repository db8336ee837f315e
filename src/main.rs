use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tokio::sync::watch;
use funding_arb::arbitrage::ArbitrageDetector;
use funding_arb::config::{AppConfig, ExchangeConfig};
use funding_arb::connectors::{build_exchange, build_staking_source, http_client, Exchange};
use funding_arb::core::{FundingPoller, HomeVenue, PollSchedule, SummaryReporter};
use funding_arb::funding::{FetchPolicy, FundingFetcher};
use funding_arb::interfaces::{FundingStore, Notifier};
use funding_arb::notify::{LogNotifier, TelegramNotifier};
use funding_arb::observability::metrics::register_metrics;
use funding_arb::observability::tracing::init_tracing;
use funding_arb::persistence::JsonLinesStore;
use funding_arb::utils::TaskSupervisor;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging);
    register_metrics();
    tracing::info!("Starting funding-arb ({})", env);

    let client = http_client()?;
    let exchanges = config
        .enabled_exchanges()
        .map(|exchange| build_exchange(exchange, client.clone()))
        .collect::<Result<Vec<Exchange>, _>>()
        .context("building exchange connectors")?;

    let store: Arc<dyn FundingStore> = Arc::new(JsonLinesStore::new(&config.store.dir));
    let notifier = build_notifier(&config, client.clone());

    let policy = FetchPolicy::from(&config.poller);
    let fetcher = Arc::new(FundingFetcher::new(policy.clone()).with_store(store.clone()));

    let detector = match &config.notification.require_exchange {
        Some(exchange) => ArbitrageDetector::requiring_exchange(exchange.clone()),
        None => ArbitrageDetector::new(),
    };

    let mut poller = FundingPoller::new(
        exchanges.clone(),
        config.poller.symbols.clone(),
        fetcher,
        detector,
        notifier.clone(),
    )
    .with_store(store)
    .with_schedule(PollSchedule::from(&config.poller))
    .with_cooldown(config.notification.cooldown())
    .with_notifications(config.notification.enabled);

    if let Some(home) = &config.home {
        let home_config = config
            .exchanges
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(&home.exchange))
            .cloned()
            .unwrap_or_else(|| ExchangeConfig::named(&home.exchange));
        let exchange = build_exchange(&home_config, client.clone())
            .context("building home venue connector")?;
        let staking = build_staking_source(home, client.clone())
            .context("building home venue staking source")?;

        poller = poller.with_home(HomeVenue {
            exchange,
            symbols: home.symbols.clone(),
            staking,
        });
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = TaskSupervisor::new();

    let poller = Arc::new(poller);
    let poller_rx = shutdown_rx.clone();
    supervisor.spawn("funding_poller", async move { poller.run(poller_rx).await });

    if config.summary.enabled {
        let summary_exchanges = select_exchanges(&exchanges, &config.summary.exchanges);
        // Summary fetches skip the per-exchange cap and are not persisted.
        let reporter = SummaryReporter::new(
            summary_exchanges,
            config.summary.symbols.clone(),
            Arc::new(FundingFetcher::new(policy)),
            notifier,
            config.summary.interval(),
        );
        let summary_rx = shutdown_rx.clone();
        supervisor.spawn("funding_summary", async move { reporter.run(summary_rx).await });
    }

    if config.metrics.enabled {
        let listener = funding_arb::api::bind(&config.metrics.bind_addr).await?;
        let metrics_rx = shutdown_rx.clone();
        supervisor.spawn("metrics_server", async move {
            if let Err(e) = funding_arb::api::serve(listener, metrics_rx).await {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    let unhealthy = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for ctrl-c")?;
                tracing::info!("Shutdown requested");
                break None;
            }
            _ = health.tick() => {
                if let Err(e) = supervisor.check_health() {
                    break Some(e);
                }
            }
        }
    };

    shutdown_tx.send(true).context("broadcasting shutdown")?;
    let joined = supervisor.join_all(SHUTDOWN_GRACE).await;

    if let Some(e) = unhealthy {
        return Err(e).context("background task stopped unexpectedly");
    }
    joined?;

    tracing::info!("funding-arb stopped");
    Ok(())
}

fn build_notifier(config: &AppConfig, client: reqwest::Client) -> Arc<dyn Notifier> {
    let notification = &config.notification;
    match (&notification.telegram_token, &notification.telegram_chat_id) {
        (Some(token), Some(chat_id)) if notification.enabled => Arc::new(TelegramNotifier::new(
            client,
            notification.telegram_api_base.clone(),
            token.clone(),
            chat_id.clone(),
        )),
        _ => {
            if notification.enabled {
                tracing::warn!("Telegram credentials missing, notifications go to the log");
            }
            Arc::new(LogNotifier)
        }
    }
}

fn select_exchanges(exchanges: &[Exchange], names: &[String]) -> Vec<Exchange> {
    names
        .iter()
        .filter_map(|name| {
            let found = exchanges.iter().find(|e| e.name().eq_ignore_ascii_case(name));
            if found.is_none() {
                tracing::warn!("Summary exchange {} is not enabled, skipping", name);
            }
            found.cloned()
        })
        .collect()
}
