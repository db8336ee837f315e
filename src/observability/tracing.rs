use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use crate::config::LoggingConfig;

pub fn trace_cycle(cycle_id: &Uuid) -> Span {
    tracing::info_span!(
        "poll_cycle",
        cycle_id = %cycle_id,
    )
}

pub fn trace_fetch(exchange: &str, symbol: &str) -> Span {
    tracing::debug_span!(
        "fetch_funding",
        exchange = %exchange,
        symbol = %symbol,
    )
}

pub fn trace_summary() -> Span {
    tracing::info_span!("funding_summary")
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
