use std::sync::Once;
use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Fetch metrics
    pub static ref FETCH_ATTEMPTS: IntCounter = IntCounter::new(
        "funding_fetch_attempts_total",
        "Total number of connector calls, retries included"
    ).unwrap();

    pub static ref FETCH_FAILURES: IntCounter = IntCounter::new(
        "funding_fetch_failures_total",
        "Total number of failed connector calls or normalizations"
    ).unwrap();

    pub static ref QUOTES_COLLECTED: IntCounter = IntCounter::new(
        "funding_quotes_collected_total",
        "Total number of normalized funding quotes"
    ).unwrap();

    pub static ref PERSISTENCE_FAILURES: IntCounter = IntCounter::new(
        "funding_persistence_failures_total",
        "Total number of failed persistence writes"
    ).unwrap();

    // Detection metrics
    pub static ref OPPORTUNITIES_DETECTED: Counter = Counter::new(
        "arbitrage_opportunities_detected_total",
        "Total number of best-pair opportunities detected"
    ).unwrap();

    pub static ref LAST_CYCLE_QUOTES: IntGauge = IntGauge::new(
        "funding_last_cycle_quotes",
        "Quotes gathered by the most recent cycle"
    ).unwrap();

    // Notification metrics
    pub static ref NOTIFICATIONS_SENT: IntCounter = IntCounter::new(
        "notifications_sent_total",
        "Total number of notifications dispatched"
    ).unwrap();

    pub static ref NOTIFICATIONS_SUPPRESSED: IntCounter = IntCounter::new(
        "notifications_suppressed_total",
        "Total number of notifications held back by the cooldown"
    ).unwrap();

    pub static ref NOTIFICATION_FAILURES: IntCounter = IntCounter::new(
        "notification_failures_total",
        "Total number of failed notification dispatches"
    ).unwrap();

    // Cycle metrics
    pub static ref CYCLE_FAILURES: IntCounter = IntCounter::new(
        "poll_cycle_failures_total",
        "Total number of aborted polling cycles"
    ).unwrap();

    pub static ref CYCLE_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "poll_cycle_latency_seconds",
            "Polling cycle latency"
        ).buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0])
    ).unwrap();
}

static REGISTER: Once = Once::new();

/// Registers every collector with [`REGISTRY`]. Later calls are no-ops.
pub fn register_metrics() {
    REGISTER.call_once(register_all);
}

fn register_all() {
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(FETCH_FAILURES.clone()),
        Box::new(QUOTES_COLLECTED.clone()),
        Box::new(PERSISTENCE_FAILURES.clone()),
        Box::new(OPPORTUNITIES_DETECTED.clone()),
        Box::new(LAST_CYCLE_QUOTES.clone()),
        Box::new(NOTIFICATIONS_SENT.clone()),
        Box::new(NOTIFICATIONS_SUPPRESSED.clone()),
        Box::new(NOTIFICATION_FAILURES.clone()),
        Box::new(CYCLE_FAILURES.clone()),
        Box::new(CYCLE_LATENCY.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::error!("Failed to register metric: {}", e);
        }
    }
}

/// Renders the registry in the Prometheus text exposition format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}
