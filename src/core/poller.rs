use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;
use crate::arbitrage::{ArbitrageDetector, Detection, NotificationGatekeeper};
use crate::config::PollerConfig;
use crate::connectors::{Exchange, StakingSource};
use crate::core::state_machine::{CycleState, StateMachine};
use crate::error::{Error, Result};
use crate::funding::FundingFetcher;
use crate::interfaces::{FundingStore, Notifier};
use crate::notify::format_opportunity;
use crate::observability::metrics::{
    CYCLE_FAILURES, CYCLE_LATENCY, LAST_CYCLE_QUOTES, NOTIFICATIONS_SENT,
    NOTIFICATIONS_SUPPRESSED, NOTIFICATION_FAILURES, OPPORTUNITIES_DETECTED,
    PERSISTENCE_FAILURES,
};
use crate::observability::tracing::trace_cycle;
use crate::types::{ArbitrageOpportunity, FundingQuote, StakingSnapshot, Timestamp};

/// The venue whose own markets and staking pool are recorded every cycle.
pub struct HomeVenue {
    pub exchange: Exchange,
    pub symbols: Vec<String>,
    pub staking: Option<Arc<dyn StakingSource>>,
}

#[derive(Clone, Debug)]
pub struct PollSchedule {
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule {
            poll_interval: Duration::from_secs(300),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&PollerConfig> for PollSchedule {
    fn from(config: &PollerConfig) -> Self {
        PollSchedule {
            poll_interval: config.poll_interval(),
            error_backoff: config.error_backoff(),
        }
    }
}

/// What one completed cycle saw and did.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Quotes fed to the detector, home-pass additions included.
    pub quotes: usize,
    pub home_quotes_merged: usize,
    pub detection: Detection,
    pub notified: usize,
    pub suppressed: usize,
    pub notification_failures: usize,
}

impl CycleReport {
    pub fn is_degraded(&self) -> bool {
        self.quotes == 0
    }
}

#[derive(Default)]
struct NotifyOutcome {
    sent: usize,
    suppressed: usize,
    failed: usize,
}

/// Fixed-cadence polling loop: fetch, detect, notify, sleep.
///
/// A cycle that fails is logged and retried after the short backoff; a
/// cycle that completes, even with zero quotes, sleeps the full interval.
pub struct FundingPoller {
    exchanges: Vec<Exchange>,
    symbols: Vec<String>,
    fetcher: Arc<FundingFetcher>,
    detector: ArbitrageDetector,
    gatekeeper: NotificationGatekeeper,
    notifier: Arc<dyn Notifier>,
    store: Option<Arc<dyn FundingStore>>,
    home: Option<HomeVenue>,
    schedule: PollSchedule,
    cooldown: Duration,
    notifications_enabled: bool,
    state: StateMachine,
}

impl FundingPoller {
    pub fn new(
        exchanges: Vec<Exchange>,
        symbols: Vec<String>,
        fetcher: Arc<FundingFetcher>,
        detector: ArbitrageDetector,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        FundingPoller {
            exchanges,
            symbols,
            fetcher,
            detector,
            gatekeeper: NotificationGatekeeper::new(),
            notifier,
            store: None,
            home: None,
            schedule: PollSchedule::default(),
            cooldown: Duration::from_secs(24 * 3600),
            notifications_enabled: true,
            state: StateMachine::new(),
        }
    }

    /// Sink for staking snapshots. Funding quotes are persisted by the fetcher.
    pub fn with_store(mut self, store: Arc<dyn FundingStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_home(mut self, home: HomeVenue) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    /// Runs cycles until `shutdown` flips to true or its sender is dropped.
    /// An in-progress cycle always completes; the signal is observed while sleeping.
    /// A cycle that panics counts as a failed cycle and backs off like one.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Funding poller started: {} exchanges, {} symbols, every {:?}",
            self.exchanges.len(),
            self.symbols.len(),
            self.schedule.poll_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.guarded_cycle().await {
                Ok(report) => {
                    if report.is_degraded() {
                        warn!("Cycle {} gathered no quotes", report.cycle_id);
                    }
                    info!(
                        "Cycle {} done: {} quotes, {} opportunities, {} notified, {} suppressed",
                        report.cycle_id,
                        report.quotes,
                        report.detection.best.len(),
                        report.notified,
                        report.suppressed
                    );
                    self.schedule.poll_interval
                }
                Err(e) => {
                    CYCLE_FAILURES.inc();
                    error!(
                        "Cycle failed: {}. Retrying in {:?}",
                        e, self.schedule.error_backoff
                    );
                    self.schedule.error_backoff
                }
            };

            self.state.transition(CycleState::Sleeping);
            let closed = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                changed = shutdown.changed() => changed.is_err(),
            };
            self.state.transition(CycleState::Idle);

            if closed {
                break;
            }
        }

        info!("Funding poller stopped");
    }

    async fn guarded_cycle(&self) -> Result<CycleReport> {
        AssertUnwindSafe(self.run_cycle())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::Cycle(panic_message(panic.as_ref()))))
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let timer = CYCLE_LATENCY.start_timer();
        let result = self.cycle(cycle_id).instrument(trace_cycle(&cycle_id)).await;
        timer.observe_duration();
        result
    }

    async fn cycle(&self, cycle_id: Uuid) -> Result<CycleReport> {
        self.state.transition(CycleState::Fetching);

        let home_quotes = match &self.home {
            Some(home) => self.poll_home(home).await?,
            None => Vec::new(),
        };

        let mut quotes = self.fetcher.fetch_all(&self.exchanges, &self.symbols).await;
        let home_quotes_merged = merge_missing(&mut quotes, home_quotes);
        LAST_CYCLE_QUOTES.set(quotes.len() as i64);

        self.state.transition(CycleState::Detecting);
        let detection = self.detector.detect(&quotes);
        OPPORTUNITIES_DETECTED.inc_by(detection.best.len() as f64);

        self.state.transition(CycleState::Notifying);
        let outcome = self.notify(&detection.best).await;

        Ok(CycleReport {
            cycle_id,
            quotes: quotes.len(),
            home_quotes_merged,
            detection,
            notified: outcome.sent,
            suppressed: outcome.suppressed,
            notification_failures: outcome.failed,
        })
    }

    /// Staking snapshot plus the home venue's own symbol set, persisted only.
    async fn poll_home(&self, home: &HomeVenue) -> Result<Vec<FundingQuote>> {
        if let Some(staking) = &home.staking {
            let snapshot = staking.fetch_staking().await.map_err(|e| {
                Error::Cycle(format!("staking snapshot from {}: {}", home.exchange.name(), e))
            })?;
            info!(
                "{} staking APY {:.2}%, share price {}",
                home.exchange.name(),
                snapshot.apy,
                snapshot.share_price
            );
            self.persist_snapshot(snapshot);
        }

        Ok(self
            .fetcher
            .fetch_all(std::slice::from_ref(&home.exchange), &home.symbols)
            .await)
    }

    fn persist_snapshot(&self, snapshot: StakingSnapshot) {
        let Some(store) = self.store.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = store.insert_staking_snapshot(&snapshot).await {
                PERSISTENCE_FAILURES.inc();
                warn!("Failed to persist staking snapshot: {}", e);
            }
        });
    }

    async fn notify(&self, best: &[ArbitrageOpportunity]) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();
        if !self.notifications_enabled {
            return outcome;
        }

        for opportunity in best {
            let key = opportunity.key();
            if !self.gatekeeper.should_send(&key, Timestamp::now(), self.cooldown) {
                NOTIFICATIONS_SUPPRESSED.inc();
                outcome.suppressed += 1;
                continue;
            }

            // The cooldown is already recorded, so a failed send is not retried this window.
            match self.notifier.send(&format_opportunity(opportunity)).await {
                Ok(()) => {
                    NOTIFICATIONS_SENT.inc();
                    outcome.sent += 1;
                    info!(
                        "Notified {} spread {:.4}%/h ({:.2}%/y)",
                        key, opportunity.spread_hourly, opportunity.spread_yearly
                    );
                }
                Err(e) => {
                    NOTIFICATION_FAILURES.inc();
                    outcome.failed += 1;
                    error!("Failed to send notification for {}: {}", key, e);
                }
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown payload".to_string());
    format!("cycle panicked: {}", detail)
}

/// Appends each extra quote whose (exchange, symbol) is not already present.
fn merge_missing(quotes: &mut Vec<FundingQuote>, extra: Vec<FundingQuote>) -> usize {
    let present: HashSet<(String, String)> = quotes
        .iter()
        .map(|q| (q.exchange.clone(), q.symbol.clone()))
        .collect();
    let before = quotes.len();

    quotes.extend(
        extra
            .into_iter()
            .filter(|q| !present.contains(&(q.exchange.clone(), q.symbol.clone()))),
    );

    quotes.len() - before
}
