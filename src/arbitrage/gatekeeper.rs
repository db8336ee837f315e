use std::time::Duration;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use crate::types::{OpportunityKey, Timestamp};

/// Per-opportunity notification cooldown.
///
/// The check and the update for one key happen under the same shard lock,
/// so two concurrent callers can never both be allowed inside one window.
/// State lives in memory only and is lost on restart.
pub struct NotificationGatekeeper {
    last_sent: DashMap<OpportunityKey, Timestamp>,
}

impl NotificationGatekeeper {
    pub fn new() -> Self {
        NotificationGatekeeper {
            last_sent: DashMap::new(),
        }
    }

    /// Returns true and records `now` if `key` was never allowed or its last
    /// allowance is at least `cooldown` old. Returns false and leaves the
    /// record untouched otherwise.
    pub fn should_send(&self, key: &OpportunityKey, now: Timestamp, cooldown: Duration) -> bool {
        match self.last_sent.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                // Timestamp subtraction saturates, so a clock that went backwards reads as zero elapsed.
                if now - *slot.get() >= cooldown {
                    slot.insert(now);
                    true
                } else {
                    tracing::debug!("Suppressing {} inside cooldown", key);
                    false
                }
            }
        }
    }

    pub fn last_sent(&self, key: &OpportunityKey) -> Option<Timestamp> {
        self.last_sent.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_sent.is_empty()
    }
}

impl Default for NotificationGatekeeper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const HOUR_MS: u64 = 3_600_000;

    fn key() -> OpportunityKey {
        OpportunityKey::new("BTC", "binance", "bybit")
    }

    #[test]
    fn test_second_call_inside_cooldown_is_suppressed() {
        let gatekeeper = NotificationGatekeeper::new();
        let now = Timestamp::from_millis(1_000);
        let cooldown = Duration::from_secs(24 * 3600);

        assert!(gatekeeper.should_send(&key(), now, cooldown));
        assert!(!gatekeeper.should_send(&key(), now, cooldown));
    }

    #[test]
    fn test_zero_cooldown_always_allows() {
        let gatekeeper = NotificationGatekeeper::new();
        let now = Timestamp::from_millis(1_000);

        assert!(gatekeeper.should_send(&key(), now, Duration::ZERO));
        assert!(gatekeeper.should_send(&key(), now, Duration::ZERO));
    }

    #[test]
    fn test_cooldown_window_expires() {
        let gatekeeper = NotificationGatekeeper::new();
        let cooldown = Duration::from_secs(24 * 3600);
        let t0 = Timestamp::from_millis(10 * HOUR_MS);

        assert!(gatekeeper.should_send(&key(), t0, cooldown));
        assert!(!gatekeeper.should_send(&key(), Timestamp::from_millis(11 * HOUR_MS), cooldown));
        assert!(gatekeeper.should_send(&key(), Timestamp::from_millis(35 * HOUR_MS), cooldown));
        assert_eq!(gatekeeper.last_sent(&key()), Some(Timestamp::from_millis(35 * HOUR_MS)));
    }

    #[test]
    fn test_suppressed_call_does_not_extend_window() {
        let gatekeeper = NotificationGatekeeper::new();
        let cooldown = Duration::from_millis(10 * HOUR_MS);

        assert!(gatekeeper.should_send(&key(), Timestamp::from_millis(0), cooldown));
        assert!(!gatekeeper.should_send(&key(), Timestamp::from_millis(9 * HOUR_MS), cooldown));
        assert!(gatekeeper.should_send(&key(), Timestamp::from_millis(10 * HOUR_MS), cooldown));
    }

    #[test]
    fn test_clock_regression_counts_as_no_time_elapsed() {
        let gatekeeper = NotificationGatekeeper::new();
        let cooldown = Duration::from_secs(60);

        assert!(gatekeeper.should_send(&key(), Timestamp::from_millis(100_000), cooldown));
        assert!(!gatekeeper.should_send(&key(), Timestamp::from_millis(1_000), cooldown));
    }

    #[test]
    fn test_keys_are_independent() {
        let gatekeeper = NotificationGatekeeper::new();
        let now = Timestamp::from_millis(0);
        let cooldown = Duration::from_secs(3600);

        assert!(gatekeeper.should_send(&key(), now, cooldown));
        assert!(gatekeeper.should_send(&OpportunityKey::new("BTC", "bybit", "binance"), now, cooldown));
        assert!(gatekeeper.should_send(&OpportunityKey::new("ETH", "binance", "bybit"), now, cooldown));
        assert_eq!(gatekeeper.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_callers_allow_exactly_one() {
        let gatekeeper = Arc::new(NotificationGatekeeper::new());
        let now = Timestamp::from_millis(0);
        let cooldown = Duration::from_secs(3600);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let gatekeeper = gatekeeper.clone();
            handles.push(tokio::spawn(async move {
                gatekeeper.should_send(&key(), now, cooldown)
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 1);
    }
}
