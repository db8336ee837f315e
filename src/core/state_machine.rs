use tokio::sync::watch;

/// Phase of the polling loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleState {
    Idle,
    Fetching,
    Detecting,
    Notifying,
    Sleeping,
}

impl CycleState {
    /// Successor on the happy path. An aborted cycle goes straight to `Sleeping`.
    pub fn next(self) -> CycleState {
        match self {
            CycleState::Idle => CycleState::Fetching,
            CycleState::Fetching => CycleState::Detecting,
            CycleState::Detecting => CycleState::Notifying,
            CycleState::Notifying => CycleState::Sleeping,
            CycleState::Sleeping => CycleState::Idle,
        }
    }

    pub fn can_transition_to(self, target: CycleState) -> bool {
        target == self.next() || target == CycleState::Sleeping || target == CycleState::Idle
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CycleState::Idle => "idle",
            CycleState::Fetching => "fetching",
            CycleState::Detecting => "detecting",
            CycleState::Notifying => "notifying",
            CycleState::Sleeping => "sleeping",
        };
        f.write_str(name)
    }
}

/// Tracks the current [`CycleState`] and publishes every transition.
pub struct StateMachine {
    state: watch::Sender<CycleState>,
}

impl StateMachine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CycleState::Idle);
        StateMachine { state }
    }

    pub fn current(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    pub fn transition(&self, target: CycleState) {
        let previous = self.state.send_replace(target);
        if !previous.can_transition_to(target) {
            tracing::warn!("Unexpected cycle transition {} -> {}", previous, target);
        } else {
            tracing::trace!("Cycle state {} -> {}", previous, target);
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_a_loop() {
        let mut state = CycleState::Idle;
        let mut seen = vec![state];
        for _ in 0..5 {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                CycleState::Idle,
                CycleState::Fetching,
                CycleState::Detecting,
                CycleState::Notifying,
                CycleState::Sleeping,
                CycleState::Idle,
            ]
        );
    }

    #[test]
    fn test_abort_jumps_to_sleeping() {
        assert!(CycleState::Fetching.can_transition_to(CycleState::Sleeping));
        assert!(CycleState::Detecting.can_transition_to(CycleState::Sleeping));
        assert!(!CycleState::Idle.can_transition_to(CycleState::Notifying));
    }

    #[test]
    fn test_subscribers_observe_transitions() {
        let machine = StateMachine::new();
        let receiver = machine.subscribe();

        machine.transition(CycleState::Fetching);

        assert_eq!(machine.current(), CycleState::Fetching);
        assert_eq!(*receiver.borrow(), CycleState::Fetching);
    }
}
