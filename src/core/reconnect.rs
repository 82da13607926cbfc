use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use crate::core::state_machine::ConnectionState;
use crate::observability::metrics::RECONNECT_ATTEMPTS;

/// Linear backoff: the k-th retry waits `base_delay * k`.
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_attempts: u32,
}

impl LinearBackoff {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        LinearBackoff { base_delay, max_attempts }
    }

    /// Delay before retry number `attempt` (1-based), or `None` once the
    /// budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.base_delay.saturating_mul(attempt))
    }

    pub fn should_reconnect(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { attempt: u32, delay: Duration },
    GiveUp { attempts: u32 },
}

/// Tracks consecutive poll-loop failures and publishes `ConnectionState`.
///
/// Only pipeline failures reach this type; individual source failures are
/// absorbed by the fallback chain.
pub struct ReconnectSupervisor {
    backoff: LinearBackoff,
    attempt: u32,
    state: watch::Sender<ConnectionState>,
}

impl ReconnectSupervisor {
    pub fn new(backoff: LinearBackoff) -> Self {
        let (state, _) = watch::channel(ConnectionState::Starting);
        ReconnectSupervisor { backoff, attempt: 0, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn on_failure(&mut self) -> RetryDecision {
        if self.state().is_terminal() {
            return RetryDecision::GiveUp { attempts: self.attempt };
        }

        self.attempt += 1;
        RECONNECT_ATTEMPTS.inc();

        match self.backoff.next_delay(self.attempt) {
            Some(delay) => {
                warn!(
                    "Attempting to reconnect ({}/{}) in {} ms",
                    self.attempt,
                    self.backoff.max_attempts(),
                    delay.as_millis()
                );
                self.state.send_replace(ConnectionState::Reconnecting { attempt: self.attempt });
                RetryDecision::Retry { attempt: self.attempt, delay }
            }
            None => {
                let attempts = self.attempt - 1;
                self.attempt = attempts;
                error!("Max reconnection attempts ({}) reached, poll loop stopped", attempts);
                self.state.send_replace(ConnectionState::Failed { attempts });
                RetryDecision::GiveUp { attempts }
            }
        }
    }

    pub fn on_success(&mut self) {
        if self.attempt > 0 {
            info!("Poll loop recovered after {} attempt(s)", self.attempt);
        }
        self.attempt = 0;
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Connected {
                false
            } else {
                *state = ConnectionState::Connected;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn supervisor(max_attempts: u32) -> ReconnectSupervisor {
        ReconnectSupervisor::new(LinearBackoff::new(Duration::from_secs(5), max_attempts))
    }

    #[test]
    fn test_delay_grows_linearly() {
        let mut supervisor = supervisor(10);
        for k in 1..=10u32 {
            match supervisor.on_failure() {
                RetryDecision::Retry { attempt, delay } => {
                    assert_eq!(attempt, k);
                    assert_eq!(delay, Duration::from_secs(5 * k as u64));
                }
                other => panic!("unexpected {:?} at attempt {}", other, k),
            }
            assert_eq!(supervisor.state(), ConnectionState::Reconnecting { attempt: k });
        }
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut supervisor = supervisor(3);
        for _ in 0..3 {
            assert!(matches!(supervisor.on_failure(), RetryDecision::Retry { .. }));
        }
        assert_eq!(supervisor.on_failure(), RetryDecision::GiveUp { attempts: 3 });
        assert_eq!(supervisor.state(), ConnectionState::Failed { attempts: 3 });

        // Terminal: further failures schedule nothing
        assert_eq!(supervisor.on_failure(), RetryDecision::GiveUp { attempts: 3 });
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut supervisor = supervisor(10);
        supervisor.on_failure();
        supervisor.on_failure();
        supervisor.on_success();

        assert_eq!(supervisor.attempt(), 0);
        assert_eq!(supervisor.state(), ConnectionState::Connected);
        assert_eq!(
            supervisor.on_failure(),
            RetryDecision::Retry { attempt: 1, delay: Duration::from_secs(5) }
        );
    }

    #[test]
    fn test_state_watch_sees_transitions() {
        let mut supervisor = supervisor(10);
        let rx = supervisor.subscribe();
        assert_eq!(*rx.borrow(), ConnectionState::Starting);

        supervisor.on_success();
        assert_eq!(*rx.borrow(), ConnectionState::Connected);
    }

    proptest! {
        #[test]
        fn backoff_is_base_times_attempt(base_ms in 1u64..10_000, max in 1u32..50, k in 0u32..60) {
            let backoff = LinearBackoff::new(Duration::from_millis(base_ms), max);
            let expected = (k >= 1 && k <= max).then(|| Duration::from_millis(base_ms * k as u64));
            prop_assert_eq!(backoff.next_delay(k), expected);
        }
    }
}
