//! Fixed-interval polling with a hard wall-clock deadline.
//!
//! Every wait in the flow (auth confirmation, generation completion,
//! extraction attempts) is the same shape: probe the page, sleep a fixed
//! interval, give up when the deadline passes. There is no backoff and no
//! jitter; the page either reaches the wanted state or it does not.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Default sleep between DOM probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Default hard cap on the generation wait.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(240);

/// Default hard cap on the sign-in wait (long enough for a human to finish
/// the GitHub dance in a headful window).
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(180);

/// Default cap on a single page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Attempts each extraction strategy gets before the chain moves on.
pub const DEFAULT_STRATEGY_ATTEMPTS: u32 = 3;

/// Fixed sleep between extraction attempts.
pub const DEFAULT_STRATEGY_DELAY: Duration = Duration::from_secs(2);

/// A fixed-interval polling schedule bounded by a hard deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed sleep between probe attempts.
    pub interval: Duration,
    /// Wall-clock budget for the whole loop.
    pub deadline: Duration,
}

impl PollPolicy {
    /// Creates a policy with the given interval and deadline.
    #[must_use]
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Policy for the generation wait.
    #[must_use]
    pub fn generation() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_GENERATION_TIMEOUT)
    }

    /// Policy for the sign-in wait.
    #[must_use]
    pub fn auth() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_AUTH_TIMEOUT)
    }

    /// Whether another sleep would push past the deadline.
    #[must_use]
    pub fn exhausted(&self, started: Instant) -> bool {
        started.elapsed() >= self.deadline
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::generation()
    }
}

/// Result of a polling loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value before the deadline.
    Completed {
        /// The probe's value.
        value: T,
        /// Number of probe attempts made (including the successful one).
        attempts: u32,
    },
    /// The deadline passed without the probe producing a value.
    TimedOut {
        /// Number of probe attempts made.
        attempts: u32,
        /// Total time spent polling.
        waited: Duration,
    },
}

impl<T> PollOutcome<T> {
    /// Returns the value when the poll completed.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Completed { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }

    /// Whether the poll hit its deadline.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Polls `probe` at the policy's fixed interval until it returns `Some` or
/// the deadline passes.
///
/// The probe runs once immediately; the sleep happens between attempts, not
/// before the first one. Probe errors are the caller's concern — a probe
/// that can fail should map its error to `None` (and log it) so the loop
/// keeps going.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(value) = probe().await {
            debug!(attempts, elapsed_ms = started.elapsed().as_millis() as u64, "poll completed");
            return PollOutcome::Completed { value, attempts };
        }

        if policy.exhausted(started) {
            let waited = started.elapsed();
            debug!(attempts, waited_ms = waited.as_millis() as u64, "poll deadline reached");
            return PollOutcome::TimedOut { attempts, waited };
        }

        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_poll_policy_defaults() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(policy.deadline, DEFAULT_GENERATION_TIMEOUT);
    }

    #[test]
    fn test_poll_policy_auth_uses_auth_deadline() {
        let policy = PollPolicy::auth();
        assert_eq!(policy.deadline, DEFAULT_AUTH_TIMEOUT);
    }

    #[test]
    fn test_poll_outcome_into_value() {
        let completed = PollOutcome::Completed {
            value: 7_u32,
            attempts: 2,
        };
        assert_eq!(completed.into_value(), Some(7));

        let timed_out: PollOutcome<u32> = PollOutcome::TimedOut {
            attempts: 5,
            waited: Duration::from_secs(10),
        };
        assert!(timed_out.is_timed_out());
        assert_eq!(timed_out.into_value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_returns_on_first_success_without_sleeping() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(10));
        let outcome = poll_until(policy, || async { Some(42_u32) }).await;
        match outcome {
            PollOutcome::Completed { value, attempts } => {
                assert_eq!(value, 42);
                assert_eq!(attempts, 1, "first probe should succeed immediately");
            }
            PollOutcome::TimedOut { .. } => panic!("expected completion"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_retries_until_probe_succeeds() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let outcome = poll_until(policy, || async move {
            let n = calls_ref.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= 3 { Some(n) } else { None }
        })
        .await;

        match outcome {
            PollOutcome::Completed { value, attempts } => {
                assert_eq!(value, 3);
                assert_eq!(attempts, 3, "probe should have run exactly 3 times");
            }
            PollOutcome::TimedOut { .. } => panic!("expected completion within deadline"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out_when_probe_never_succeeds() {
        let policy = PollPolicy::new(Duration::from_secs(2), Duration::from_secs(7));
        let outcome: PollOutcome<u32> = poll_until(policy, || async { None }).await;

        match outcome {
            PollOutcome::TimedOut { attempts, waited } => {
                // 7s deadline with 2s interval: probes at 0s, 2s, 4s, 6s, then
                // the 8s mark is past the deadline.
                assert_eq!(attempts, 5);
                assert!(waited >= Duration::from_secs(7));
            }
            PollOutcome::Completed { .. } => panic!("expected timeout"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_zero_deadline_probes_exactly_once() {
        let policy = PollPolicy::new(Duration::from_secs(1), Duration::ZERO);
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;

        let outcome: PollOutcome<u32> = poll_until(policy, || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            None
        })
        .await;

        assert!(outcome.is_timed_out());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "zero deadline still gets one probe");
    }
}
