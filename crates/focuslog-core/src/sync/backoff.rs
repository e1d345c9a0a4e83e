//! Failure backoff for the scheduler.

use std::time::{Duration, Instant};

use rand::Rng;

/// Exponential backoff with jitter. `delay(n)` for the nth consecutive
/// failure is uniform in `[cap(n)/2, cap(n)]` where `cap(n)` doubles from
/// `base` and saturates at `max`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl BackoffPolicy {
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Jittered delay before the next attempt after `failures` consecutive
    /// failed cycles. Zero failures means no delay.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let ceiling = self
            .base
            .saturating_mul(2_u32.saturating_pow(failures - 1))
            .min(self.max);
        let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
        let jittered = rand::rng().random_range(ceiling_ms / 2..=ceiling_ms);
        Duration::from_millis(jittered)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(300))
    }
}

/// Mutable backoff state the scheduler consults before honoring a
/// non-manual trigger.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    failures: u32,
    not_before: Option<Instant>,
}

impl Backoff {
    #[must_use]
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            failures: 0,
            not_before: None,
        }
    }

    /// Whether the backoff window is still open.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.not_before.is_some_and(|at| Instant::now() < at)
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        let delay = self.policy.delay(self.failures);
        self.not_before = Some(Instant::now() + delay);
        tracing::debug!(failures = self.failures, ?delay, "sync backoff extended");
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.not_before = None;
    }

    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}
