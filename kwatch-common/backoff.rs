use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::time::Duration;

#[cfg(test)]
#[path = "./backoff.tests.rs"]
mod backoff_tests;

/// Additive throttle for watch-stream errors: failure `n` sleeps `throttle * (n + 1)`,
/// capped at 60 seconds. Reset on the first healthy event.
pub struct ThrottleBackoff {
    throttle: Duration,
    attempt: u32,
}

impl ThrottleBackoff {
    const MAX_DELAY: Duration = Duration::from_secs(60);

    /// Creates a throttle with the given base delay.
    pub fn new(throttle: Duration) -> Self {
        Self { throttle, attempt: 0 }
    }

    /// Returns the delay for the current failure and advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.throttle.saturating_mul(self.attempt.saturating_add(1)).min(Self::MAX_DELAY);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Clears the failure streak.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Delay schedule for webhook retries.\
/// The first attempt runs immediately; attempt `n` waits `factor * 2^(n-1)` seconds.
pub struct RetrySchedule {
    backoff: ExponentialBackoff,
    remaining: u32,
}

impl RetrySchedule {
    /// Creates a schedule allowing `total` attempts with the given backoff factor in seconds.
    pub fn new(total: u32, factor: f64) -> Self {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs_f64(factor.max(0.0)))
            .with_factor(2.0)
            .without_max_times()
            .build();

        Self {
            backoff,
            remaining: total.saturating_sub(1),
        }
    }

    /// Returns the delay to sleep before the next attempt, or `None` when attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        self.backoff.next()
    }
}
