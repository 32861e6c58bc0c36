//! Capped exponential retry scheduling shared by every acquisition engine.
//!
//! `delay(attempt) = min(base * 2^attempt, cap)`. The exponent is clamped to
//! [`ATTEMPT_CEILING`] before it is applied, so large attempt counts never
//! overflow the multiplication.

use core::time::Duration;

use crate::time::Millis;

/// Highest exponent ever applied to the base delay.
pub const ATTEMPT_CEILING: u8 = 10;

/// Connectivity retries start at 5 s.
pub const CONNECTIVITY_BASE_DELAY: Duration = Duration::from_secs(5);
/// Connectivity retries never wait longer than 5 min.
pub const CONNECTIVITY_MAX_DELAY: Duration = Duration::from_secs(300);
/// Request retries (time sync, weather) start at 1 s.
pub const REQUEST_BASE_DELAY: Duration = Duration::from_secs(1);
/// Request retries never wait longer than 8 s.
pub const REQUEST_MAX_DELAY: Duration = Duration::from_secs(8);
/// Request retries give up after three attempts until externally reset.
pub const REQUEST_MAX_ATTEMPTS: u8 = 3;

/// How many retries a policy will schedule.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RetryLimit {
    /// Stops scheduling after the given number of attempts.
    Bounded(u8),
    /// Always schedules another attempt; the counter saturates at the ceiling.
    Unbounded,
}

/// Retry bookkeeping for one acquisition engine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BackoffPolicy {
    attempt: u8,
    next_eligible: Option<Millis>,
    limit: RetryLimit,
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Creates a policy that gives up after `max_attempts` retries.
    #[must_use]
    pub const fn bounded(max_attempts: u8, base: Duration, cap: Duration) -> Self {
        Self::new(RetryLimit::Bounded(max_attempts), base, cap)
    }

    /// Creates a policy that retries forever at a capped interval.
    #[must_use]
    pub const fn unbounded(base: Duration, cap: Duration) -> Self {
        Self::new(RetryLimit::Unbounded, base, cap)
    }

    /// Policy used by the connectivity manager (5 s doubling to 300 s).
    #[must_use]
    pub const fn connectivity() -> Self {
        Self::unbounded(CONNECTIVITY_BASE_DELAY, CONNECTIVITY_MAX_DELAY)
    }

    /// Policy used by the time-sync and weather engines (3 tries, 1 s to 8 s).
    #[must_use]
    pub const fn request() -> Self {
        Self::bounded(REQUEST_MAX_ATTEMPTS, REQUEST_BASE_DELAY, REQUEST_MAX_DELAY)
    }

    const fn new(limit: RetryLimit, base: Duration, cap: Duration) -> Self {
        Self {
            attempt: 0,
            next_eligible: None,
            limit,
            base,
            cap,
        }
    }

    /// Number of retries scheduled since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u8 {
        self.attempt
    }

    /// Instant the next retry becomes due, if one is scheduled.
    #[must_use]
    pub const fn next_eligible(&self) -> Option<Millis> {
        self.next_eligible
    }

    /// Retry limit configured for this policy.
    #[must_use]
    pub const fn limit(&self) -> RetryLimit {
        self.limit
    }

    /// Delay applied when scheduling retry number `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u8) -> Duration {
        let exponent = attempt.min(ATTEMPT_CEILING);
        self.base
            .checked_mul(1_u32 << exponent)
            .map_or(self.cap, |delay| delay.min(self.cap))
    }

    /// Delay the next call to [`schedule_retry`](Self::schedule_retry) will use.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay_for(self.attempt)
    }

    /// Schedules the next retry relative to `now`.
    ///
    /// Returns the delay that was applied, or `None` when a bounded policy has
    /// already used its attempts; in that case no retry stays scheduled.
    pub fn schedule_retry(&mut self, now: Millis) -> Option<Duration> {
        match self.limit {
            RetryLimit::Bounded(max_attempts) if self.attempt >= max_attempts => {
                self.next_eligible = None;
                None
            }
            RetryLimit::Bounded(_) => {
                let delay = self.delay();
                self.next_eligible = Some(now + delay);
                self.attempt += 1;
                Some(delay)
            }
            RetryLimit::Unbounded => {
                let delay = self.delay();
                self.next_eligible = Some(now + delay);
                if self.attempt < ATTEMPT_CEILING {
                    self.attempt += 1;
                }
                Some(delay)
            }
        }
    }

    /// Returns `true` when a retry is scheduled and `now` has reached it.
    #[must_use]
    pub fn is_due(&self, now: Millis) -> bool {
        self.next_eligible
            .is_some_and(|deadline| now.has_reached(deadline))
    }

    /// Consumes a due retry so it fires only once.
    pub fn take_due(&mut self, now: Millis) -> bool {
        if self.is_due(now) {
            self.next_eligible = None;
            true
        } else {
            false
        }
    }

    /// Time left until the scheduled retry, if any.
    #[must_use]
    pub fn remaining(&self, now: Millis) -> Option<Duration> {
        self.next_eligible.map(|deadline| {
            if now.has_reached(deadline) {
                Duration::ZERO
            } else {
                deadline.duration_since(now)
            }
        })
    }

    /// Clears the attempt counter and any scheduled retry.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.next_eligible = None;
    }

    /// Returns `true` when a bounded policy has used all of its attempts.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        match self.limit {
            RetryLimit::Bounded(max_attempts) => self.attempt >= max_attempts,
            RetryLimit::Unbounded => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_policy_stops_after_budget() {
        let mut policy = BackoffPolicy::request();
        let now = Millis::from_millis(1_000);

        assert_eq!(policy.schedule_retry(now), Some(Duration::from_secs(1)));
        assert_eq!(policy.schedule_retry(now), Some(Duration::from_secs(2)));
        assert_eq!(policy.schedule_retry(now), Some(Duration::from_secs(4)));
        assert!(policy.exhausted());

        assert_eq!(policy.schedule_retry(now), None);
        assert_eq!(policy.next_eligible(), None);
        assert!(!policy.is_due(Millis::from_millis(u32::MAX / 4)));
    }

    #[test]
    fn unbounded_attempt_saturates_at_ceiling() {
        let mut policy = BackoffPolicy::connectivity();
        for _ in 0..40 {
            policy.schedule_retry(Millis::ZERO);
        }
        assert_eq!(policy.attempt(), ATTEMPT_CEILING);
        assert_eq!(policy.delay(), CONNECTIVITY_MAX_DELAY);
        assert!(!policy.exhausted());
    }

    #[test]
    fn take_due_fires_once() {
        let mut policy = BackoffPolicy::request();
        policy.schedule_retry(Millis::ZERO);

        assert!(!policy.take_due(Millis::from_millis(999)));
        assert!(policy.take_due(Millis::from_millis(1_000)));
        assert!(!policy.take_due(Millis::from_millis(1_001)));
        assert_eq!(policy.attempt(), 1);
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let mut policy = BackoffPolicy::connectivity();
        policy.schedule_retry(Millis::from_millis(10_000));

        assert_eq!(
            policy.remaining(Millis::from_millis(12_000)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            policy.remaining(Millis::from_millis(20_000)),
            Some(Duration::ZERO)
        );
    }
}
