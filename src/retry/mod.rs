//! Retry timing for the two reconnection paths
//!
//! `RetryPolicy` governs the bounded initial-open procedure (fixed delay,
//! capped attempt count, one user-visible alert on exhaustion).
//! `ReconnectSchedule` governs resumption after a mid-session drop: a short
//! fixed ladder of delays, after which the connection is considered
//! permanently closed.

use std::time::Duration;

use rand::Rng;

/// Bounded retry policy for the initial open
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum transport opens per start cycle, the initial one included
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
        }
    }

    /// Whether another open may be scheduled after `failed_opens` failures
    pub fn allows_retry(&self, failed_opens: u32) -> bool {
        failed_opens < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 5000)
    }
}

/// Delay ladder walked when a live connection drops
#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    delays: Vec<Duration>,
    /// Jitter factor (0.0 to 1.0) applied to each non-zero delay
    jitter_factor: f64,
    next_index: usize,
}

impl ReconnectSchedule {
    pub fn new(delays_ms: &[u64], jitter_factor: f64) -> Self {
        Self {
            delays: delays_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
            jitter_factor,
            next_index: 0,
        }
    }

    /// Next delay to wait before a resume attempt, or `None` once the ladder
    /// is exhausted (permanent close).
    pub fn next_delay(&mut self) -> Option<Duration> {
        let base = *self.delays.get(self.next_index)?;
        self.next_index += 1;

        if self.jitter_factor <= 0.0 || base.is_zero() {
            return Some(base);
        }

        let base_ms = base.as_millis() as f64;
        let jitter_range = base_ms * self.jitter_factor;
        let jitter = rand::rng().random_range(-jitter_range..jitter_range);
        Some(Duration::from_millis((base_ms + jitter).max(0.0) as u64))
    }

    /// Rewind after a successful resume
    pub fn reset(&mut self) {
        self.next_index = 0;
    }

    pub fn attempts_made(&self) -> usize {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_caps_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.retry_delay, Duration::from_millis(5000));

        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(4));
        assert!(!policy.allows_retry(5));
        assert!(!policy.allows_retry(6));
    }

    #[test]
    fn test_schedule_walks_ladder_then_exhausts() {
        // No jitter for predictable testing
        let mut schedule = ReconnectSchedule::new(&[0, 2_000, 10_000, 30_000], 0.0);

        assert_eq!(schedule.next_delay(), Some(Duration::ZERO));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(10)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs(30)));
        assert_eq!(schedule.next_delay(), None);
        assert_eq!(schedule.attempts_made(), 4);
    }

    #[test]
    fn test_schedule_reset_rewinds() {
        let mut schedule = ReconnectSchedule::new(&[0, 2_000], 0.0);
        schedule.next_delay();
        schedule.next_delay();
        assert_eq!(schedule.next_delay(), None);

        schedule.reset();
        assert_eq!(schedule.attempts_made(), 0);
        assert_eq!(schedule.next_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn test_jitter_stays_near_base_delay() {
        let mut schedule = ReconnectSchedule::new(&[10_000], 0.1);
        let delay = schedule.next_delay().unwrap();
        assert!(delay >= Duration::from_millis(9_000));
        assert!(delay <= Duration::from_millis(11_000));
    }
}
