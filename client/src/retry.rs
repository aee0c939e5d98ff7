use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Exponential backoff with jitter for transient upstream failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.2 = ±20%)
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> Backoff<StdRng> {
        self.backoff_with_rng(StdRng::from_entropy())
    }

    pub fn backoff_with_rng<R: Rng>(&self, rng: R) -> Backoff<R> {
        Backoff {
            policy: self.clone(),
            retries: 0,
            previous: Duration::ZERO,
            rng,
        }
    }

    /// Un-jittered delay before retry number `retry` (1-based), capped
    fn nominal_delay(&self, retry: u32) -> f64 {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64())
    }
}

/// Delays between the attempts of one logical call.
///
/// Yields `max_attempts - 1` delays. Each delay is at least the previous one
/// and never more than `max_delay`, even after jitter.
#[derive(Debug)]
pub struct Backoff<R> {
    policy: RetryPolicy,
    retries: u32,
    previous: Duration,
    rng: R,
}

impl<R: Rng> Backoff<R> {
    /// Delay before the next retry, or `None` once the attempt ceiling is reached.
    ///
    /// `hint` (e.g. a `Retry-After` header) raises the delay, still capped.
    pub fn next_delay(&mut self, hint: Option<Duration>) -> Option<Duration> {
        if self.retries + 1 >= self.policy.max_attempts {
            return None;
        }
        self.retries += 1;

        let mut secs = self.policy.nominal_delay(self.retries);
        if self.policy.jitter > 0.0 {
            let spread = self.rng.gen_range(-self.policy.jitter..=self.policy.jitter);
            secs *= 1.0 + spread;
        }

        let delay = Duration::from_secs_f64(secs.max(0.0))
            .max(hint.unwrap_or_default())
            .max(self.previous)
            .min(self.policy.max_delay);

        self.previous = delay;
        Some(delay)
    }

    /// Retries handed out so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl<R: Rng> Iterator for Backoff<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.next_delay(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(policy: &RetryPolicy, seed: u64) -> Backoff<StdRng> {
        policy.backoff_with_rng(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_default_policy_without_jitter() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        let delays: Vec<_> = seeded(&policy, 1).collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
    }

    #[test]
    fn test_delays_non_decreasing_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 12,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: 0.5,
        };

        for seed in 0..50 {
            let delays: Vec<_> = seeded(&policy, seed).collect();
            assert_eq!(delays.len(), 11);
            for pair in delays.windows(2) {
                assert!(pair[0] <= pair[1], "seed {seed}: {:?}", delays);
            }
            assert!(delays.iter().all(|d| *d <= policy.max_delay));
        }
    }

    #[test]
    fn test_hint_raises_delay_but_not_past_cap() {
        let policy = RetryPolicy {
            jitter: 0.0,
            ..RetryPolicy::default()
        };
        let mut backoff = seeded(&policy, 7);

        assert_eq!(
            backoff.next_delay(Some(Duration::from_secs(3))),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            backoff.next_delay(Some(Duration::from_secs(600))),
            Some(Duration::from_secs(30))
        );
        assert_eq!(backoff.retries(), 2);
    }

    #[test]
    fn test_no_retries() {
        let mut backoff = seeded(&RetryPolicy::none(), 0);
        assert_eq!(backoff.next_delay(None), None);
    }
}
