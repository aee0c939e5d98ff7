use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::FetchError;

/// When to stop calling a failing upstream, and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,

    /// Failures older than this no longer count towards the threshold
    pub window: Duration,

    /// Time spent open before a trial is allowed
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Observable breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed {
        failures: u32,
        streak_start: Option<Instant>,
    },
    Open {
        until: Instant,
    },
    HalfOpen {
        trial_in_flight: bool,
    },
}

/// Circuit breaker shared by every key fetched through one client
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::Closed {
                failures: 0,
                streak_start: None,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        match *self.inner.lock() {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Ask to contact upstream.
    ///
    /// Fails fast with [`FetchError::CircuitOpen`] while open. Once the
    /// cooldown has elapsed exactly one caller gets a trial permit.
    pub fn acquire(&self) -> Result<Permit<'_>, FetchError> {
        let mut inner = self.inner.lock();
        let trial = match *inner {
            Inner::Closed { .. } => false,
            Inner::Open { until } if Instant::now() >= until => {
                tracing::info!("Circuit half-open, allowing one trial");
                *inner = Inner::HalfOpen {
                    trial_in_flight: true,
                };
                true
            }
            Inner::Open { .. } => return Err(FetchError::CircuitOpen),
            Inner::HalfOpen {
                trial_in_flight: true,
            } => return Err(FetchError::CircuitOpen),
            Inner::HalfOpen {
                trial_in_flight: false,
            } => {
                *inner = Inner::HalfOpen {
                    trial_in_flight: true,
                };
                true
            }
        };

        Ok(Permit {
            breaker: self,
            trial,
            settled: false,
        })
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.inner.lock();
        match *inner {
            Inner::Closed { .. } => {
                *inner = Inner::Closed {
                    failures: 0,
                    streak_start: None,
                };
            }
            Inner::HalfOpen { .. } if trial => {
                tracing::info!("Trial succeeded, circuit closed");
                *inner = Inner::Closed {
                    failures: 0,
                    streak_start: None,
                };
            }
            // Stale outcome from a call admitted before the state changed
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match *inner {
            Inner::Closed {
                failures,
                streak_start,
            } => {
                let (failures, start) = match streak_start {
                    Some(start) if now.duration_since(start) <= self.config.window => {
                        (failures + 1, start)
                    }
                    _ => (1, now),
                };

                if failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures,
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        "Failure threshold reached, circuit open"
                    );
                    *inner = Inner::Open {
                        until: now + self.config.cooldown,
                    };
                } else {
                    *inner = Inner::Closed {
                        failures,
                        streak_start: Some(start),
                    };
                }
            }
            Inner::HalfOpen { .. } if trial => {
                tracing::warn!("Trial failed, circuit re-opened");
                *inner = Inner::Open {
                    until: now + self.config.cooldown,
                };
            }
            _ => {}
        }
    }

    fn on_abandon(&self, trial: bool) {
        let mut inner = self.inner.lock();
        if trial
            && let Inner::HalfOpen {
                trial_in_flight: true,
            } = *inner
        {
            *inner = Inner::HalfOpen {
                trial_in_flight: false,
            };
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

/// Permission to make one upstream call; report how it went.
///
/// Dropping a permit without reporting (e.g. the call was cancelled) frees
/// the trial slot so a later caller can try instead.
#[must_use = "report the call outcome with success() or failure()"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Permit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandon(self.trial);
        }
    }
}
