//! Circuit breaker guarding calls to an unhealthy provider.
//!
//! Closed: calls go through; a run of `failure_threshold` consecutive failures
//! (each no further apart than `failure_window`) opens the breaker.
//! Open: calls are refused until `cooldown` has elapsed.
//! Half-open: up to `half_open_max_calls` trial calls are let through. That many
//! consecutive successes close the breaker; any trial failure reopens it.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub failure_window: Duration,
    pub cooldown: Duration,
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
            half_open_max_calls: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed {
        consecutive_failures: u32,
        last_failure: Option<Instant>,
    },
    Open {
        since: Instant,
    },
    HalfOpen {
        in_flight: u32,
        successes: u32,
    },
}

impl Inner {
    fn closed() -> Self {
        Inner::Closed {
            consecutive_failures: 0,
            last_failure: None,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// A `half_open_max_calls` of zero is raised to one; half-open must admit a trial call.
    pub fn new(name: impl Into<String>, mut config: BreakerConfig) -> Self {
        config.half_open_max_calls = config.half_open_max_calls.max(1);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner::closed()),
        }
    }

    /// Current state, moving Open to HalfOpen if the cooldown has passed.
    pub fn state(&self) -> BreakerState {
        let mut inner = self.lock();
        self.expire_cooldown(&mut inner);
        match *inner {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    /// Ask permission for one call. Every `true` must be followed by exactly
    /// one [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure).
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.lock();
        self.expire_cooldown(&mut inner);

        match &mut *inner {
            Inner::Closed { .. } => true,
            Inner::Open { .. } => false,
            Inner::HalfOpen {
                in_flight,
                successes,
            } => {
                if *in_flight + *successes < self.config.half_open_max_calls {
                    *in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();

        match &mut *inner {
            Inner::Closed {
                consecutive_failures,
                last_failure,
            } => {
                *consecutive_failures = 0;
                *last_failure = None;
            }
            Inner::HalfOpen {
                in_flight,
                successes,
            } => {
                *in_flight = in_flight.saturating_sub(1);
                *successes += 1;
                if *successes >= self.config.half_open_max_calls {
                    info!(breaker = %self.name, "Circuit breaker closed after successful trial calls");
                    *inner = Inner::closed();
                }
            }
            // A call admitted before the breaker opened finished late.
            Inner::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.lock();

        match &mut *inner {
            Inner::Closed {
                consecutive_failures,
                last_failure,
            } => {
                let within_window = last_failure
                    .map(|at| now.duration_since(at) <= self.config.failure_window)
                    .unwrap_or(false);
                *consecutive_failures = if within_window {
                    *consecutive_failures + 1
                } else {
                    1
                };
                *last_failure = Some(now);

                if *consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        breaker = %self.name,
                        failures = *consecutive_failures,
                        cooldown = ?self.config.cooldown,
                        "Circuit breaker opened"
                    );
                    *inner = Inner::Open { since: now };
                }
            }
            Inner::HalfOpen { .. } => {
                warn!(breaker = %self.name, "Trial call failed, circuit breaker reopened");
                *inner = Inner::Open { since: now };
            }
            Inner::Open { .. } => {}
        }
    }

    fn expire_cooldown(&self, inner: &mut Inner) {
        if let Inner::Open { since } = inner {
            if since.elapsed() >= self.config.cooldown {
                info!(breaker = %self.name, "Cooldown elapsed, circuit breaker half-open");
                *inner = Inner::HalfOpen {
                    in_flight: 0,
                    successes: 0,
                };
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is a plain value; a panic mid-update cannot leave it torn.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
