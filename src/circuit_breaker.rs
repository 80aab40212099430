// =============================================================================
// circuit_breaker.rs - THE CAPTCHA SHIELD
// =============================================================================
//
// Storefronts don't love scrapers. Once Amazon decides we're a robot, every
// following request comes back as a captcha page or a 503, and asking about
// the next forty titles just digs the hole deeper.
//
// So each source gets a breaker. After N consecutive failures it opens and
// the source is skipped (recorded as "circuit breaker open") until the reset
// timeout passes. Then a trial request goes through in half-open state: if it
// works, back to normal; if not, back to the penalty box.
// =============================================================================

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Requests flow.
    Closed,
    /// Requests are refused until the reset timeout expires.
    Open,
    /// Probing: requests flow, one failure reopens.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    total_trips: u64,
}

pub struct CircuitBreaker {
    name: String,
    inner: Mutex<BreakerState>,
    failure_threshold: u32,
    reset_timeout: Duration,
    success_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        reset_timeout: Duration,
        success_threshold: u32,
    ) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
                total_trips: 0,
            }),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            success_threshold: success_threshold.max(1),
        }
    }

    /// Whether a request may go out right now. An open breaker whose timeout
    /// has expired moves to half-open and lets the caller through.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let expired = inner
                    .opened_at
                    .map_or(true, |at| at.elapsed() >= self.reset_timeout);
                if expired {
                    info!(breaker = %self.name, "Circuit breaker OPEN -> HALF_OPEN, letting one through");
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                }
                expired
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.success_threshold {
                    info!(breaker = %self.name, "Circuit breaker HALF_OPEN -> CLOSED, source is back");
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    inner.opened_at = None;
                }
            }
            // Late response from a request sent before the trip.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        "Circuit breaker TRIPPED, skipping this source for {}s",
                        self.reset_timeout.as_secs()
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    inner.total_trips += 1;
                }
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "Trial request failed, circuit breaker back to OPEN");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.total_trips += 1;
            }
            CircuitState::Open => inner.opened_at = Some(Instant::now()),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            total_trips: inner.total_trips,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_trips: u64,
}
