//! Retry and circuit-breaker policy shared by every remote facade
//!
//! A facade call is one fallible operation. `Resilience::call` runs it through a
//! per-service circuit breaker and retries transport faults and 5xx answers with
//! exponential backoff. Callers only ever see a `RemoteError`; an open breaker is
//! reported as `RemoteError::CircuitOpen` like any other failure.
//!
//! Breaker states:
//!
//! - **Closed**: calls pass; consecutive failures are counted
//! - **Open**: calls are rejected until `open_for` has elapsed
//! - **HalfOpen**: one probe call is let through; success closes, failure or a
//!   cancelled probe re-opens

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::RemoteError;
use crate::config::ResilienceConfig;

/// Externally visible breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    HalfOpen { probe_in_flight: bool },
}

/// Consecutive-failure circuit breaker for one remote service
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    failure_threshold: u32,
    open_for: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, failure_threshold: u32, open_for: Duration) -> Self {
        Self {
            service: service.into(),
            failure_threshold: failure_threshold.max(1),
            open_for,
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state, with an expired open interval reported as half-open
    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Ask permission to issue a call.
    ///
    /// The permit must be settled with [`BreakerPermit::success`] or
    /// [`BreakerPermit::failure`]. A half-open probe permit dropped unsettled
    /// re-opens the breaker for another `open_for`.
    pub fn acquire(&self) -> Result<BreakerPermit<'_>, RemoteError> {
        let mut state = self.lock();
        let probe = match *state {
            BreakerState::Closed { .. } => false,
            BreakerState::Open { until } if Instant::now() >= until => {
                debug!(service = %self.service, "Circuit half-open, letting probe through");
                true
            },
            BreakerState::HalfOpen {
                probe_in_flight: false,
            } => true,
            BreakerState::Open { .. } | BreakerState::HalfOpen { .. } => {
                return Err(RemoteError::CircuitOpen {
                    service: self.service.clone(),
                });
            },
        };
        if probe {
            *state = BreakerState::HalfOpen {
                probe_in_flight: true,
            };
        }

        Ok(BreakerPermit {
            breaker: self,
            probe,
            settled: false,
        })
    }

    fn abandon_probe(&self) {
        let mut state = self.lock();
        if matches!(
            *state,
            BreakerState::HalfOpen {
                probe_in_flight: true
            }
        ) {
            warn!(service = %self.service, "Probe call cancelled, circuit re-opened");
            *state = BreakerState::Open {
                until: Instant::now() + self.open_for,
            };
        }
    }

    fn record_success(&self) {
        let mut state = self.lock();
        if !matches!(*state, BreakerState::Closed { .. }) {
            debug!(service = %self.service, "Circuit closed");
        }
        *state = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    fn record_failure(&self) {
        let mut state = self.lock();
        let next = match *state {
            BreakerState::Closed {
                consecutive_failures,
            } if consecutive_failures + 1 < self.failure_threshold => BreakerState::Closed {
                consecutive_failures: consecutive_failures + 1,
            },
            BreakerState::Open { until } => BreakerState::Open { until },
            _ => {
                warn!(
                    service = %self.service,
                    open_secs = self.open_for.as_secs_f64(),
                    "Circuit opened"
                );
                BreakerState::Open {
                    until: Instant::now() + self.open_for,
                }
            },
        };
        *state = next;
    }
}

/// Permission for one call, returned by [`CircuitBreaker::acquire`]
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if self.probe && !self.settled {
            self.breaker.abandon_probe();
        }
    }
}

/// Exponential backoff settings
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): base * 2^attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Breaker plus retry policy wrapped around a single remote service
#[derive(Debug)]
pub struct Resilience {
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl Resilience {
    pub fn new(breaker: CircuitBreaker, retry: RetryPolicy) -> Self {
        Self { breaker, retry }
    }

    pub fn from_config(service: impl Into<String>, config: &ResilienceConfig) -> Self {
        Self::new(
            CircuitBreaker::new(
                service,
                config.breaker_failure_threshold,
                Duration::from_secs(config.breaker_open_secs),
            ),
            RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.backoff_base_ms),
                max_delay: Duration::from_millis(config.backoff_max_ms),
            },
        )
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `op` under the breaker, retrying retryable failures
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            let permit = self.breaker.acquire()?;

            let result = op().await;
            match &result {
                Err(err) if err.trips_breaker() => permit.failure(),
                _ => permit.success(),
            }

            match result {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        error = %err,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Remote call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                other => return other,
            }
        }
    }
}
