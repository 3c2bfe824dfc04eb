//! Circuit Breaker Module
//!
//! Three-state breaker that stops calling a dependency after repeated
//! failures and lets a single trial call through once the cooldown elapses.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::CircuitError;
use crate::resilience::{ClassifyFailure, FailureFilter};

// == Circuit State ==
/// Breaker state as seen by the next caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitState {
    /// Calls pass through and tracked failures are counted
    Closed,
    /// Calls are rejected until the recovery timeout elapses
    Open,
    /// One trial call decides whether to close or reopen
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of a breaker, suitable for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Remaining cooldown, if currently open.
    pub open_remaining: Option<Duration>,
}

// == Configuration ==
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    /// Failure kinds that count against the breaker
    pub tracked: FailureFilter,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            tracked: FailureFilter::Any,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the cooldown before a trial call is admitted
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Set which failure kinds are counted
    pub fn with_tracked(mut self, tracked: FailureFilter) -> Self {
        self.tracked = tracked;
        self
    }
}

// == Circuit Breaker ==
#[derive(Debug)]
struct State {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
}

/// Circuit breaker guarding calls to a failing dependency.
///
/// - Counts consecutive tracked failures while closed
/// - Opens at the threshold and rejects calls without invoking them
/// - After the recovery timeout admits one trial call (half-open); success
///   closes the circuit, a tracked failure reopens it
///
/// The open-state timeout is evaluated lazily when a call arrives. One
/// instance is shared by every call site it wraps, so failures on behalf of
/// one caller open the circuit for all of them. Errors are always returned to
/// the caller after bookkeeping; untracked errors do not touch the state.
pub struct CircuitBreaker {
    name: String,
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            name: "circuit".to_string(),
            cfg,
            state: Mutex::new(State {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                trial_in_flight: false,
            }),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    /// Runs `op` through the breaker, counting errors for which `is_tracked`
    /// returns true.
    pub fn call_with<T, E, F, P>(&self, op: F, is_tracked: P) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let trial = match self.admit() {
            Ok(trial) => trial,
            Err(retry_after) => {
                debug!(circuit = %self.name, ?retry_after, "Call rejected, circuit open");
                return Err(CircuitError::Open { retry_after });
            }
        };

        let mut guard = TrialGuard {
            breaker: self,
            armed: trial,
        };
        let outcome = op();
        guard.armed = false;

        match outcome {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                if is_tracked(&err) {
                    self.on_failure();
                } else {
                    self.on_untracked();
                }
                Err(CircuitError::Inner(err))
            }
        }
    }

    /// Runs `op` through the breaker, counting errors whose kind matches the
    /// configured filter.
    pub fn call<T, E, F>(&self, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
        E: ClassifyFailure,
    {
        let tracked = &self.cfg.tracked;
        self.call_with(op, |err: &E| tracked.matches_error(err))
    }

    /// Decides whether a call may proceed; on rejection returns the remaining cooldown.
    ///
    /// `Ok(true)` marks the admitted call as the half-open trial.
    fn admit(&self) -> Result<bool, Duration> {
        let now = self.clock.now();
        let mut st = self.state.lock();
        let current = st.state;
        match current {
            CircuitState::Closed => Ok(false),
            CircuitState::Open => {
                let elapsed = st
                    .last_failure
                    .map_or(self.cfg.recovery_timeout, |at| now.saturating_duration_since(at));
                if elapsed < self.cfg.recovery_timeout {
                    return Err(self.cfg.recovery_timeout - elapsed);
                }
                st.state = CircuitState::HalfOpen;
                st.trial_in_flight = true;
                info!(circuit = %self.name, "Circuit half-open, admitting trial call");
                Ok(true)
            }
            CircuitState::HalfOpen => {
                if st.trial_in_flight {
                    return Err(Duration::ZERO);
                }
                st.trial_in_flight = true;
                Ok(true)
            }
        }
    }

    fn on_success(&self) {
        let mut st = self.state.lock();
        st.failure_count = 0;
        st.trial_in_flight = false;
        if st.state != CircuitState::Closed {
            st.state = CircuitState::Closed;
            info!(circuit = %self.name, "Circuit closed");
        }
    }

    fn on_failure(&self) {
        let now = self.clock.now();
        let mut st = self.state.lock();
        st.failure_count = st.failure_count.saturating_add(1);
        st.last_failure = Some(now);
        st.trial_in_flight = false;

        let current = st.state;
        match current {
            CircuitState::HalfOpen => {
                st.state = CircuitState::Open;
                warn!(circuit = %self.name, "Trial call failed, circuit reopened");
            }
            CircuitState::Closed if st.failure_count >= self.cfg.failure_threshold => {
                st.state = CircuitState::Open;
                warn!(
                    circuit = %self.name,
                    failures = st.failure_count,
                    recovery_timeout = ?self.cfg.recovery_timeout,
                    "Circuit opened"
                );
            }
            _ => {}
        }
    }

    fn on_untracked(&self) {
        self.state.lock().trial_in_flight = false;
    }

    // == Inspection ==
    /// Current state. An open circuit whose cooldown has elapsed still reports
    /// `Open` until the next call arrives.
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Consecutive tracked failures since the last success or reset.
    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    /// Forces the breaker back to closed with no recorded failures.
    pub fn reset(&self) {
        let mut st = self.state.lock();
        st.state = CircuitState::Closed;
        st.failure_count = 0;
        st.last_failure = None;
        st.trial_in_flight = false;
        info!(circuit = %self.name, "Circuit reset");
    }

    /// Captures state, counters and remaining cooldown under one lock.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let st = self.state.lock();
        let open_remaining = match (st.state, st.last_failure) {
            (CircuitState::Open, Some(at)) => {
                let elapsed = now.saturating_duration_since(at);
                Some(self.cfg.recovery_timeout.saturating_sub(elapsed))
            }
            _ => None,
        };
        CircuitSnapshot {
            state: st.state,
            failure_count: st.failure_count,
            failure_threshold: self.cfg.failure_threshold,
            recovery_timeout: self.cfg.recovery_timeout,
            open_remaining,
        }
    }
}

/// Releases the half-open trial slot if the trial unwinds before its
/// outcome is recorded.
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(circuit = %self.breaker.name, "Trial call panicked, releasing trial slot");
            self.breaker.on_untracked();
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("cfg", &self.cfg)
            .field("state", &*self.state.lock())
            .finish()
    }
}
