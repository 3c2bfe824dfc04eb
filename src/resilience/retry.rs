//! Retry with exponential backoff
//!
//! Re-invokes a fallible call while it fails with a retryable error, sleeping
//! `min(base_delay * exponential_base^attempt, max_delay)` between attempts,
//! optionally scaled by a jitter factor in `[0.5, 1.0]`.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::clock::{JitterSource, RandJitter, Sleeper, ThreadSleeper};
use crate::resilience::{CallResult, ClassifyFailure, FailureFilter};

/// Configuration for retry logic
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter: bool,
    /// Failure kinds that are retried; others propagate immediately
    pub retry_on: FailureFilter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
            jitter: true,
            retry_on: FailureFilter::Any,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for provider rate limits: long ceiling, jittered, retries any failure.
    pub fn rate_limit() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            exponential_base: 2.0,
            jitter: true,
            retry_on: FailureFilter::Any,
        }
    }

    /// Preset for flaky transports: retries refused, reset and timed-out connections only.
    pub fn network() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter: true,
            retry_on: FailureFilter::transport(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retry_on(mut self, retry_on: FailureFilter) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Un-jittered delay before retry number `attempt + 1` (attempt is 0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.exponential_base.powi(exponent);
        let cap = self.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= cap {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

// == Retry Policy ==
/// Call wrapper that retries failed calls with exponential backoff.
///
/// Retryable errors never escape: once attempts run out they are folded into
/// `CallResult::failed(err.to_string())`. Non-retryable errors are returned
/// unchanged on first occurrence. The backoff sleep blocks the calling thread.
pub struct RetryPolicy {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
    jitter_source: Arc<dyn JitterSource>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(ThreadSleeper),
            jitter_source: Arc::new(RandJitter),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_jitter_source(mut self, jitter_source: Arc<dyn JitterSource>) -> Self {
        self.jitter_source = jitter_source;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Calculate backoff with jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.config.delay_for(attempt);
        if self.config.jitter {
            delay.mul_f64(self.jitter_source.factor().clamp(0.5, 1.0))
        } else {
            delay
        }
    }

    /// Runs `op`, retrying errors for which `is_retryable` returns true.
    pub fn call_with<T, E, F, P>(&self, mut op: F, is_retryable: P) -> Result<CallResult<T>, E>
    where
        F: FnMut() -> Result<CallResult<T>, E>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt: u32 = 0;
        loop {
            let err = match op() {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "Call succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };

            if !is_retryable(&err) {
                debug!(error = %err, "Non-retryable failure, not retrying");
                return Err(err);
            }

            if attempt >= self.config.max_retries {
                error!(
                    attempts = attempt + 1,
                    error = %err,
                    "Retries exhausted"
                );
                return Ok(CallResult::failed(err.to_string()));
            }

            let delay = self.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Call failed, retrying"
            );
            self.sleeper.sleep(delay);
            attempt += 1;
        }
    }

    /// Runs `op`, retrying errors whose kind matches the configured filter.
    pub fn call<T, E, F>(&self, op: F) -> Result<CallResult<T>, E>
    where
        F: FnMut() -> Result<CallResult<T>, E>,
        E: ClassifyFailure + Display,
    {
        let filter = &self.config.retry_on;
        self.call_with(op, |err: &E| filter.matches_error(err))
    }

    /// Wraps `f` into a closure with the same argument that retries per this policy.
    pub fn wrap<A, T, E, F>(self, f: F) -> impl Fn(&A) -> Result<CallResult<T>, E>
    where
        A: ?Sized,
        F: Fn(&A) -> Result<CallResult<T>, E>,
        E: ClassifyFailure + Display,
    {
        move |args: &A| self.call(|| f(args))
    }
}

/// Builds a [`RetryPolicy`] from individual settings.
pub fn retry_with_backoff(
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
    jitter: bool,
    retry_on: FailureFilter,
) -> RetryPolicy {
    RetryPolicy::new(RetryConfig {
        max_retries,
        base_delay,
        max_delay,
        exponential_base,
        jitter,
        retry_on,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::FailureKind;
    use parking_lot::Mutex;
    use std::cell::Cell;
    use thiserror::Error;

    #[derive(Debug, Error, PartialEq)]
    enum ProviderError {
        #[error("rate limited")]
        RateLimited,
        #[error("connection refused")]
        Refused,
        #[error("invalid api key")]
        Unauthorized,
    }

    impl ClassifyFailure for ProviderError {
        fn failure_kind(&self) -> FailureKind {
            match self {
                ProviderError::RateLimited => FailureKind::RateLimited,
                ProviderError::Refused => FailureKind::ConnectionRefused,
                ProviderError::Unauthorized => FailureKind::Other,
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().push(duration);
        }
    }

    struct FixedJitter(f64);

    impl JitterSource for FixedJitter {
        fn factor(&self) -> f64 {
            self.0
        }
    }

    fn policy(config: RetryConfig) -> (RetryPolicy, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy::new(config).with_sleeper(sleeper.clone());
        (policy, sleeper)
    }

    fn fixed_config(max_retries: u32) -> RetryConfig {
        RetryConfig::new()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_secs(1))
            .with_jitter(false)
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_secs(1));
        assert_eq!(config.exponential_base, 2.0);
        assert!(config.jitter);
        assert_eq!(config.retry_on, FailureFilter::Any);
    }

    #[test]
    fn test_presets() {
        let rate = RetryConfig::rate_limit();
        assert_eq!(rate.max_delay, Duration::from_secs(120));
        assert_eq!(rate.exponential_base, 2.0);
        assert!(rate.jitter);
        assert!(rate.retry_on.matches(FailureKind::RateLimited));
        assert!(rate.retry_on.matches(FailureKind::Server));

        let network = RetryConfig::network();
        assert!(network.retry_on.matches(FailureKind::ConnectionRefused));
        assert!(network.retry_on.matches(FailureKind::Timeout));
        assert!(!network.retry_on.matches(FailureKind::RateLimited));
    }

    #[test]
    fn test_delay_for_is_capped() {
        let config = RetryConfig::new()
            .with_base_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(3));

        assert_eq!(config.delay_for(0), Duration::from_millis(500));
        assert_eq!(config.delay_for(1), Duration::from_secs(1));
        assert_eq!(config.delay_for(2), Duration::from_secs(2));
        assert_eq!(config.delay_for(3), Duration::from_secs(3));
        assert_eq!(config.delay_for(u32::MAX), Duration::from_secs(3));
    }

    #[test]
    fn test_success_first_try_does_not_sleep() {
        let (policy, sleeper) = policy(fixed_config(3));

        let result = policy.call(|| Ok::<_, ProviderError>(CallResult::ok("hi")));

        assert_eq!(result, Ok(CallResult::ok("hi")));
        assert!(sleeper.sleeps.lock().is_empty());
    }

    #[test]
    fn test_success_after_failures() {
        let (policy, sleeper) = policy(fixed_config(3));
        let calls = Cell::new(0);

        let result = policy.call(|| {
            calls.set(calls.get() + 1);
            if calls.get() <= 2 {
                Err(ProviderError::RateLimited)
            } else {
                Ok(CallResult::ok("ok"))
            }
        });

        assert_eq!(result, Ok(CallResult::ok("ok")));
        assert_eq!(calls.get(), 3);
        assert_eq!(
            *sleeper.sleeps.lock(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_exhaustion_yields_failed_record() {
        let (policy, sleeper) = policy(fixed_config(2));
        let calls = Cell::new(0);

        let result = policy.call(|| {
            calls.set(calls.get() + 1);
            Err::<CallResult<()>, _>(ProviderError::Refused)
        });

        assert_eq!(result, Ok(CallResult::failed("connection refused")));
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeper.sleeps.lock().len(), 2);
    }

    #[test]
    fn test_zero_retries_single_attempt() {
        let (policy, sleeper) = policy(fixed_config(0));
        let calls = Cell::new(0);

        let result = policy.call(|| {
            calls.set(calls.get() + 1);
            Err::<CallResult<()>, _>(ProviderError::RateLimited)
        });

        assert_eq!(result, Ok(CallResult::failed("rate limited")));
        assert_eq!(calls.get(), 1);
        assert!(sleeper.sleeps.lock().is_empty());
    }

    #[test]
    fn test_logical_failure_is_not_retried() {
        let (policy, sleeper) = policy(fixed_config(3));
        let calls = Cell::new(0);

        let result = policy.call(|| {
            calls.set(calls.get() + 1);
            Ok::<_, ProviderError>(CallResult::<()>::failed("model refused prompt"))
        });

        assert_eq!(result, Ok(CallResult::failed("model refused prompt")));
        assert_eq!(calls.get(), 1);
        assert!(sleeper.sleeps.lock().is_empty());
    }

    #[test]
    fn test_non_retryable_propagates_immediately() {
        let (policy, sleeper) = policy(RetryConfig::network().with_jitter(false));
        let calls = Cell::new(0);

        let result = policy.call(|| {
            calls.set(calls.get() + 1);
            Err::<CallResult<()>, _>(ProviderError::RateLimited)
        });

        assert_eq!(result, Err(ProviderError::RateLimited));
        assert_eq!(calls.get(), 1);
        assert!(sleeper.sleeps.lock().is_empty());
    }

    #[test]
    fn test_call_with_predicate() {
        let (policy, _sleeper) = policy(fixed_config(1));

        let result = policy.call_with(
            || Err::<CallResult<()>, _>(ProviderError::Unauthorized),
            |err| *err == ProviderError::Unauthorized,
        );

        assert_eq!(result, Ok(CallResult::failed("invalid api key")));
    }

    #[test]
    fn test_jitter_scales_delay() {
        let (policy, sleeper) = policy(fixed_config(2).with_jitter(true));
        let policy = policy.with_jitter_source(Arc::new(FixedJitter(0.5)));

        let _ = policy.call(|| Err::<CallResult<()>, _>(ProviderError::RateLimited));

        assert_eq!(
            *sleeper.sleeps.lock(),
            vec![Duration::from_millis(500), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let (policy, sleeper) = policy(fixed_config(6).with_jitter(true));

        let _ = policy.call(|| Err::<CallResult<()>, _>(ProviderError::RateLimited));

        let sleeps = sleeper.sleeps.lock();
        for (attempt, delay) in sleeps.iter().enumerate() {
            let full = policy.config().delay_for(attempt as u32);
            assert!(*delay <= full);
            assert!(*delay >= full / 2);
        }
    }

    #[test]
    fn test_wrap_preserves_argument() {
        let (policy, sleeper) = policy(fixed_config(3));
        let attempts = Cell::new(0);

        let complete = policy.wrap(|prompt: &str| {
            attempts.set(attempts.get() + 1);
            if attempts.get() == 1 {
                Err(ProviderError::Refused)
            } else {
                Ok(CallResult::ok(format!("echo: {}", prompt)))
            }
        });

        assert_eq!(complete("hello"), Ok(CallResult::ok("echo: hello".to_string())));
        assert_eq!(sleeper.sleeps.lock().len(), 1);
    }

    #[test]
    fn test_retry_with_backoff_builder() {
        let policy = retry_with_backoff(
            2,
            Duration::from_secs(1),
            Duration::from_secs(10),
            3.0,
            false,
            FailureFilter::transport(),
        );

        assert_eq!(policy.config().max_retries, 2);
        assert_eq!(policy.config().delay_for(1), Duration::from_secs(3));
        assert_eq!(policy.config().retry_on, FailureFilter::transport());
    }
}
