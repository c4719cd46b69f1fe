//! Retry policy configuration.
//!
//! A [`RetryConfig`] is an immutable, validated description of one retry
//! policy: which operation errors are eligible for retry, how long to wait
//! between attempts, how many attempts to allow, what counts as a successful
//! result, and an optional wall-clock deadline. Configs are built through
//! [`RetryConfigBuilder`], which enforces the exit-criteria invariant before
//! any attempt can run.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigError;

/// Default attempt budget when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

type SuccessFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Criterion deciding whether an operation error is eligible for retry.
pub enum RetryOn<E> {
    /// Every operation error is retryable.
    Any,
    /// No operation error is retryable. A policy built with this variant
    /// must carry a success predicate; any raised error is then only ever
    /// surfaced once the attempt budget or deadline runs out.
    Never,
    /// Errors matching the filter are retryable. Covers "kind is in the
    /// retryable set" for any caller-defined notion of kind, e.g. matching
    /// enum variants or `io::ErrorKind` classes.
    If(Arc<dyn Fn(&E) -> bool + Send + Sync>),
}

impl<E> RetryOn<E> {
    /// Builds the [`RetryOn::If`] variant from a plain closure.
    pub fn when<F>(filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        RetryOn::If(Arc::new(filter))
    }

    pub(crate) fn matches(&self, err: &E) -> bool {
        match self {
            RetryOn::Any => true,
            RetryOn::Never => false,
            RetryOn::If(filter) => filter(err),
        }
    }

    fn is_never(&self) -> bool {
        matches!(self, RetryOn::Never)
    }
}

impl<E> Clone for RetryOn<E> {
    fn clone(&self) -> Self {
        match self {
            RetryOn::Any => RetryOn::Any,
            RetryOn::Never => RetryOn::Never,
            RetryOn::If(filter) => RetryOn::If(Arc::clone(filter)),
        }
    }
}

impl<E> fmt::Debug for RetryOn<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOn::Any => f.write_str("Any"),
            RetryOn::Never => f.write_str("Never"),
            RetryOn::If(_) => f.write_str("If(..)"),
        }
    }
}

/// Validated retry policy over operations returning `Result<T, E>`.
///
/// Holds no execution state: every [`execute`](RetryConfig::execute) call
/// gets its own attempt counter and deadline, so one config can be reused
/// and shared freely across invocations and threads.
pub struct RetryConfig<T, E> {
    retry_on: RetryOn<E>,
    interval: Duration,
    max_attempts: Option<NonZeroU32>,
    success: Option<SuccessFn<T>>,
    timeout: Option<Duration>,
}

impl<T, E> RetryConfig<T, E> {
    /// Starts a builder with the default policy: any error retryable,
    /// no inter-attempt delay, [`DEFAULT_MAX_ATTEMPTS`] attempts, no success
    /// predicate, no deadline.
    pub fn builder() -> RetryConfigBuilder<T, E> {
        RetryConfigBuilder::default()
    }

    /// Wait between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Attempt budget; `None` means unbounded.
    pub fn max_attempts(&self) -> Option<NonZeroU32> {
        self.max_attempts
    }

    /// Wall-clock limit for the whole execution; `None` means no limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether a result satisfies the success criteria.
    pub(crate) fn accepts(&self, value: &T) -> bool {
        match &self.success {
            None => true,
            Some(predicate) => predicate(value),
        }
    }

    pub(crate) fn is_retryable(&self, err: &E) -> bool {
        self.retry_on.matches(err)
    }

    /// True only for the literal final attempt of a bounded policy.
    pub(crate) fn is_final_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt == max.get())
    }
}

impl<T, E> Clone for RetryConfig<T, E> {
    fn clone(&self) -> Self {
        Self {
            retry_on: self.retry_on.clone(),
            interval: self.interval,
            max_attempts: self.max_attempts,
            success: self.success.as_ref().map(Arc::clone),
            timeout: self.timeout,
        }
    }
}

impl<T, E> fmt::Debug for RetryConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("retry_on", &self.retry_on)
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .field("success", &self.success.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

enum AttemptLimit {
    Bounded(u32),
    Unbounded,
}

/// Builder for [`RetryConfig`]. Validation happens once, in
/// [`build`](RetryConfigBuilder::build).
pub struct RetryConfigBuilder<T, E> {
    retry_on: RetryOn<E>,
    interval: Duration,
    max_attempts: AttemptLimit,
    success: Option<SuccessFn<T>>,
    timeout: Option<Duration>,
}

impl<T, E> Default for RetryConfigBuilder<T, E> {
    fn default() -> Self {
        Self {
            retry_on: RetryOn::Any,
            interval: Duration::ZERO,
            max_attempts: AttemptLimit::Bounded(DEFAULT_MAX_ATTEMPTS),
            success: None,
            timeout: None,
        }
    }
}

impl<T, E> RetryConfigBuilder<T, E> {
    /// Sets the retryable-error criterion.
    pub fn retry_on(mut self, retry_on: RetryOn<E>) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Shorthand for `retry_on(RetryOn::when(filter))`.
    pub fn retry_if<F>(self, filter: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_on(RetryOn::when(filter))
    }

    /// Sets the wait between attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the number of attempts. Zero is rejected at build time.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = AttemptLimit::Bounded(max_attempts);
        self
    }

    /// Removes the attempt bound. The policy then terminates only through
    /// success, the deadline, or not at all: unbounded attempts with no
    /// timeout and a never-succeeding operation loop forever by design.
    pub fn unbounded_attempts(mut self) -> Self {
        self.max_attempts = AttemptLimit::Unbounded;
        self
    }

    /// Sets the success predicate. When present, an `Ok` result is accepted
    /// only if the predicate returns true; rejected results are retried like
    /// failures but never turned into errors.
    pub fn success_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(predicate));
        self
    }

    /// Sets the wall-clock limit, measured from the start of execution and
    /// checked only between attempts.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates and freezes the policy.
    pub fn build(self) -> Result<RetryConfig<T, E>, ConfigError> {
        if self.retry_on.is_never() && self.success.is_none() {
            return Err(ConfigError::NoExitCriteria);
        }
        let max_attempts = match self.max_attempts {
            AttemptLimit::Unbounded => None,
            AttemptLimit::Bounded(n) => match NonZeroU32::new(n) {
                Some(n) => Some(n),
                None => return Err(ConfigError::ZeroMaxAttempts),
            },
        };
        Ok(RetryConfig {
            retry_on: self.retry_on,
            interval: self.interval,
            max_attempts,
            success: self.success,
            timeout: self.timeout,
        })
    }
}
