//! Configuration error types.

use thiserror::Error;

/// Raised once, synchronously, when a [`RetryConfig`] is built with an
/// invalid shape. Never produced while a policy is executing: at run time the
/// executor returns the wrapped operation's own error type untouched.
///
/// [`RetryConfig`]: crate::RetryConfig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Neither a retryable-error criterion nor a success predicate was
    /// configured. Such a policy has no defined way to ever decide success.
    #[error("retry policy has no exit criteria: retryable errors and success predicate are both absent")]
    NoExitCriteria,

    /// A bounded policy must allow at least one attempt.
    #[error("max_attempts must be at least 1; use unbounded_attempts() to remove the limit")]
    ZeroMaxAttempts,
}
