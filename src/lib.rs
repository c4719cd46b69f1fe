//! Call-wrapping retry policies.
//!
//! Wrap a fallible operation in a validated [`RetryConfig`] and re-invoke it
//! until it succeeds, the attempt budget or wall-clock deadline runs out, or
//! a retryable error lands on the final bounded attempt. Success is either
//! "the operation returned `Ok`" or, when a predicate is configured, "the
//! predicate accepted the result". The delay between attempts is fixed;
//! there is no backoff or jitter, and retry decisions are logged through
//! `tracing` for callers that install a subscriber.
//!
//! ```
//! use retry_policy::RetryConfig;
//!
//! let config = RetryConfig::builder()
//!     .max_attempts(3)
//!     .success_if(|n: &i32| *n > 0)
//!     .build()
//!     .unwrap();
//!
//! let result: Result<i32, std::io::Error> = config.execute(|| Ok(5));
//! assert_eq!(result.unwrap(), 5);
//! ```
//!
//! The executor is a plain higher-order call: no hidden registration, no
//! state outside the `execute` frame, and the same config can be reused
//! across invocations and threads. See [`RetryConfig::execute`] for the
//! exact algorithm, including the deliberately preserved quirk that
//! non-retryable errors are retried too and only surface on exhaustion.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod error;
mod executor;

pub use config::DEFAULT_MAX_ATTEMPTS;
pub use config::RetryConfig;
pub use config::RetryConfigBuilder;
pub use config::RetryOn;
pub use error::ConfigError;
