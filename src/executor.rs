//! Retry policy executors.
//!
//! [`RetryConfig::execute`] runs an operation under the policy on the calling
//! thread, sleeping with `std::thread::sleep` between attempts.
//! [`RetryConfig::execute_async`] is its async counterpart and sleeps with
//! `tokio::time::sleep`. Both follow the same algorithm:
//!
//! 1. Compute the deadline once, before the first attempt, if a timeout is
//!    configured.
//! 2. Invoke the operation. An accepted result returns immediately; this is
//!    the sole success exit. A result rejected by the success predicate, or
//!    any error, is recorded as the last outcome and falls through to the
//!    wait step. Exception: a *retryable* error on the literal final bounded
//!    attempt propagates at once, without waiting or checking the deadline.
//! 3. Wait step: stop if the deadline has passed, otherwise sleep for the
//!    configured interval and go again.
//! 4. When the attempt budget or deadline is exhausted, the last recorded
//!    error propagates; if the last outcome was a rejected result, that
//!    value is returned as-is even though the predicate never accepted it.
//!
//! Two deliberate quirks, kept because callers depend on them:
//!
//! - A **non-retryable** error does not short-circuit. It is recorded and
//!   retried like any other failure, surfacing only once the budget or
//!   deadline runs out. Only retryable errors get the immediate
//!   final-attempt propagation.
//! - The deadline is evaluated between attempts only. A long-running single
//!   attempt is never interrupted, and an unbounded policy with no timeout
//!   can loop forever.

use std::future::Future;
use std::time::Instant;

use crate::config::RetryConfig;

/// Most recent attempt outcome. The executor keeps no history beyond this.
enum LastOutcome<T, E> {
    /// `Ok` result the success predicate turned down.
    Rejected(T),
    /// Error, retryable or not.
    Errored(E),
}

/// What to do with one attempt's result.
enum Step<T, E> {
    /// Terminal: hand this straight back to the caller.
    Finish(Result<T, E>),
    /// Record and fall through to the wait step.
    Record(LastOutcome<T, E>),
}

impl<T, E> RetryConfig<T, E> {
    /// Runs `operation` under this policy, blocking the calling thread
    /// during inter-attempt waits.
    ///
    /// Returns the first accepted result, or propagates exactly one error:
    /// the most recent one the operation produced. The operation may have
    /// arbitrary side effects on each invocation; the executor makes no
    /// idempotence guarantee over it.
    pub fn execute<F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let deadline = self.timeout().map(|timeout| Instant::now() + timeout);
        let mut attempt: u32 = 0;
        let mut last: Option<LastOutcome<T, E>> = None;

        loop {
            if let Some(max) = self.max_attempts()
                && attempt >= max.get()
            {
                break;
            }
            attempt += 1;

            match self.assess(attempt, operation()) {
                Step::Finish(result) => return result,
                Step::Record(outcome) => last = Some(outcome),
            }

            if deadline_passed(deadline) {
                tracing::debug!(attempt, "retry deadline exceeded, giving up");
                break;
            }
            std::thread::sleep(self.interval());
        }

        finish(last)
    }

    /// Async counterpart of [`execute`](RetryConfig::execute): identical
    /// semantics, sleeping via `tokio::time::sleep`. The deadline is still
    /// only checked between attempts; an in-flight attempt is never
    /// cancelled.
    pub async fn execute_async<F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let deadline = self.timeout().map(|timeout| Instant::now() + timeout);
        let mut attempt: u32 = 0;
        let mut last: Option<LastOutcome<T, E>> = None;

        loop {
            if let Some(max) = self.max_attempts()
                && attempt >= max.get()
            {
                break;
            }
            attempt += 1;

            match self.assess(attempt, operation().await) {
                Step::Finish(result) => return result,
                Step::Record(outcome) => last = Some(outcome),
            }

            if deadline_passed(deadline) {
                tracing::debug!(attempt, "retry deadline exceeded, giving up");
                break;
            }
            tokio::time::sleep(self.interval()).await;
        }

        finish(last)
    }

    /// Classifies one attempt's result per the policy.
    fn assess(&self, attempt: u32, outcome: Result<T, E>) -> Step<T, E> {
        match outcome {
            Ok(value) => {
                if self.accepts(&value) {
                    return Step::Finish(Ok(value));
                }
                tracing::debug!(attempt, "result rejected by success predicate, retrying");
                Step::Record(LastOutcome::Rejected(value))
            }
            Err(err) => {
                let retryable = self.is_retryable(&err);
                if retryable && self.is_final_attempt(attempt) {
                    return Step::Finish(Err(err));
                }
                tracing::debug!(attempt, retryable, "attempt failed, retrying");
                Step::Record(LastOutcome::Errored(err))
            }
        }
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() > deadline)
}

/// Terminal outcome once the attempt loop has ended without an accepted
/// result: the last error if one was recorded, else the last rejected value.
fn finish<T, E>(last: Option<LastOutcome<T, E>>) -> Result<T, E> {
    match last {
        Some(LastOutcome::Errored(err)) => Err(err),
        Some(LastOutcome::Rejected(value)) => Ok(value),
        // max_attempts is validated nonzero, so at least one attempt ran.
        None => unreachable!("retry loop ended before the first attempt"),
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;
    use std::time::Instant;

    use pretty_assertions::assert_eq;

    use crate::config::RetryConfig;

    #[derive(Debug, thiserror::Error, PartialEq)]
    enum TestError {
        #[error("transient: {0}")]
        Transient(&'static str),
        #[error("fatal: {0}")]
        Fatal(&'static str),
    }

    fn transient_only() -> crate::config::RetryConfigBuilder<i32, TestError> {
        RetryConfig::builder().retry_if(|e| matches!(e, TestError::Transient(_)))
    }

    #[test]
    fn immediate_success_runs_once_without_sleeping() {
        let config = RetryConfig::<i32, io::Error>::builder()
            .interval(Duration::from_secs(5))
            .build()
            .unwrap();

        let mut calls = 0;
        let started = Instant::now();
        let result = config.execute(|| {
            calls += 1;
            Ok(42)
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn retryable_error_on_final_attempt_propagates_without_waiting() {
        let config = transient_only()
            .max_attempts(3)
            .interval(Duration::from_millis(50))
            .build()
            .unwrap();

        let mut calls = 0;
        let started = Instant::now();
        let result = config.execute(|| {
            calls += 1;
            Err::<i32, _>(TestError::Transient("still down"))
        });

        assert_eq!(result.unwrap_err(), TestError::Transient("still down"));
        assert_eq!(calls, 3);
        // Two sleeps between the three attempts, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(220), "elapsed {elapsed:?}");
    }

    #[test]
    fn non_retryable_error_does_not_short_circuit() {
        let config = transient_only()
            .max_attempts(3)
            .interval(Duration::from_millis(50))
            .build()
            .unwrap();

        let mut calls = 0;
        let started = Instant::now();
        let result = config.execute(|| {
            calls += 1;
            Err::<i32, _>(TestError::Fatal("bad input"))
        });

        // All three attempts run, and the last error is what surfaces.
        assert_eq!(result.unwrap_err(), TestError::Fatal("bad input"));
        assert_eq!(calls, 3);
        // A non-retryable final attempt still passes through the wait step.
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn predicate_rejections_retry_until_a_result_passes() {
        let config = RetryConfig::<i32, TestError>::builder()
            .success_if(|n| *n > 2)
            .max_attempts(10)
            .build()
            .unwrap();

        let mut calls = 0;
        let result = config.execute(|| {
            calls += 1;
            Ok(calls)
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhausted_rejections_return_the_last_result_as_is() {
        let config = RetryConfig::<i32, TestError>::builder()
            .success_if(|n| *n > 100)
            .max_attempts(3)
            .build()
            .unwrap();

        let mut calls = 0;
        let result = config.execute(|| {
            calls += 1;
            Ok(calls)
        });

        // Never accepted, never an error: the last value comes back.
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn last_outcome_wins_when_errors_and_rejections_interleave() {
        let config = RetryConfig::<i32, TestError>::builder()
            .success_if(|n| *n > 100)
            .max_attempts(2)
            .build()
            .unwrap();

        let mut calls = 0;
        let result = config.execute(|| {
            calls += 1;
            if calls == 1 {
                Err(TestError::Transient("warming up"))
            } else {
                Ok(calls)
            }
        });

        // Attempt 1 errored, attempt 2 was rejected: the rejection is the
        // last outcome, so the value returns and the error is dropped.
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn deadline_bounds_an_unbounded_policy() {
        let config = transient_only()
            .unbounded_attempts()
            .timeout(Duration::from_millis(200))
            .interval(Duration::from_millis(50))
            .build()
            .unwrap();

        let mut calls = 0;
        let started = Instant::now();
        let result = config.execute(|| {
            calls += 1;
            Err::<i32, _>(TestError::Transient("still down"))
        });

        assert_eq!(result.unwrap_err(), TestError::Transient("still down"));
        assert!(started.elapsed() < Duration::from_millis(600));
        // floor(timeout / interval) + 1, give or take scheduling.
        assert!((2..=7).contains(&calls), "calls = {calls}");
    }

    #[test]
    fn a_config_can_be_reused_with_independent_state() {
        let config = transient_only().max_attempts(3).build().unwrap();

        for _ in 0..2 {
            let mut calls = 0;
            let result = config.execute(|| {
                calls += 1;
                Err::<i32, _>(TestError::Transient("still down"))
            });
            assert_eq!(result.unwrap_err(), TestError::Transient("still down"));
            // Each execution starts its own attempt counter.
            assert_eq!(calls, 3);
        }
    }

    mod async_executor {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        use pretty_assertions::assert_eq;

        use super::TestError;
        use crate::config::RetryConfig;

        #[tokio::test]
        async fn immediate_success_runs_once() {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let config = RetryConfig::<i32, TestError>::builder().build().unwrap();

            let result = config
                .execute_async(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    }
                })
                .await;

            assert_eq!(result.unwrap(), 42);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn retryable_error_exhausts_the_attempt_budget() {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let config = RetryConfig::<i32, TestError>::builder()
                .retry_if(|e| matches!(e, TestError::Transient(_)))
                .max_attempts(3)
                .interval(Duration::from_millis(5))
                .build()
                .unwrap();

            let result = config
                .execute_async(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<i32, _>(TestError::Transient("still down"))
                    }
                })
                .await;

            assert_eq!(result.unwrap_err(), TestError::Transient("still down"));
            assert_eq!(calls.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn rejected_results_are_retried_then_accepted() {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = calls.clone();
            let config = RetryConfig::<usize, TestError>::builder()
                .success_if(|n| *n > 1)
                .max_attempts(5)
                .build()
                .unwrap();

            let result = config
                .execute_async(move || {
                    let counter = counter.clone();
                    async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
                })
                .await;

            assert_eq!(result.unwrap(), 2);
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }
}
