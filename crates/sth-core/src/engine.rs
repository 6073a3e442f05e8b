//! Status-driven execution engine.
//!
//! Runs a remote operation, classifies each attempt against an expected and
//! a retriable status set, and retries with a fixed delay:
//!
//! 1. An error whose text contains an ignore substring returns at once.
//! 2. A status in the expected set returns at once.
//! 3. A status outside both sets fails immediately when `fail_on_error`
//!    is set; otherwise the loop keeps consuming attempts.
//! 4. Anything else sleeps and tries again, up to `max_retries` times.
//!
//! Running out of attempts fails when `fail_on_error` is set, otherwise it
//! yields [`RunOutcome::Exhausted`].

use crate::error::{ClusterError, ClusterResult, Outcome};
use crate::status::{StatusCode, StatusSet};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay strategy between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps requested so far.
    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }

    /// Every requested delay, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Status policy for one engine call.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Statuses that end the call successfully
    pub expected: StatusSet,
    /// Statuses that are retried after the fixed delay
    pub retriable: StatusSet,
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Fail on unexpected statuses and on exhaustion
    pub fail_on_error: bool,
    /// Hand ignored errors back to the caller
    pub return_error: bool,
    /// Substrings of error text that bypass all status policy
    pub ignore_errors: Vec<String>,
}

impl RunPolicy {
    /// Expect `expected`, nothing retriable, no retries, fail on error.
    pub fn expect(expected: impl Into<StatusSet>) -> Self {
        Self {
            expected: expected.into(),
            retriable: StatusSet::new(),
            max_retries: 0,
            fail_on_error: true,
            return_error: false,
            ignore_errors: Vec::new(),
        }
    }

    /// Set the retriable statuses.
    pub fn with_retriable(mut self, retriable: impl Into<StatusSet>) -> Self {
        self.retriable = retriable.into();
        self
    }

    /// Set the retry budget.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn with_return_error(mut self, return_error: bool) -> Self {
        self.return_error = return_error;
        self
    }

    /// Ignore errors whose text contains `substring`.
    pub fn ignoring(mut self, substring: impl Into<String>) -> Self {
        self.ignore_errors.push(substring.into());
        self
    }

    fn is_ignored(&self, error: &ClusterError) -> bool {
        if self.ignore_errors.is_empty() {
            return false;
        }
        let text = error.to_string();
        self.ignore_errors.iter().any(|sub| text.contains(sub.as_str()))
    }
}

/// Non-failing result of an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    /// The operation returned and `SUCCESS` was expected
    Success(T),
    /// The operation failed with a status the caller expected
    ExpectedError(ClusterError),
    /// The error matched an ignore substring; carried only with `return_error`
    Ignored(Option<ClusterError>),
    /// Attempts ran out with `fail_on_error` unset
    Exhausted { last: Outcome },
}

impl<T> RunOutcome<T> {
    /// The operation's value, when it returned one.
    pub fn into_value(self) -> Option<T> {
        match self {
            RunOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RunOutcome::Exhausted { .. })
    }

    /// The remote error carried by this outcome, if any.
    pub fn error(&self) -> Option<&ClusterError> {
        match self {
            RunOutcome::ExpectedError(err) => Some(err),
            RunOutcome::Ignored(err) => err.as_ref(),
            RunOutcome::Exhausted {
                last: Outcome::Error(err),
            } => Some(err),
            _ => None,
        }
    }
}

/// Retry-and-expected-status executor.
///
/// Holds no per-call state, so one engine can serve any number of calls.
#[derive(Clone)]
pub struct Engine {
    retry_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Engine {
    /// Engine with a fixed `retry_delay` that really sleeps.
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the sleep strategy.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Run `operation` under `policy`.
    pub fn run<T, F>(&self, policy: &RunPolicy, mut operation: F) -> Result<RunOutcome<T>>
    where
        F: FnMut() -> ClusterResult<T>,
    {
        let attempts = policy.max_retries.saturating_add(1);
        let mut last = Outcome::Status(StatusCode::Success);

        for attempt in 1..=attempts {
            let result = operation();
            let status = match &result {
                Ok(_) => {
                    debug!(attempt, "Success operation");
                    StatusCode::Success
                }
                Err(err) => {
                    info!(attempt, status = %err.status, error = %err, "request status");
                    err.status
                }
            };

            if let Err(err) = &result {
                if policy.is_ignored(err) {
                    debug!(status = %status, "Error matched an ignore pattern");
                    let returned = policy.return_error.then(|| err.clone());
                    return Ok(RunOutcome::Ignored(returned));
                }
            }

            if policy.expected.contains(status) {
                return Ok(match result {
                    Ok(value) => RunOutcome::Success(value),
                    Err(err) => RunOutcome::ExpectedError(err),
                });
            }

            last = match result {
                Ok(_) => Outcome::Status(status),
                Err(err) => Outcome::Error(err),
            };

            if !policy.retriable.contains(status) && policy.fail_on_error {
                return Err(Error::UnexpectedStatus {
                    expected: policy.expected.clone(),
                    actual: last,
                });
            }

            if attempt < attempts {
                debug!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "Retrying operation"
                );
                self.sleeper.sleep(self.retry_delay);
            }
        }

        if policy.fail_on_error {
            return Err(Error::RetriesExceeded {
                expected: policy.expected.clone(),
                actual: last,
            });
        }

        warn!(
            expected = %policy.expected,
            last = %last,
            attempts,
            "Retries exceeded, returning without failure"
        );
        Ok(RunOutcome::Exhausted { last })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn engine() -> (Engine, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let engine = Engine::new(Duration::from_secs(3)).with_sleeper(sleeper.clone());
        (engine, sleeper)
    }

    fn overloaded() -> ClusterError {
        ClusterError::new(StatusCode::Overloaded, "overloaded")
    }

    #[test]
    fn test_expected_on_first_attempt_does_not_sleep() {
        let (engine, sleeper) = engine();
        let policy = RunPolicy::expect(StatusCode::Success).with_retries(5);

        let outcome = engine.run(&policy, || Ok::<_, ClusterError>(42)).unwrap();

        assert_eq!(outcome, RunOutcome::Success(42));
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_retriable_until_exhausted_sleeps_n_times() {
        let (engine, sleeper) = engine();
        let calls = Cell::new(0);
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retriable(StatusSet::default_retriable())
            .with_retries(3);

        let result = engine.run(&policy, || -> ClusterResult<()> {
            calls.set(calls.get() + 1);
            Err(overloaded())
        });

        assert!(matches!(result, Err(Error::RetriesExceeded { .. })));
        assert_eq!(calls.get(), 4);
        assert_eq!(sleeper.count(), 3);
        assert!(sleeper.sleeps().iter().all(|d| *d == Duration::from_secs(3)));
    }

    #[test]
    fn test_exhausted_without_fail_on_error() {
        let (engine, sleeper) = engine();
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retriable(StatusCode::Overloaded)
            .with_retries(2)
            .with_fail_on_error(false);

        let outcome = engine
            .run(&policy, || -> ClusterResult<()> { Err(overloaded()) })
            .unwrap();

        assert!(outcome.is_exhausted());
        assert_eq!(outcome.error().map(|e| e.status), Some(StatusCode::Overloaded));
        assert_eq!(sleeper.count(), 2);
    }

    #[test]
    fn test_retry_then_success() {
        let (engine, sleeper) = engine();
        let calls = Cell::new(0);
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retriable(StatusSet::default_retriable())
            .with_retries(5);

        let outcome = engine
            .run(&policy, || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(ClusterError::new(StatusCode::Unavailable, "node down"))
                } else {
                    Ok("done")
                }
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Success("done"));
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeper.count(), 2);
    }

    #[test]
    fn test_unexpected_status_fails_fast() {
        let (engine, sleeper) = engine();
        let calls = Cell::new(0);
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retriable(StatusSet::default_retriable())
            .with_retries(5);

        let result = engine.run(&policy, || -> ClusterResult<()> {
            calls.set(calls.get() + 1);
            Err(ClusterError::scheme("table not found"))
        });

        match result {
            Err(Error::UnexpectedStatus { expected, actual }) => {
                assert_eq!(expected, StatusSet::success());
                assert_eq!(actual.status(), StatusCode::SchemeError);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_unexpected_status_without_fail_consumes_all_attempts() {
        let (engine, sleeper) = engine();
        let calls = Cell::new(0);
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retries(2)
            .with_fail_on_error(false);

        let outcome = engine
            .run(&policy, || -> ClusterResult<()> {
                calls.set(calls.get() + 1);
                Err(ClusterError::scheme("bad"))
            })
            .unwrap();

        assert!(outcome.is_exhausted());
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeper.count(), 2);
    }

    #[test]
    fn test_unexpected_success() {
        let (engine, _) = engine();
        let policy = RunPolicy::expect(StatusCode::SchemeError);

        let result = engine.run(&policy, || Ok::<_, ClusterError>(()));

        match result {
            Err(Error::UnexpectedStatus { actual, .. }) => {
                assert_eq!(actual, Outcome::Status(StatusCode::Success));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_expected_error_status() {
        let (engine, _) = engine();
        let policy = RunPolicy::expect([StatusCode::Success, StatusCode::SchemeError]);

        let outcome = engine
            .run(&policy, || -> ClusterResult<()> {
                Err(ClusterError::scheme("path does not exist"))
            })
            .unwrap();

        assert!(matches!(outcome, RunOutcome::ExpectedError(ref e) if e.is_scheme_error()));
        assert!(outcome.into_value().is_none());
    }

    #[test]
    fn test_ignored_error_bypasses_policy() {
        let (engine, sleeper) = engine();
        let policy = RunPolicy::expect(StatusCode::Success)
            .with_retries(3)
            .ignoring("already exists");

        let outcome = engine
            .run(&policy, || -> ClusterResult<()> {
                Err(ClusterError::new(
                    StatusCode::GenericError,
                    "table already exists",
                ))
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Ignored(None));
        assert_eq!(sleeper.count(), 0);
    }

    #[test]
    fn test_ignored_error_returned() {
        let (engine, _) = engine();
        let policy = RunPolicy::expect(StatusCode::Success)
            .ignoring("PRECONDITION")
            .with_return_error(true);

        let outcome = engine
            .run(&policy, || -> ClusterResult<()> {
                Err(ClusterError::new(StatusCode::PreconditionFailed, "locks invalidated"))
            })
            .unwrap();

        assert_eq!(
            outcome.error().map(|e| e.status),
            Some(StatusCode::PreconditionFailed)
        );
    }

    #[test]
    fn test_ignore_does_not_apply_to_success() {
        let (engine, _) = engine();
        let policy = RunPolicy::expect(StatusCode::Success).ignoring("");

        let outcome = engine.run(&policy, || Ok::<_, ClusterError>(1)).unwrap();

        assert_eq!(outcome, RunOutcome::Success(1));
    }
}
