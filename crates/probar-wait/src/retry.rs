//! Retry Orchestrator
//!
//! Re-invokes a fallible async operation while its error matches a
//! predicate, up to a bounded number of retries. There is no delay and no
//! timeout between attempts: a hung attempt hangs the whole sequence. The
//! final error is returned as-is so callers can still match on its kind.
//!
//! ```ignore
//! let policy = RetryPolicy::on_stale().with_max_attempts(3);
//! retry(&policy, || component.click_once()).await?;
//! ```

use crate::result::{FailureKind, WaitError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Which errors to retry and how often
pub struct RetryPolicy<E = WaitError> {
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
    max_attempts: usize,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            max_attempts: self.max_attempts,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            predicate: Arc::new(|_| true),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl<E> RetryPolicy<E> {
    /// Retry every error, up to [`DEFAULT_MAX_ATTEMPTS`] times
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry only errors matching `predicate`
    #[must_use]
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Set the number of retries after the initial attempt
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Number of retries after the initial attempt
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Whether `error` is eligible for another attempt
    pub fn matches(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

impl RetryPolicy<WaitError> {
    /// Retry errors of one failure kind
    #[must_use]
    pub fn on_kind(kind: FailureKind) -> Self {
        Self::new().when(move |e: &WaitError| e.kind() == kind)
    }

    /// Retry stale element references only
    #[must_use]
    pub fn on_stale() -> Self {
        Self::on_kind(FailureKind::StaleReference)
    }

    /// Retry lookups that matched nothing
    #[must_use]
    pub fn on_not_found() -> Self {
        Self::on_kind(FailureKind::NotFound)
    }
}

/// Run `operation` under `policy`.
///
/// The operation runs at most `1 + policy.max_attempts()` times. A
/// non-matching error, or any error once the budget is spent, is returned
/// unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut remaining = policy.max_attempts;
    let mut attempt = 1_usize;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining > 0 && policy.matches(&e) => {
                tracing::debug!(attempt, remaining, error = %e, "retrying operation");
                remaining -= 1;
                attempt += 1;
            }
            Err(e) => {
                if remaining == 0 && attempt > 1 {
                    tracing::debug!(attempts = attempt, error = %e, "retry budget exhausted");
                }
                return Err(e);
            }
        }
    }
}

/// Wrap `operation` into an equivalent operation that retries under `policy`.
///
/// The returned closure has the same shape as the input (no arguments, a
/// future of `Result<T, E>`), so it can be passed anywhere the wrapped one
/// could.
pub fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy<E>,
    operation: F,
) -> impl Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    let operation = Arc::new(operation);
    move || {
        let policy = policy.clone();
        let operation = Arc::clone(&operation);
        async move { retry(&policy, || operation()).await }.boxed()
    }
}
