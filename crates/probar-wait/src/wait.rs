//! Wait Engine
//!
//! Races a list of [`Condition`]s against a timeout. Each poll attempt
//! evaluates the conditions in caller order, short-circuiting on the first
//! one that is ready, then runs every registered validator exactly once.
//! The sleep/timeout loop itself belongs to the driver
//! ([`AutomationDriver::poll_until`](crate::driver::AutomationDriver::poll_until)).
//!
//! ## Error folding
//!
//! Every condition evaluation yields a [`ConditionOutcome`]. `NotReady` and
//! recoverable errors (not-found / stale) keep the loop polling. Under
//! [`ConditionErrorPolicy::Strict`] any other error aborts the wait once the
//! attempt's validators have run; [`ConditionErrorPolicy::Lenient`] folds
//! every error into "not yet".

use crate::browser::Browser;
use crate::condition::Condition;
use crate::driver::{PollPredicate, PollStats};
use crate::result::{WaitError, WaitResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// How condition errors that are not "element missing/stale" are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionErrorPolicy {
    /// Unexpected errors abort the wait
    #[default]
    Strict,
    /// Every condition error counts as "not yet"
    Lenient,
}

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Treatment of unexpected condition errors
    pub condition_errors: ConditionErrorPolicy,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            condition_errors: ConditionErrorPolicy::Strict,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the condition error policy
    #[must_use]
    pub const fn with_condition_errors(mut self, policy: ConditionErrorPolicy) -> Self {
        self.condition_errors = policy;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// CONDITION OUTCOME
// =============================================================================

/// Tagged result of evaluating one condition once
#[derive(Debug)]
pub enum ConditionOutcome {
    /// The awaited state has been reached
    Ready,
    /// Not yet
    NotReady,
    /// Evaluation raised
    Error(WaitError),
}

impl ConditionOutcome {
    /// Fold a raw evaluation result into an outcome
    #[must_use]
    pub fn from_result(result: WaitResult<bool>) -> Self {
        match result {
            Ok(true) => Self::Ready,
            Ok(false) => Self::NotReady,
            Err(e) => Self::Error(e),
        }
    }

    /// Whether this outcome ends the wait successfully
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether this outcome must abort the wait under `policy`
    #[must_use]
    pub fn is_fatal(&self, policy: ConditionErrorPolicy) -> bool {
        match self {
            Self::Error(e) => policy == ConditionErrorPolicy::Strict && !e.is_recoverable(),
            Self::Ready | Self::NotReady => false,
        }
    }
}

// =============================================================================
// CALL STACK
// =============================================================================

/// Call-site stack captured when a wait (or validated operation) starts.
///
/// Handed to validators for diagnostics. Capture honours
/// `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`, so it is cheap when disabled.
#[derive(Debug, Clone)]
pub struct CallStack {
    label: String,
    backtrace: Arc<Backtrace>,
}

impl CallStack {
    /// Capture the current stack
    #[must_use]
    pub fn capture(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// What was being done when the stack was captured
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The captured backtrace
    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl std::fmt::Display for CallStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n{}", self.label, self.backtrace)
    }
}

// =============================================================================
// POLL ATTEMPT
// =============================================================================

/// Run one poll attempt: conditions in order, then every validator once.
///
/// A validator error takes precedence over everything else in the attempt,
/// including a condition that became ready.
pub(crate) async fn poll_attempt(
    browser: &Browser,
    conditions: &[Condition],
    stack: &CallStack,
    policy: ConditionErrorPolicy,
) -> WaitResult<bool> {
    let mut ready = false;
    let mut fatal: Option<WaitError> = None;

    for condition in conditions {
        let outcome = condition.evaluate(browser).await;
        let is_fatal = outcome.is_fatal(policy);
        match outcome {
            ConditionOutcome::Ready => {
                tracing::trace!(condition = condition.name(), "condition ready");
                ready = true;
                break;
            }
            ConditionOutcome::NotReady => {}
            ConditionOutcome::Error(e) if is_fatal => {
                tracing::debug!(condition = condition.name(), error = %e, "condition raised");
                fatal = Some(e);
                break;
            }
            ConditionOutcome::Error(e) => {
                tracing::trace!(condition = condition.name(), error = %e, "condition not ready");
            }
        }
    }

    browser.validators().validate_all(browser, stack).await?;

    match fatal {
        Some(e) => Err(e),
        None => Ok(ready),
    }
}

/// Wait until any of `conditions` is ready, polling through the driver.
pub(crate) async fn wait_for_any(
    browser: &Browser,
    conditions: Vec<Condition>,
    options: WaitOptions,
    stack: CallStack,
) -> WaitResult<PollStats> {
    let names: Vec<&str> = conditions.iter().map(Condition::name).collect();
    tracing::debug!(
        conditions = ?names,
        timeout_ms = options.timeout_ms,
        "waiting for any condition"
    );

    let conditions: Arc<[Condition]> = conditions.into();
    let session = browser.clone();
    let policy = options.condition_errors;

    let mut predicate = move || -> BoxFuture<'static, WaitResult<bool>> {
        let session = session.clone();
        let conditions = Arc::clone(&conditions);
        let stack = stack.clone();
        async move { poll_attempt(&session, &conditions, &stack, policy).await }.boxed()
    };

    let result = browser
        .driver()
        .poll_until(&mut predicate as &mut PollPredicate<'_>, &options)
        .await;

    match &result {
        Ok(stats) => tracing::debug!(
            attempts = stats.attempts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "wait satisfied"
        ),
        Err(e) => tracing::debug!(error = %e, "wait failed"),
    }
    result
}

// =============================================================================
// TESTS
// =============================================================================
