//! Session validators.
//!
//! A validator is a side-effect check that runs on every poll attempt of
//! every wait, whichever condition is being awaited. It exists to surface
//! unexpected application states (an error dialog, a crashed page) early,
//! instead of letting the wait run into its timeout. A validator error is
//! never swallowed: it aborts the wait.
//!
//! Validators receive the session they run in, so one that inspects the
//! page does not need to hold its own [`Browser`] clone (which would keep
//! the session, and its driver, alive through the registry).

use crate::browser::Browser;
use crate::result::{WaitError, WaitResult};
use crate::wait::CallStack;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Check run once per poll attempt
#[async_trait]
pub trait Validator: Send + Sync {
    /// Raise if the session is in an unexpected state
    async fn validate(&self, browser: &Browser, stack: &CallStack) -> WaitResult<()>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Validator backed by a plain function
pub struct FnValidator<F> {
    name: String,
    check: F,
}

impl<F> FnValidator<F> {
    /// Wrap `check` as a named validator
    pub fn new(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Browser, &CallStack) -> WaitResult<()> + Send + Sync,
    {
        Self {
            name: name.into(),
            check,
        }
    }
}

/// Validator from a plain predicate: `false` raises a validation failure
/// naming the check and the operation it interrupted.
pub fn predicate_validator<P>(
    name: impl Into<String>,
    predicate: P,
) -> FnValidator<impl Fn(&Browser, &CallStack) -> WaitResult<()> + Send + Sync>
where
    P: Fn(&Browser) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    let label = name.clone();
    FnValidator::new(name, move |browser: &Browser, stack: &CallStack| {
        if predicate(browser) {
            Ok(())
        } else {
            Err(WaitError::validation(format!(
                "check '{label}' failed during {}",
                stack.label()
            )))
        }
    })
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: Fn(&Browser, &CallStack) -> WaitResult<()> + Send + Sync,
{
    async fn validate(&self, browser: &Browser, stack: &CallStack) -> WaitResult<()> {
        (self.check)(browser, stack)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Append-only list of validators shared by every clone of a session
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: Arc<RwLock<Vec<Arc<dyn Validator>>>>,
}

impl ValidatorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator. There is no removal.
    pub fn register(&self, validator: impl Validator + 'static) {
        let validator: Arc<dyn Validator> = Arc::new(validator);
        tracing::debug!(validator = validator.name(), "registering validator");
        self.validators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(validator);
    }

    /// Number of registered validators
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether no validator is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Validator>> {
        self.validators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run every validator in registration order; the first error aborts.
    pub async fn validate_all(&self, browser: &Browser, stack: &CallStack) -> WaitResult<()> {
        for validator in self.snapshot() {
            if let Err(e) = validator.validate(browser, stack).await {
                tracing::warn!(
                    validator = validator.name(),
                    during = stack.label(),
                    error = %e,
                    "validator raised"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .snapshot()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &names)
            .finish()
    }
}
