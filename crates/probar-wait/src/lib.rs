//! Probar Wait: condition polling and staleness-aware elements for
//! browser e2e tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBAR WAIT Architecture                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Conditions │    │ Wait       │    │ Automation │            │
//! │   │ (any-of)   │───►│ Engine     │───►│ Driver     │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │ every attempt                        │
//! │                     ┌─────▼──────┐                               │
//! │                     │ Validators │                               │
//! │                     └────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`Browser`] is the session: one driver, one validator registry, one
//! set of wait defaults. Conditions are polled through the driver until
//! one is ready or the budget runs out, and the session's validators run
//! once per attempt so a page error fails the wait early. Elements are
//! located through [`WebComponent`], which refetches itself when the DOM
//! replaced the node it pointed at.
//!
//! # Example
//!
//! ```ignore
//! use probar_wait::{condition, Browser, MockDriver, MockNode};
//!
//! let driver = MockDriver::new();
//! let _ = driver.add_node(MockNode::new("button#save"));
//! let browser = Browser::new(driver);
//!
//! let save = browser.locator("button#save");
//! browser.wait_for(condition::clickable(save)).await?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod browser;
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod cdp;
/// Conditions polled by the wait engine
pub mod condition;
mod config;
#[allow(clippy::missing_errors_doc)]
mod driver;
#[allow(clippy::missing_errors_doc)]
mod element;
#[allow(clippy::missing_errors_doc)]
mod ensure;
mod logging;
/// Higher-order wrappers for logging, validation and settling
pub mod middleware;
#[allow(clippy::missing_errors_doc)]
mod page;
mod result;
#[allow(clippy::missing_errors_doc)]
mod retry;
mod selector;
#[allow(clippy::missing_errors_doc)]
mod validator;
mod wait;

pub use browser::{Browser, ElementLocator};
#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;
pub use condition::{Accessor, Condition};
pub use config::{
    HarnessConfig, ENV_LOAD_TIME_MS, ENV_POLL_INTERVAL_MS, ENV_RETRY_ATTEMPTS,
    ENV_WAIT_TIMEOUT_MS,
};
pub use driver::{
    poll_with_interval, AutomationDriver, ElementRef, MockDriver, MockFailure, MockNode,
    PollPredicate, PollStats,
};
pub use element::{
    parse_z_index, Button, Component, ElementState, TextInput, WebComponent,
    DISABLED_CLASS_MARKER,
};
pub use ensure::{ensure, Ensure};
pub use logging::{init_json_tracing, init_tracing, DEFAULT_DIRECTIVE};
pub use middleware::{logged, settled, validated};
pub use page::{PageElements, PageObject};
pub use result::{FailureKind, WaitError, WaitResult};
pub use retry::{retry, with_retry, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use selector::{Selector, XPATH_MARKER};
pub use validator::{predicate_validator, FnValidator, Validator, ValidatorRegistry};
pub use wait::{
    CallStack, ConditionErrorPolicy, ConditionOutcome, WaitOptions, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::condition;
    pub use super::middleware::{logged, settled, validated};
    pub use super::{
        ensure, retry, with_retry, Accessor, AutomationDriver, Browser, Button, CallStack,
        Component, Condition, ConditionErrorPolicy, ConditionOutcome, ElementLocator,
        ElementRef, ElementState, FnValidator, HarnessConfig, MockDriver, MockNode, PageElements,
        PageObject, RetryPolicy, Selector, TextInput, Validator, WaitError, WaitOptions,
        WaitResult, WebComponent,
    };
}
