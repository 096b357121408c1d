//! Wait conditions.
//!
//! A [`Condition`] is a named predicate over the session, evaluated once per
//! poll attempt. The factories here take element *accessors*: zero-argument
//! functions that locate a component each time they are called, so a
//! condition keeps working across re-renders and before the element exists.
//!
//! Conditions propagate lookup errors with `?`; the wait engine turns
//! not-found and stale failures into "not yet". Only [`not_visible`] and
//! [`does_not_exist`] read those failures as success.

use crate::browser::Browser;
use crate::element::WebComponent;
use crate::page::PageObject;
use crate::result::WaitResult;
use crate::wait::ConditionOutcome;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Locates a component on demand
pub trait Accessor: Send + Sync + 'static {
    /// Component type handed out
    type Component: AsRef<WebComponent> + Send + 'static;

    /// Locate the component now
    fn access(&self) -> BoxFuture<'static, WaitResult<Self::Component>>;
}

impl<F, Fut, C> Accessor for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WaitResult<C>> + Send + 'static,
    C: AsRef<WebComponent> + Send + 'static,
{
    type Component = C;

    fn access(&self) -> BoxFuture<'static, WaitResult<C>> {
        self().boxed()
    }
}

type Predicate = dyn Fn(Browser) -> BoxFuture<'static, WaitResult<bool>> + Send + Sync;

/// Named predicate over the session
#[derive(Clone)]
pub struct Condition {
    name: Arc<str>,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Condition {
    /// Build a condition from an async predicate
    pub fn from_fn<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Browser) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WaitResult<bool>> + Send + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            predicate: Arc::new(move |browser| predicate(browser).boxed()),
        }
    }

    /// Name used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    /// Evaluate once, returning the raw result
    pub async fn check(&self, browser: &Browser) -> WaitResult<bool> {
        (self.predicate)(browser.clone()).await
    }

    /// Evaluate once as a tagged outcome
    pub async fn evaluate(&self, browser: &Browser) -> ConditionOutcome {
        ConditionOutcome::from_result(self.check(browser).await)
    }

    /// Ready exactly when `self` evaluates to false; errors pass through
    #[must_use]
    pub fn negate(self) -> Self {
        let name = format!("not({})", self.name);
        let inner = self.predicate;
        Self::from_fn(name, move |browser| {
            let inner = Arc::clone(&inner);
            async move { Ok(!inner(browser).await?) }
        })
    }
}

fn owned(values: &[&str]) -> Arc<[String]> {
    values.iter().map(|v| (*v).to_string()).collect()
}

fn borrowed(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

/// Read a check: not-found and stale mean `gone`, anything else propagates
fn settle(check: WaitResult<bool>, gone: bool) -> WaitResult<bool> {
    match check {
        Err(e) if e.is_recoverable() => Ok(gone),
        other => other,
    }
}

/// Element is rendered and not hidden by style
pub fn visible<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("visible", move |_| {
        let element = accessor.access();
        async move {
            let element = element.await?;
            settle(element.as_ref().check_displayed().await, false)
        }
    })
}

/// Element is hidden, or gone (not-found and stale count as success)
pub fn not_visible<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("not_visible", move |_| {
        let element = accessor.access();
        async move {
            match element.await {
                Ok(c) => settle(c.as_ref().check_displayed().await.map(|d| !d), true),
                Err(e) if e.is_recoverable() => Ok(true),
                Err(e) => Err(e),
            }
        }
    })
}

/// Element resolves, is attached, displayed and enabled
pub fn clickable<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("clickable", move |_| {
        let element = accessor.access();
        async move {
            let element = element.await?;
            let c = element.as_ref();
            if c.is_stale().await || !settle(c.check_displayed().await, false)? {
                return Ok(false);
            }
            settle(c.check_enabled().await, false)
        }
    })
}

/// Element resolves at all
pub fn present<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("present", move |_| {
        let element = accessor.access();
        async move { element.await.map(|_| true) }
    })
}

/// Element is enabled
pub fn enabled<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("enabled", move |_| {
        let element = accessor.access();
        async move { settle(element.await?.as_ref().check_enabled().await, false) }
    })
}

/// Locating or probing the element raises not-found or stale
pub fn does_not_exist<A: Accessor>(accessor: A) -> Condition {
    Condition::from_fn("does_not_exist", move |_| {
        let element = accessor.access();
        async move {
            match element.await {
                Ok(c) => Ok(!c.as_ref().resolve().await?.is_fresh()),
                Err(e) if e.is_recoverable() => Ok(true),
                Err(e) => Err(e),
            }
        }
    })
}

/// `a` stacks strictly above `b`
pub fn above<A: Accessor, B: Accessor>(a: A, b: B) -> Condition {
    Condition::from_fn("above", move |_| {
        let (a, b) = (a.access(), b.access());
        async move {
            let za = a.await?.as_ref().z_index().await?;
            let zb = b.await?.as_ref().z_index().await?;
            Ok(za > zb)
        }
    })
}

/// `a` stacks strictly below `b`; `below(a, b) == above(b, a)`
pub fn below<A: Accessor, B: Accessor>(a: A, b: B) -> Condition {
    above(b, a).named("below")
}

/// The load condition of page `P` holds
pub fn page_loaded<P: PageObject>() -> Condition {
    let name = format!("page_loaded({})", std::any::type_name::<P>());
    Condition::from_fn(name, |browser: Browser| async move {
        let page = P::from_browser(browser.clone());
        page.load_condition().check(&browser).await
    })
}

/// Current URL contains `value`
pub fn url_contains(value: impl Into<String>) -> Condition {
    let value: Arc<str> = Arc::from(value.into());
    Condition::from_fn(format!("url_contains({value})"), move |browser: Browser| {
        let value = Arc::clone(&value);
        async move { Ok(browser.current_url().await?.contains(&*value)) }
    })
}

/// Current URL does not contain `value`
pub fn url_not_contains(value: impl Into<String>) -> Condition {
    url_contains(value).negate()
}

/// Element has any of `names` set
pub fn has_attributes<A: Accessor>(accessor: A, names: &[&str]) -> Condition {
    let names = owned(names);
    Condition::from_fn("has_attributes", move |_| {
        let element = accessor.access();
        let names = Arc::clone(&names);
        async move { element.await?.as_ref().has_attribute(&borrowed(&names)).await }
    })
}

/// Element has any of `classes`
pub fn has_class<A: Accessor>(accessor: A, classes: &[&str]) -> Condition {
    let classes = owned(classes);
    Condition::from_fn("has_class", move |_| {
        let element = accessor.access();
        let classes = Arc::clone(&classes);
        async move { element.await?.as_ref().has_class(&borrowed(&classes)).await }
    })
}

/// Element's inline style contains any of `styles`
pub fn has_style<A: Accessor>(accessor: A, styles: &[&str]) -> Condition {
    let styles = owned(styles);
    Condition::from_fn("has_style", move |_| {
        let element = accessor.access();
        let styles = Arc::clone(&styles);
        async move { element.await?.as_ref().has_style(&borrowed(&styles)).await }
    })
}
