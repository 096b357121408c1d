//! Browser session.
//!
//! [`Browser`] ties a driver to the session-wide validator registry and
//! configuration, and is the entry point for everything a page object
//! does: element lookup, waits and navigation. It is cheap to clone; clones
//! share the driver and the validators.

use crate::condition::{self, Accessor, Condition};
use crate::config::HarnessConfig;
use crate::driver::{AutomationDriver, PollStats};
use crate::element::{Component, WebComponent};
use crate::middleware::{logged, settled};
use crate::page::PageObject;
use crate::result::WaitResult;
use crate::selector::Selector;
use crate::validator::{predicate_validator, FnValidator, Validator, ValidatorRegistry};
use crate::wait::{self, CallStack, WaitOptions};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Session handle
#[derive(Clone)]
pub struct Browser {
    driver: Arc<dyn AutomationDriver>,
    validators: ValidatorRegistry,
    config: HarnessConfig,
}

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Browser")
            .field("validators", &self.validators)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Browser {
    /// Create a session over `driver` with default configuration
    #[must_use]
    pub fn new(driver: impl AutomationDriver + 'static) -> Self {
        Self::from_shared(Arc::new(driver))
    }

    /// Create a session over an already shared driver
    #[must_use]
    pub fn from_shared(driver: Arc<dyn AutomationDriver>) -> Self {
        Self {
            driver,
            validators: ValidatorRegistry::new(),
            config: HarnessConfig::default(),
        }
    }

    /// Replace the wait options
    #[must_use]
    pub const fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.config.wait = options;
        self
    }

    /// Replace the whole configuration
    #[must_use]
    pub const fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Session configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Wait options used by every wait on this session
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.config.wait
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    // =========================================================================
    // VALIDATORS
    // =========================================================================

    /// Validators run on every poll attempt
    #[must_use]
    pub const fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    /// Register a validator for the rest of the session
    pub fn register_validator(&self, validator: impl Validator + 'static) {
        self.validators.register(validator);
    }

    /// Register a plain check function as a validator
    pub fn register_check<F>(&self, name: impl Into<String>, check: F)
    where
        F: Fn(&Browser, &CallStack) -> WaitResult<()> + Send + Sync + 'static,
    {
        self.validators.register(FnValidator::new(name, check));
    }

    /// Register a plain predicate as a validator; `false` fails the wait
    /// with a validation error naming `name`
    pub fn register_predicate<P>(&self, name: impl Into<String>, predicate: P)
    where
        P: Fn(&Browser) -> bool + Send + Sync + 'static,
    {
        self.validators.register(predicate_validator(name.into(), predicate));
    }

    // =========================================================================
    // WAITS
    // =========================================================================

    /// Wait until any condition is ready, with the session's wait options
    pub async fn wait_for_any(&self, conditions: Vec<Condition>) -> WaitResult<()> {
        self.wait_for_stats(conditions).await.map(|_| ())
    }

    /// Wait until `condition` is ready
    pub async fn wait_for(&self, condition: Condition) -> WaitResult<()> {
        self.wait_for_any(vec![condition]).await
    }

    /// [`wait_for_any`](Self::wait_for_any), reporting attempts and elapsed time
    pub async fn wait_for_stats(&self, conditions: Vec<Condition>) -> WaitResult<PollStats> {
        self.wait_for_any_within(conditions, self.config.wait).await
    }

    /// Wait until any condition is ready, with explicit options
    pub async fn wait_for_any_within(
        &self,
        conditions: Vec<Condition>,
        options: WaitOptions,
    ) -> WaitResult<PollStats> {
        let stack = CallStack::capture("wait_for_any");
        wait::wait_for_any(self, conditions, options, stack).await
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Navigate, then settle for the configured load time
    pub async fn navigate(&self, url: &str) -> WaitResult<()> {
        logged(
            "Browser",
            "navigate",
            settled(self.config.load_time(), self.driver.navigate(url)),
        )
        .await
    }

    /// Current URL
    pub async fn current_url(&self) -> WaitResult<String> {
        self.driver.current_url().await
    }

    /// Reload, then settle for the configured load time
    pub async fn refresh(&self) -> WaitResult<()> {
        logged(
            "Browser",
            "refresh",
            settled(self.config.load_time(), self.driver.refresh()),
        )
        .await
    }

    /// Type into whatever has focus
    pub async fn type_to_focused(&self, text: &str) -> WaitResult<()> {
        self.driver.type_to_focused(text).await
    }

    /// Wait until the URL contains `value`
    pub async fn wait_for_url_to_contain(&self, value: &str) -> WaitResult<()> {
        self.wait_for(condition::url_contains(value)).await
    }

    /// Wait until the URL no longer contains `value`
    pub async fn wait_for_url_to_not_contain(&self, value: &str) -> WaitResult<()> {
        self.wait_for(condition::url_not_contains(value)).await
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Locate one element
    pub async fn find_element(&self, selector: impl Into<Selector>) -> WaitResult<WebComponent> {
        let selector = selector.into();
        let element = self.driver.find_element(&selector, None).await?;
        Ok(WebComponent::new(self.clone(), selector, element, None))
    }

    /// Locate one element as a typed component
    pub async fn find_element_as<T: Component>(
        &self,
        selector: impl Into<Selector>,
    ) -> WaitResult<T> {
        self.find_element(selector).await.map(T::from)
    }

    /// Locate every matching element
    pub async fn find_elements(
        &self,
        selector: impl Into<Selector>,
    ) -> WaitResult<Vec<WebComponent>> {
        let selector = selector.into();
        let elements = self.driver.find_elements(&selector, None).await?;
        Ok(elements
            .into_iter()
            .map(|element| WebComponent::new(self.clone(), selector.clone(), element, None))
            .collect())
    }

    /// Whether anything matches `selector`
    pub async fn exists(&self, selector: impl Into<Selector>) -> WaitResult<bool> {
        let selector = selector.into();
        Ok(!self.driver.find_elements(&selector, None).await?.is_empty())
    }

    /// First displayed element among `selectors`; lookup failures are skipped
    pub async fn find_any<S: AsRef<str>>(&self, selectors: &[S]) -> Option<WebComponent> {
        for selector in selectors {
            match self.find_element(selector.as_ref()).await {
                Ok(component) if component.is_displayed().await => return Some(component),
                Ok(_) => {}
                Err(e) => tracing::trace!(selector = selector.as_ref(), error = %e, "skipping"),
            }
        }
        None
    }

    /// Accessor that locates `selector` each time it is called
    #[must_use]
    pub fn locator(&self, selector: impl Into<Selector>) -> ElementLocator {
        ElementLocator::new(self.clone(), selector.into())
    }

    /// Typed accessor that locates `selector` each time it is called
    #[must_use]
    pub fn locator_as<T: Component>(&self, selector: impl Into<Selector>) -> ElementLocator<T> {
        ElementLocator::new(self.clone(), selector.into())
    }

    // =========================================================================
    // PAGE WAITS
    // =========================================================================

    /// Wait for page `P` to load and return it
    pub async fn wait_until_page_has_loaded<P: PageObject>(&self) -> WaitResult<P> {
        self.wait_for(condition::page_loaded::<P>()).await?;
        Ok(P::from_browser(self.clone()))
    }

    /// Wait until any of several pages has loaded.
    ///
    /// Build the list with [`condition::page_loaded`], one per page type.
    pub async fn wait_until_any_page_has_loaded(
        &self,
        pages: impl IntoIterator<Item = Condition>,
    ) -> WaitResult<()> {
        self.wait_for_any(pages.into_iter().collect()).await
    }

    // =========================================================================
    // ELEMENT WAITS
    // =========================================================================

    /// Wait until the accessed element is visible
    pub async fn wait_until_element_is_visible<A: Accessor>(&self, accessor: A) -> WaitResult<()> {
        self.wait_for(condition::visible(accessor)).await
    }

    /// Wait until the accessed element is hidden or gone
    pub async fn wait_until_element_is_not_visible<A: Accessor>(
        &self,
        accessor: A,
    ) -> WaitResult<()> {
        self.wait_for(condition::not_visible(accessor)).await
    }

    /// Wait until the accessed element is clickable, then access it again
    pub async fn wait_until_clickable<A: Accessor>(&self, accessor: A) -> WaitResult<A::Component> {
        let accessor = Arc::new(accessor);
        let shared = Arc::clone(&accessor);
        let polled = move || -> BoxFuture<'static, WaitResult<A::Component>> { shared.access() };
        self.wait_for(condition::clickable(polled)).await?;
        accessor.access().await
    }

    /// Wait until the accessed element no longer exists
    pub async fn wait_until_stale<A: Accessor>(&self, accessor: A) -> WaitResult<()> {
        self.wait_for(condition::does_not_exist(accessor)).await
    }

    /// Wait for `selector` (optionally under `parent`) to disappear, if present
    pub async fn wait_until_element_disappears(
        &self,
        selector: &str,
        parent: Option<&str>,
    ) -> WaitResult<()> {
        let selector = scoped(selector, parent)?;
        if self.exists(selector.clone()).await? {
            self.wait_until_element_is_not_visible(self.locator(selector))
                .await?;
        }
        Ok(())
    }

    /// Wait for `selector` (optionally under `parent`) to appear, then disappear
    pub async fn wait_until_appearance_and_disappearance_of_element(
        &self,
        selector: &str,
        parent: Option<&str>,
    ) -> WaitResult<()> {
        let selector = scoped(selector, parent)?;
        self.wait_until_element_is_visible(self.locator(selector.clone()))
            .await?;
        self.wait_until_element_disappears(selector.as_str(), None)
            .await
    }

    /// Wait until `lower` stacks at or above `higher`
    pub async fn wait_for_element_to_be_on_top(&self, lower: &str, higher: &str) -> WaitResult<()> {
        let lower = Selector::parse(lower);
        let higher = Selector::parse(higher);
        let name = format!("on_top({lower}, {higher})");
        self.wait_for(Condition::from_fn(name, move |browser: Browser| {
            let (lower, higher) = (lower.clone(), higher.clone());
            async move {
                let z_lower = browser.find_element(lower).await?.z_index().await?;
                let z_higher = browser.find_element(higher).await?.z_index().await?;
                Ok(z_lower >= z_higher)
            }
        }))
        .await
    }

    /// Wait until the element has any of `names`
    pub async fn wait_for_element_to_have_attributes(
        &self,
        selector: &str,
        names: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_attributes(self.locator(selector), names))
            .await
    }

    /// Wait until the element has none of `names`
    pub async fn wait_for_element_to_not_have_attributes(
        &self,
        selector: &str,
        names: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_attributes(self.locator(selector), names).negate())
            .await
    }

    /// Wait until the element has any of `classes`
    pub async fn wait_for_element_to_have_class(
        &self,
        selector: &str,
        classes: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_class(self.locator(selector), classes))
            .await
    }

    /// Wait until the element has none of `classes`
    pub async fn wait_for_element_to_not_have_class(
        &self,
        selector: &str,
        classes: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_class(self.locator(selector), classes).negate())
            .await
    }

    /// Wait until the element's style contains any of `styles`
    pub async fn wait_for_element_to_have_style(
        &self,
        selector: &str,
        styles: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_style(self.locator(selector), styles))
            .await
    }

    /// Wait until the element's style contains none of `styles`
    pub async fn wait_for_element_to_not_have_style(
        &self,
        selector: &str,
        styles: &[&str],
    ) -> WaitResult<()> {
        self.wait_for(condition::has_style(self.locator(selector), styles).negate())
            .await
    }

    /// Wait until `selector` is visible and return the first match
    pub async fn wait_for_element_to_appear(
        &self,
        selector: impl Into<Selector>,
    ) -> WaitResult<WebComponent> {
        let selector = selector.into();
        self.wait_until_element_is_visible(self.locator(selector.clone()))
            .await?;
        self.find_element(selector).await
    }

    /// Wait until `selector` is visible and return every match
    pub async fn wait_for_elements(
        &self,
        selector: impl Into<Selector>,
    ) -> WaitResult<Vec<WebComponent>> {
        let selector = selector.into();
        self.wait_until_element_is_visible(self.locator(selector.clone()))
            .await?;
        self.find_elements(selector).await
    }

    /// Wait until any of `selectors` is visible and return the first displayed
    pub async fn wait_for_any_element_to_be_visible<S: AsRef<str>>(
        &self,
        selectors: &[S],
    ) -> WaitResult<Option<WebComponent>> {
        let conditions = selectors
            .iter()
            .map(|s| condition::visible(self.locator(s.as_ref())))
            .collect();
        self.wait_for_any(conditions).await?;
        Ok(self.find_any(selectors).await)
    }

    /// Wait for an element whose own text equals `text`
    pub async fn wait_for_element_with_text(&self, text: &str) -> WaitResult<WebComponent> {
        self.wait_for_element_to_appear(Selector::with_text(text))
            .await
    }
}

fn scoped(selector: &str, parent: Option<&str>) -> WaitResult<Selector> {
    let selector = Selector::parse(selector);
    match parent {
        Some(parent) => selector.within(&Selector::parse(parent)),
        None => Ok(selector),
    }
}

/// Accessor locating a selector on every call
pub struct ElementLocator<T = WebComponent> {
    browser: Browser,
    selector: Selector,
    component: PhantomData<fn() -> T>,
}

impl<T> ElementLocator<T> {
    fn new(browser: Browser, selector: Selector) -> Self {
        Self {
            browser,
            selector,
            component: PhantomData,
        }
    }

    /// Selector located on each call
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }
}

impl<T> Clone for ElementLocator<T> {
    fn clone(&self) -> Self {
        Self::new(self.browser.clone(), self.selector.clone())
    }
}

impl<T> fmt::Debug for ElementLocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementLocator")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl<T: Component> Accessor for ElementLocator<T> {
    type Component = T;

    fn access(&self) -> BoxFuture<'static, WaitResult<T>> {
        let browser = self.browser.clone();
        let selector = self.selector.clone();
        async move { browser.find_element_as::<T>(selector).await }.boxed()
    }
}
