//! Staleness-aware element handles.
//!
//! A [`WebComponent`] remembers the selector it was located with, the
//! parent it was located under and the element reference currently known
//! for it. The reference goes stale silently when the DOM re-renders; the
//! next operation on it fails with [`WaitError::StaleReference`], and
//! operations that race with re-rendering (click, type, clear) re-resolve
//! the reference and retry.
//!
//! ```text
//! Fresh ──(DOM mutates)──► Stale ──refetch()──► Fresh
//!   │
//!   └──(node removed)──► NotFound
//! ```

use crate::browser::Browser;
use crate::driver::{AutomationDriver, ElementRef};
use crate::result::{WaitError, WaitResult};
use crate::retry::{retry, RetryPolicy};
use crate::selector::Selector;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Class some UI toolkits put on disabled inputs instead of the native flag
pub const DISABLED_CLASS_MARKER: &str = "sapMInputBaseDisabled";

const Z_INDEX_PATTERN: &str = r"z-index:\s*(-?\d+)";

fn z_index_pattern() -> WaitResult<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(Z_INDEX_PATTERN)
        .map_err(|e| WaitError::operation(format!("invalid z-index pattern: {e}")))?;
    Ok(PATTERN.get_or_init(|| re))
}

/// Parse the `z-index` out of an inline style; `auto`/absent stacks at 0
#[must_use]
pub fn parse_z_index(style: &str) -> Option<i64> {
    let re = z_index_pattern().ok()?;
    re.captures(style)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Result of probing a handle's current reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementState {
    /// Reference is attached
    Fresh(ElementRef),
    /// Reference is detached but the locator still matches; `refetch` recovers
    Stale,
    /// Nothing matches the locator (under the parent) any more
    NotFound,
}

impl ElementState {
    /// Whether the reference is usable as-is
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

/// Handle to a located element
#[derive(Clone)]
pub struct WebComponent {
    browser: Browser,
    selector: Selector,
    parent: Option<ElementRef>,
    element: Arc<Mutex<ElementRef>>,
}

impl fmt::Debug for WebComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebComponent")
            .field("selector", &self.selector)
            .field("element", &self.element_ref())
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl AsRef<Self> for WebComponent {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl WebComponent {
    /// Wrap an already located element
    #[must_use]
    pub fn new(
        browser: Browser,
        selector: Selector,
        element: ElementRef,
        parent: Option<ElementRef>,
    ) -> Self {
        Self {
            browser,
            selector,
            parent,
            element: Arc::new(Mutex::new(element)),
        }
    }

    /// Selector the element was located with
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Currently known reference
    #[must_use]
    pub fn element_ref(&self) -> ElementRef {
        self.element
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Parent the element was located under
    #[must_use]
    pub fn parent(&self) -> Option<&ElementRef> {
        self.parent.as_ref()
    }

    /// Session this handle belongs to
    #[must_use]
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    fn driver(&self) -> &dyn AutomationDriver {
        self.browser.driver().as_ref()
    }

    fn stale_retry(&self) -> RetryPolicy {
        RetryPolicy::on_stale().with_max_attempts(self.browser.config().retry_attempts)
    }

    fn not_found_retry(&self) -> RetryPolicy {
        RetryPolicy::on_not_found().with_max_attempts(self.browser.config().retry_attempts)
    }

    /// Cheap property read that fails when the reference is unusable
    async fn touch(&self) -> WaitResult<()> {
        self.driver().is_enabled(&self.element_ref()).await.map(|_| ())
    }

    /// Inspect the current reference without replacing it
    pub async fn resolve(&self) -> WaitResult<ElementState> {
        let element = self.element_ref();
        match self.driver().is_enabled(&element).await {
            Ok(_) => Ok(ElementState::Fresh(element)),
            Err(e) if e.is_stale() => {
                let matches = self
                    .driver()
                    .find_elements(&self.selector, self.parent.as_ref())
                    .await;
                match matches {
                    Ok(found) if !found.is_empty() => Ok(ElementState::Stale),
                    Ok(_) => Ok(ElementState::NotFound),
                    Err(e) if e.is_recoverable() => Ok(ElementState::NotFound),
                    Err(e) => Err(e),
                }
            }
            Err(e) if e.is_not_found() => Ok(ElementState::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Re-locate the element and replace the held reference.
    ///
    /// A replaced reference is released from the driver.
    pub async fn refetch(&self) -> WaitResult<()> {
        let found = self
            .driver()
            .find_element(&self.selector, self.parent.as_ref())
            .await?;
        tracing::trace!(selector = %self.selector, element = %found, "refetched element");
        let previous = std::mem::replace(
            &mut *self.element.lock().unwrap_or_else(PoisonError::into_inner),
            found.clone(),
        );
        if previous != found {
            self.driver().release(&previous).await;
        }
        Ok(())
    }

    async fn click_once(&self) -> WaitResult<()> {
        self.refetch().await?;
        let element = self.element_ref();
        let native = match self.driver().click(&element).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        tracing::debug!(selector = %self.selector, error = %native, "native click failed, trying script click");
        match self.driver().script_click(&element).await {
            Ok(()) => Ok(()),
            Err(fallback) => {
                tracing::debug!(selector = %self.selector, error = %fallback, "script click failed");
                Err(native)
            }
        }
    }

    /// Click the element.
    ///
    /// Each attempt re-locates the element, tries a native click and falls
    /// back to a script click on the same reference. If both fail the
    /// native error is returned; stale references are retried.
    pub async fn click(&self) -> WaitResult<()> {
        retry(&self.stale_retry(), || self.click_once()).await
    }

    /// Clear the element's value
    pub async fn clear(&self) -> WaitResult<()> {
        retry(&self.stale_retry(), || async move {
            self.refetch().await?;
            self.driver().clear(&self.element_ref()).await
        })
        .await
    }

    /// Replace the element's value with `text`.
    ///
    /// A failure to re-locate or clear before typing is logged and ignored;
    /// only the key send decides the outcome.
    pub async fn type_text(&self, text: &str) -> WaitResult<()> {
        retry(&self.stale_retry(), || async move {
            let cleared = match self.refetch().await {
                Ok(()) => self.driver().clear(&self.element_ref()).await,
                Err(e) => Err(e),
            };
            if let Err(e) = cleared {
                tracing::debug!(selector = %self.selector, error = %e, "could not clear before typing");
            }
            self.driver().send_keys(&self.element_ref(), text).await
        })
        .await
    }

    /// Visible text
    pub async fn text(&self) -> WaitResult<String> {
        self.driver().text(&self.element_ref()).await
    }

    /// Attribute value, `None` when absent
    pub async fn attribute(&self, name: &str) -> WaitResult<Option<String>> {
        self.driver().attribute(&self.element_ref(), name).await
    }

    /// Whether any of `names` is set to a non-empty value
    pub async fn has_attribute(&self, names: &[&str]) -> WaitResult<bool> {
        for name in names {
            if self.attribute(name).await?.is_some_and(|v| !v.is_empty()) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the class list contains any of `classes`
    pub async fn has_class(&self, classes: &[&str]) -> WaitResult<bool> {
        let class = self.attribute("class").await?.unwrap_or_default();
        Ok(class
            .split_whitespace()
            .any(|c| classes.iter().any(|wanted| c == *wanted)))
    }

    /// Whether the inline style contains any of `styles` (substring match)
    pub async fn has_style(&self, styles: &[&str]) -> WaitResult<bool> {
        let style = self.attribute("style").await?.unwrap_or_default();
        Ok(styles.iter().any(|s| style.contains(s)))
    }

    /// Stacking order from the inline style
    pub async fn z_index(&self) -> WaitResult<i64> {
        let style = self.attribute("style").await?.unwrap_or_default();
        Ok(parse_z_index(&style).unwrap_or(0))
    }

    /// Rendered and not hidden by inline style, with failures propagated
    pub(crate) async fn check_displayed(&self) -> WaitResult<bool> {
        Ok(self.driver().is_displayed(&self.element_ref()).await?
            && !self.has_style(&["visibility: hidden"]).await?
            && !self.has_style(&["display: none"]).await?)
    }

    /// Rendered and not hidden by inline style; any failure reads as `false`
    pub async fn is_displayed(&self) -> bool {
        match self.check_displayed().await {
            Ok(displayed) => displayed,
            Err(e) => {
                tracing::trace!(selector = %self.selector, error = %e, "treating as not displayed");
                false
            }
        }
    }

    /// Negation of [`is_displayed`](Self::is_displayed)
    pub async fn is_not_displayed(&self) -> bool {
        !self.is_displayed().await
    }

    /// Enabled by every notion the harness knows, with failures propagated
    pub(crate) async fn check_enabled(&self) -> WaitResult<bool> {
        Ok(self.driver().is_enabled(&self.element_ref()).await?
            && self.attribute("aria-disabled").await?.as_deref() != Some("true")
            && !self.has_class(&[DISABLED_CLASS_MARKER]).await?)
    }

    /// Natively enabled, not `aria-disabled`, and without the disabled class
    /// marker. On failure the reference is refreshed and `false` returned.
    pub async fn is_enabled(&self) -> bool {
        match self.check_enabled().await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::debug!(selector = %self.selector, error = %e, "enabled check failed, refetching");
                if let Err(e) = self.refetch().await {
                    tracing::trace!(selector = %self.selector, error = %e, "refetch failed");
                }
                false
            }
        }
    }

    /// Negation of [`is_enabled`](Self::is_enabled)
    pub async fn is_disabled(&self) -> bool {
        !self.is_enabled().await
    }

    /// Native selected state
    pub async fn is_selected(&self) -> WaitResult<bool> {
        self.driver().is_selected(&self.element_ref()).await
    }

    /// Whether the held reference has been detached
    pub async fn is_stale(&self) -> bool {
        matches!(self.touch().await, Err(e) if e.is_stale())
    }

    /// Negation of [`is_stale`](Self::is_stale)
    pub async fn is_not_stale(&self) -> bool {
        !self.is_stale().await
    }

    /// False only when probing raises not-found or stale
    pub async fn exists(&self) -> bool {
        match self.touch().await {
            Ok(()) => true,
            Err(e) => !e.is_recoverable(),
        }
    }

    /// First descendant matching `selector`
    pub async fn child(&self, selector: impl Into<Selector>) -> WaitResult<Self> {
        let selector = selector.into();
        let parent = self.element_ref();
        let found = retry(&self.not_found_retry(), || {
            self.driver().find_element(&selector, Some(&parent))
        })
        .await?;
        Ok(Self::new(self.browser.clone(), selector, found, Some(parent)))
    }

    /// All descendants matching `selector`
    pub async fn children(&self, selector: impl Into<Selector>) -> WaitResult<Vec<Self>> {
        let selector = selector.into();
        let parent = self.element_ref();
        let found = retry(&self.not_found_retry(), || {
            self.driver().find_elements(&selector, Some(&parent))
        })
        .await?;
        Ok(found
            .into_iter()
            .map(|element| {
                Self::new(
                    self.browser.clone(),
                    selector.clone(),
                    element,
                    Some(parent.clone()),
                )
            })
            .collect())
    }

    /// Whether any descendant matches `selector`
    pub async fn has_child(&self, selector: impl Into<Selector>) -> WaitResult<bool> {
        Ok(!self.children(selector).await?.is_empty())
    }

    /// Whether the element has any descendant at all
    pub async fn has_children(&self) -> WaitResult<bool> {
        self.has_child("*").await
    }
}

// =============================================================================
// TYPED COMPONENTS
// =============================================================================

/// A typed view over a [`WebComponent`]
#[async_trait]
pub trait Component: AsRef<WebComponent> + From<WebComponent> + Send + Sync + 'static {
    /// Whether the component refuses interaction
    async fn is_disabled(&self) -> bool {
        self.as_ref().is_disabled().await
    }
}

impl Component for WebComponent {}

/// Button whose disabled state is the `disabled` attribute
#[derive(Debug, Clone)]
pub struct Button(WebComponent);

impl From<WebComponent> for Button {
    fn from(component: WebComponent) -> Self {
        Self(component)
    }
}

impl AsRef<WebComponent> for Button {
    fn as_ref(&self) -> &WebComponent {
        &self.0
    }
}

impl Deref for Button {
    type Target = WebComponent;

    fn deref(&self) -> &WebComponent {
        &self.0
    }
}

#[async_trait]
impl Component for Button {
    async fn is_disabled(&self) -> bool {
        match self.0.attribute("disabled").await {
            Ok(Some(value)) => value != "false",
            Ok(None) => false,
            Err(e) => {
                tracing::trace!(selector = %self.0.selector(), error = %e, "treating button as enabled");
                false
            }
        }
    }
}

/// Text input
#[derive(Debug, Clone)]
pub struct TextInput(WebComponent);

impl From<WebComponent> for TextInput {
    fn from(component: WebComponent) -> Self {
        Self(component)
    }
}

impl AsRef<WebComponent> for TextInput {
    fn as_ref(&self) -> &WebComponent {
        &self.0
    }
}

impl Deref for TextInput {
    type Target = WebComponent;

    fn deref(&self) -> &WebComponent {
        &self.0
    }
}

impl Component for TextInput {}

impl TextInput {
    async fn holds(&self, value: &str) -> WaitResult<bool> {
        if self.0.text().await? == value {
            return Ok(true);
        }
        Ok(self.0.attribute("value").await?.as_deref() == Some(value))
    }

    /// Fill the input with `value`.
    ///
    /// Returns `false` without touching the input when its text or value
    /// already equals `value`.
    pub async fn fill(&self, value: &str) -> WaitResult<bool> {
        if self.holds(value).await? {
            return Ok(false);
        }
        self.0.click().await?;
        self.0.type_text(value).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockFailure, MockNode};

    fn session() -> (MockDriver, Browser) {
        let driver = MockDriver::new();
        (driver.clone(), Browser::new(driver))
    }

    async fn locate(browser: &Browser, selector: &str) -> WebComponent {
        browser.find_element(selector).await.unwrap()
    }

    mod z_index_tests {
        use super::*;

        #[test]
        fn test_parse_z_index() {
            assert_eq!(parse_z_index("position: absolute; z-index: 12;"), Some(12));
            assert_eq!(parse_z_index("z-index:-1"), Some(-1));
            assert_eq!(parse_z_index("z-index: auto;"), None);
            assert_eq!(parse_z_index(""), None);
        }

        #[tokio::test]
        async fn test_z_index_defaults_to_zero() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("div.dialog"));
            assert_eq!(locate(&browser, "div.dialog").await.z_index().await.unwrap(), 0);
        }
    }

    mod staleness_tests {
        use super::*;

        #[tokio::test]
        async fn test_state_machine() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("#save"));
            let save = locate(&browser, "#save").await;
            assert_eq!(save.resolve().await.unwrap(), ElementState::Fresh(node.clone()));

            let new = driver.rerender(&node).unwrap();
            assert_eq!(save.resolve().await.unwrap(), ElementState::Stale);
            assert!(save.is_stale().await);

            save.refetch().await.unwrap();
            assert_eq!(save.element_ref(), new);
            assert!(save.resolve().await.unwrap().is_fresh());

            driver.detach(&new);
            assert_eq!(save.resolve().await.unwrap(), ElementState::NotFound);
            assert!(!save.exists().await);
        }

        #[tokio::test]
        async fn test_clones_share_the_refetched_reference() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("#save"));
            let save = locate(&browser, "#save").await;
            let copy = save.clone();
            let new = driver.rerender(&node).unwrap();
            save.refetch().await.unwrap();
            assert_eq!(copy.element_ref(), new);
        }

        #[tokio::test]
        async fn test_refetch_releases_replaced_reference() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("#save"));
            let save = locate(&browser, "#save").await;

            save.refetch().await.unwrap();
            assert!(!driver.was_called("release:"));

            let _ = driver.rerender(&node).unwrap();
            save.refetch().await.unwrap();
            assert_eq!(driver.history().last().unwrap(), &format!("release:{node}"));
            assert_eq!(driver.call_count("release:"), 1);
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_refetches_after_rerender() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("button.ok"));
            let ok = locate(&browser, "button.ok").await;
            let new = driver.rerender(&node).unwrap();

            ok.click().await.unwrap();
            assert!(driver.was_called(&format!("click:{new}")));
        }

        #[tokio::test]
        async fn test_click_retries_on_stale() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("button.ok"));
            driver.queue_click_failure(MockFailure::Stale);
            driver.queue_script_click_failure(MockFailure::Stale);

            locate(&browser, "button.ok").await.click().await.unwrap();
            assert_eq!(driver.call_count("click:"), 2);
        }

        #[tokio::test]
        async fn test_click_falls_back_to_script_click() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("button.ok"));
            driver.queue_click_failure(MockFailure::Operation("obstructed".into()));

            locate(&browser, "button.ok").await.click().await.unwrap();
            assert_eq!(driver.call_count("click:"), 1);
            assert_eq!(driver.call_count("script_click:"), 1);
        }

        #[tokio::test]
        async fn test_click_reraises_native_error() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("button.ok"));
            driver.queue_click_failure(MockFailure::Operation("obstructed".into()));
            driver.queue_script_click_failure(MockFailure::Operation("script blocked".into()));

            let err = locate(&browser, "button.ok").await.click().await.unwrap_err();
            assert!(matches!(err, WaitError::Operation { ref message } if message == "obstructed"));
        }

        #[tokio::test]
        async fn test_click_removed_element_is_not_found() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("button.ok"));
            let ok = locate(&browser, "button.ok").await;
            driver.detach(&node);
            assert!(ok.click().await.unwrap_err().is_not_found());
        }
    }

    mod typing_tests {
        use super::*;

        #[tokio::test]
        async fn test_type_text_replaces_value() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("input").with_attribute("value", "old"));
            locate(&browser, "input").await.type_text("new").await.unwrap();
            assert_eq!(driver.value_of(&node), Some("new".to_string()));
        }

        #[tokio::test]
        async fn test_type_text_retries_stale_send() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("input"));
            driver.queue_send_keys_failure(MockFailure::Stale);
            locate(&browser, "input").await.type_text("abc").await.unwrap();
            assert_eq!(driver.value_of(&node), Some("abc".to_string()));
            assert_eq!(driver.call_count("send_keys:"), 2);
        }

        #[tokio::test]
        async fn test_fill_skips_matching_value() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("input#user").with_attribute("value", "admin"));
            let input: TextInput = browser.find_element_as("input#user").await.unwrap();

            assert!(!input.fill("admin").await.unwrap());
            assert!(!driver.was_called("click:"));

            assert!(input.fill("guest").await.unwrap());
            assert!(driver.was_called("click:"));
            assert_eq!(input.attribute("value").await.unwrap(), Some("guest".into()));
        }
    }

    mod predicate_tests {
        use super::*;

        #[tokio::test]
        async fn test_is_displayed_respects_inline_style() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("div.panel"));
            let panel = locate(&browser, "div.panel").await;
            assert!(panel.is_displayed().await);

            driver.set_attribute(&node, "style", "visibility: hidden;");
            assert!(!panel.is_displayed().await);

            driver.set_attribute(&node, "style", "display: none;");
            assert!(panel.is_not_displayed().await);

            driver.detach(&node);
            assert!(!panel.is_displayed().await);
        }

        #[tokio::test]
        async fn test_is_enabled_markers() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("input"));
            let input = locate(&browser, "input").await;
            assert!(input.is_enabled().await);

            driver.set_attribute(&node, "aria-disabled", "true");
            assert!(input.is_disabled().await);

            driver.set_attribute(&node, "aria-disabled", "false");
            driver.set_attribute(&node, "class", "sapMInputBase sapMInputBaseDisabled");
            assert!(!input.is_enabled().await);
        }

        #[tokio::test]
        async fn test_is_enabled_refetches_on_failure() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("input"));
            let input = locate(&browser, "input").await;
            let new = driver.rerender(&node).unwrap();

            assert!(!input.is_enabled().await);
            assert_eq!(input.element_ref(), new);
            assert!(input.is_enabled().await);
        }

        #[tokio::test]
        async fn test_checked_state_propagates_driver_errors() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("#dialog"));
            let dialog = locate(&browser, "#dialog").await;
            driver.set_display_failure(Some(MockFailure::Operation("script error".into())));

            assert!(matches!(
                dialog.check_displayed().await.unwrap_err(),
                WaitError::Operation { .. }
            ));
            assert!(!dialog.is_displayed().await);
            assert!(dialog.check_enabled().await.unwrap());

            driver.set_display_failure(None);
            assert!(dialog.check_displayed().await.unwrap());
        }

        #[tokio::test]
        async fn test_any_of_matchers() {
            let (driver, browser) = session();
            let _ = driver.add_node(
                MockNode::new("div.row")
                    .with_attribute("class", "row selected")
                    .with_attribute("style", "color: red; z-index: 3;")
                    .with_attribute("data-id", "7"),
            );
            let row = locate(&browser, "div.row").await;
            assert!(row.has_class(&["missing", "selected"]).await.unwrap());
            assert!(!row.has_class(&["select"]).await.unwrap());
            assert!(row.has_style(&["color: red"]).await.unwrap());
            assert!(row.has_attribute(&["title", "data-id"]).await.unwrap());
            assert!(!row.has_attribute(&["title"]).await.unwrap());
            assert_eq!(row.z_index().await.unwrap(), 3);
        }

        #[tokio::test]
        async fn test_button_disabled_attribute() {
            let (driver, browser) = session();
            let node = driver.add_node(MockNode::new("button"));
            let button: Button = browser.find_element_as("button").await.unwrap();
            assert!(!Component::is_disabled(&button).await);
            driver.set_attribute(&node, "disabled", "disabled");
            assert!(Component::is_disabled(&button).await);
        }
    }

    mod children_tests {
        use super::*;

        #[tokio::test]
        async fn test_child_lookup_is_scoped() {
            let (driver, browser) = session();
            let list = driver.add_node(MockNode::new("ul"));
            let item = driver.add_node(MockNode::new("li").also_matching("*").under(&list));
            let _ = driver.add_node(MockNode::new("li"));

            let ul = locate(&browser, "ul").await;
            let li = ul.child("li").await.unwrap();
            assert_eq!(li.element_ref(), item);
            assert_eq!(li.parent(), Some(&list));
            assert_eq!(ul.children("li").await.unwrap().len(), 1);
            assert!(ul.has_child("li").await.unwrap());
            assert!(ul.has_children().await.unwrap());
            assert!(!li.has_children().await.unwrap());
        }

        #[tokio::test]
        async fn test_missing_child_is_not_found_after_retries() {
            let (driver, browser) = session();
            let _ = driver.add_node(MockNode::new("ul"));
            let ul = locate(&browser, "ul").await;
            assert!(ul.child("li").await.unwrap_err().is_not_found());
            // initial attempt plus the default retry budget
            assert_eq!(driver.call_count("find:li"), 6);
        }
    }
}
