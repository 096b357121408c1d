//! AutomationDriver - Abstract Browser Automation Trait
//!
//! The wait engine never talks to a browser directly. Everything it needs
//! from the automation client (element lookup, element operations and the
//! poll-until primitive) goes through [`AutomationDriver`], so the engine can
//! run against chromium (`ChromiumDriver`, feature `browser`) or the
//! in-memory [`MockDriver`] used by the unit tests.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  AutomationDriver (Abstract Trait)                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────┐       │
//! │  │  ChromiumDriver     │        │  MockDriver         │       │
//! │  │  (feature browser)  │        │  (Unit Tests)       │       │
//! │  │  CDP via            │        │  In-memory DOM with │       │
//! │  │  chromiumoxide      │        │  stale/removed nodes│       │
//! │  └─────────────────────┘        └─────────────────────┘       │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use crate::result::{WaitError, WaitResult};
use crate::selector::Selector;
use crate::wait::WaitOptions;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Opaque reference to a located element, assigned by the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    /// Wrap a driver-specific element id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The driver-specific element id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statistics of a satisfied poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    /// Number of predicate invocations, including the successful one
    pub attempts: usize,
    /// Time from the first attempt until success
    pub elapsed: Duration,
}

/// Predicate polled by [`AutomationDriver::poll_until`].
///
/// `Ok(true)` stops polling, `Ok(false)` means "not yet", and an error
/// aborts the poll immediately.
pub type PollPredicate<'a> = dyn FnMut() -> BoxFuture<'static, WaitResult<bool>> + Send + 'a;

/// Poll `predicate` every `poll_interval` until it is true or `timeout` elapses.
///
/// A timeout is reported only once at least the full budget has elapsed;
/// the final sleep is clipped to the remaining budget so one more attempt
/// runs right at the deadline.
pub async fn poll_with_interval(
    predicate: &mut PollPredicate<'_>,
    options: &WaitOptions,
) -> WaitResult<PollStats> {
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if predicate().await? {
            return Ok(PollStats {
                attempts,
                elapsed: start.elapsed(),
            });
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(WaitError::Timeout {
                ms: options.timeout_ms,
            });
        }

        tracing::trace!(attempt = attempts, "poll attempt not satisfied");
        tokio::time::sleep(options.poll_interval().min(timeout - elapsed)).await;
    }
}

/// Abstract driver trait for browser automation
///
/// Errors must be classified: a lookup that matches nothing raises
/// [`WaitError::NotFound`], and any operation on a reference whose node has
/// been detached raises [`WaitError::StaleReference`]. Everything else is
/// [`WaitError::Operation`].
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Find all elements matching `selector`, optionally under `scope`
    async fn find_elements(
        &self,
        selector: &Selector,
        scope: Option<&ElementRef>,
    ) -> WaitResult<Vec<ElementRef>>;

    /// Find exactly one element; NotFound when nothing matches
    async fn find_element(
        &self,
        selector: &Selector,
        scope: Option<&ElementRef>,
    ) -> WaitResult<ElementRef> {
        self.find_elements(selector, scope)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WaitError::not_found(selector.as_str()))
    }

    /// Native click
    async fn click(&self, element: &ElementRef) -> WaitResult<()>;

    /// Click dispatched from page script (`arguments[0].click()`)
    async fn script_click(&self, element: &ElementRef) -> WaitResult<()>;

    /// Clear an input
    async fn clear(&self, element: &ElementRef) -> WaitResult<()>;

    /// Send keys to an element
    async fn send_keys(&self, element: &ElementRef, text: &str) -> WaitResult<()>;

    /// Read an attribute (`None` if absent)
    async fn attribute(&self, element: &ElementRef, name: &str) -> WaitResult<Option<String>>;

    /// Native rendered check
    async fn is_displayed(&self, element: &ElementRef) -> WaitResult<bool>;

    /// Native enabled check
    async fn is_enabled(&self, element: &ElementRef) -> WaitResult<bool>;

    /// Native selected check
    async fn is_selected(&self, element: &ElementRef) -> WaitResult<bool>;

    /// Visible text
    async fn text(&self, element: &ElementRef) -> WaitResult<String>;

    /// Navigate the session
    async fn navigate(&self, url: &str) -> WaitResult<()>;

    /// Current URL
    async fn current_url(&self) -> WaitResult<String>;

    /// Reload the page
    async fn refresh(&self) -> WaitResult<()>;

    /// Type into whatever currently has focus
    async fn type_to_focused(&self, text: &str) -> WaitResult<()>;

    /// Forget a reference the caller has replaced; drivers holding
    /// per-element resources free them here
    async fn release(&self, _element: &ElementRef) {}

    /// Poll until predicate true or timeout
    async fn poll_until(
        &self,
        predicate: &mut PollPredicate<'_>,
        options: &WaitOptions,
    ) -> WaitResult<PollStats> {
        poll_with_interval(predicate, options).await
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Node in the mock DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockNode {
    /// Raw selector strings this node answers to
    pub selectors: Vec<String>,
    /// Parent node, for scoped lookups
    pub parent: Option<ElementRef>,
    /// Attributes
    pub attributes: HashMap<String, String>,
    /// Visible text
    pub text: String,
    /// Native displayed state
    pub displayed: bool,
    /// Native enabled state
    pub enabled: bool,
    /// Native selected state
    pub selected: bool,
    attached: bool,
}

impl MockNode {
    /// A displayed, enabled node answering to `selector`
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selectors: vec![selector.into()],
            parent: None,
            attributes: HashMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            attached: true,
        }
    }

    /// Also answer to `selector`
    #[must_use]
    pub fn also_matching(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    /// Nest under `parent`
    #[must_use]
    pub fn under(mut self, parent: &ElementRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the visible text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the native displayed state
    #[must_use]
    pub const fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set the native enabled state
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        self.selectors.iter().any(|s| s == selector.as_str())
    }
}

/// Failure injected into the next mock operation of a given type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Raise a stale reference failure
    Stale,
    /// Raise a generic operation failure with this message
    Operation(String),
}

impl MockFailure {
    fn into_error(self) -> WaitError {
        match self {
            Self::Stale => WaitError::stale("injected stale reference"),
            Self::Operation(message) => WaitError::operation(message),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    nodes: HashMap<ElementRef, MockNode>,
    order: Vec<ElementRef>,
    current_url: String,
    typed: Vec<String>,
    call_history: Vec<String>,
    click_failures: VecDeque<MockFailure>,
    script_click_failures: VecDeque<MockFailure>,
    send_keys_failures: VecDeque<MockFailure>,
    lookup_failures: VecDeque<MockFailure>,
    display_failure: Option<MockFailure>,
}

impl MockState {
    fn node(&self, element: &ElementRef) -> WaitResult<&MockNode> {
        match self.nodes.get(element) {
            Some(node) if node.attached => Ok(node),
            _ => Err(WaitError::stale(format!("element {element} is detached"))),
        }
    }

    fn node_mut(&mut self, element: &ElementRef) -> WaitResult<&mut MockNode> {
        match self.nodes.get_mut(element) {
            Some(node) if node.attached => Ok(node),
            _ => Err(WaitError::stale(format!("element {element} is detached"))),
        }
    }

    fn record(&mut self, call: String) {
        self.call_history.push(call);
    }
}

/// Mock driver for unit testing
///
/// Clones share the same DOM, so a test can keep one handle to mutate the
/// page while a [`Browser`](crate::browser::Browser) polls through another.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a node and return its reference
    pub fn add_node(&self, node: MockNode) -> ElementRef {
        let element = ElementRef::new(uuid::Uuid::new_v4().to_string());
        let mut state = self.state();
        let _ = state.nodes.insert(element.clone(), node);
        state.order.push(element.clone());
        element
    }

    /// Detach a node: its reference goes stale
    pub fn detach(&self, element: &ElementRef) {
        if let Some(node) = self.state().nodes.get_mut(element) {
            node.attached = false;
        }
    }

    /// Re-render a node: the old reference goes stale and an identical
    /// node is attached in its place
    pub fn rerender(&self, element: &ElementRef) -> Option<ElementRef> {
        let node = {
            let mut state = self.state();
            let node = state.nodes.get_mut(element)?;
            node.attached = false;
            let mut copy = node.clone();
            copy.attached = true;
            copy
        };
        Some(self.add_node(node))
    }

    /// Detach every node matching `selector`
    pub fn remove_matching(&self, selector: &str) {
        let selector = Selector::parse(selector);
        for node in self.state().nodes.values_mut() {
            if node.matches(&selector) {
                node.attached = false;
            }
        }
    }

    /// Mutate an attached node in place
    pub fn update(&self, element: &ElementRef, f: impl FnOnce(&mut MockNode)) {
        if let Some(node) = self.state().nodes.get_mut(element) {
            f(node);
        }
    }

    /// Set (or overwrite) an attribute on a node
    pub fn set_attribute(&self, element: &ElementRef, name: &str, value: &str) {
        self.update(element, |node| {
            let _ = node.attributes.insert(name.to_string(), value.to_string());
        });
    }

    /// Set the native displayed state of a node
    pub fn set_displayed(&self, element: &ElementRef, displayed: bool) {
        self.update(element, |node| node.displayed = displayed);
    }

    /// Inject a failure into the next native click
    pub fn queue_click_failure(&self, failure: MockFailure) {
        self.state().click_failures.push_back(failure);
    }

    /// Inject a failure into the next script click
    pub fn queue_script_click_failure(&self, failure: MockFailure) {
        self.state().script_click_failures.push_back(failure);
    }

    /// Inject a failure into the next `send_keys`
    pub fn queue_send_keys_failure(&self, failure: MockFailure) {
        self.state().send_keys_failures.push_back(failure);
    }

    /// Inject a failure into the next element lookup
    pub fn queue_lookup_failure(&self, failure: MockFailure) {
        self.state().lookup_failures.push_back(failure);
    }

    /// Make every display check fail with `failure` until cleared with `None`
    pub fn set_display_failure(&self, failure: Option<MockFailure>) {
        self.state().display_failure = failure;
    }

    /// Set the current URL without recording a navigation
    pub fn set_url(&self, url: &str) {
        self.state().current_url = url.to_string();
    }

    /// Text typed into the focused element, in order
    #[must_use]
    pub fn typed(&self) -> Vec<String> {
        self.state().typed.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Count calls whose history entry starts with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .call_history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Value last sent to an element with `send_keys`
    #[must_use]
    pub fn value_of(&self, element: &ElementRef) -> Option<String> {
        self.state()
            .nodes
            .get(element)
            .and_then(|node| node.attributes.get("value").cloned())
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn find_elements(
        &self,
        selector: &Selector,
        scope: Option<&ElementRef>,
    ) -> WaitResult<Vec<ElementRef>> {
        let mut state = self.state();
        state.record(format!("find:{selector}"));
        if let Some(failure) = state.lookup_failures.pop_front() {
            return Err(failure.into_error());
        }
        if let Some(parent) = scope {
            let _ = state.node(parent)?;
        }
        Ok(state
            .order
            .iter()
            .filter(|id| {
                state.nodes.get(*id).is_some_and(|node| {
                    node.attached && node.matches(selector) && node.parent.as_ref() == scope
                })
            })
            .cloned()
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("click:{element}"));
        let _ = state.node(element)?;
        match state.click_failures.pop_front() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn script_click(&self, element: &ElementRef) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("script_click:{element}"));
        let _ = state.node(element)?;
        match state.script_click_failures.pop_front() {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn clear(&self, element: &ElementRef) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("clear:{element}"));
        let _ = state.node_mut(element)?.attributes.remove("value");
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("send_keys:{element}"));
        if let Some(failure) = state.send_keys_failures.pop_front() {
            return Err(failure.into_error());
        }
        let node = state.node_mut(element)?;
        node.attributes
            .entry("value".to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> WaitResult<Option<String>> {
        let state = self.state();
        Ok(state.node(element)?.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementRef) -> WaitResult<bool> {
        let state = self.state();
        if let Some(failure) = &state.display_failure {
            return Err(failure.clone().into_error());
        }
        Ok(state.node(element)?.displayed)
    }

    async fn is_enabled(&self, element: &ElementRef) -> WaitResult<bool> {
        Ok(self.state().node(element)?.enabled)
    }

    async fn is_selected(&self, element: &ElementRef) -> WaitResult<bool> {
        Ok(self.state().node(element)?.selected)
    }

    async fn text(&self, element: &ElementRef) -> WaitResult<String> {
        Ok(self.state().node(element)?.text.clone())
    }

    async fn navigate(&self, url: &str) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("navigate:{url}"));
        state.current_url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> WaitResult<String> {
        Ok(self.state().current_url.clone())
    }

    async fn refresh(&self) -> WaitResult<()> {
        self.state().record("refresh".to_string());
        Ok(())
    }

    async fn type_to_focused(&self, text: &str) -> WaitResult<()> {
        let mut state = self.state();
        state.record(format!("type_to_focused:{text}"));
        state.typed.push(text.to_string());
        Ok(())
    }

    async fn release(&self, element: &ElementRef) {
        self.state().record(format!("release:{element}"));
    }
}

// ============================================================================
// TESTS
// ============================================================================
