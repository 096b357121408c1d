//! Real browser driver over the Chrome DevTools Protocol.
//!
//! Only compiled with the `browser` feature. Elements found through the
//! page are kept in a handle table keyed by their backend node id, so
//! finding the same node again reuses its entry. The [`ElementRef`] handed
//! out names that entry. A node that left the DOM surfaces as
//! [`WaitError::StaleReference`] the next time its handle is used, and the
//! entry is dropped then.

use crate::driver::{AutomationDriver, ElementRef};
use crate::result::{WaitError, WaitResult};
use crate::selector::Selector;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// CDP error fragments meaning the node is gone from the document
const DETACHED_MARKERS: &[&str] = &[
    "Could not find node",
    "No node with given id",
    "Cannot find context with specified id",
    "Node is detached",
];

const DISPLAYED_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; \
}";
const ENABLED_JS: &str = "function() { return !this.disabled; }";
const SELECTED_JS: &str = "function() { return !!(this.checked || this.selected); }";
const CLICK_JS: &str = "function() { this.click(); }";
const CLEAR_JS: &str = "function() { \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

/// Map a CDP error into the harness taxonomy
fn classify(err: impl std::fmt::Display) -> WaitError {
    let message = err.to_string();
    if DETACHED_MARKERS.iter().any(|m| message.contains(m)) {
        WaitError::stale(message)
    } else {
        WaitError::operation(message)
    }
}

/// Element handles by backend node id
#[derive(Debug)]
struct HandleTable<T> {
    entries: HashMap<String, T>,
}

impl<T> HandleTable<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Store `value` for `node`, replacing any older handle to the same node
    fn remember(&mut self, node: i64, value: T) -> ElementRef {
        let id = format!("node-{node}");
        let _ = self.entries.insert(id.clone(), value);
        ElementRef::new(id)
    }

    fn get(&self, element: &ElementRef) -> WaitResult<&T> {
        self.entries
            .get(element.id())
            .ok_or_else(|| WaitError::stale(format!("unknown element handle {element}")))
    }

    fn forget(&mut self, element: &ElementRef) -> bool {
        self.entries.remove(element.id()).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Chromium session driven through chromiumoxide
#[derive(Debug)]
pub struct ChromiumDriver {
    page: CdpPage,
    elements: Mutex<HandleTable<Element>>,
    browser: Option<Arc<Mutex<CdpBrowser>>>,
    handler: Option<tokio::task::JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Drive an existing page
    #[must_use]
    pub fn new(page: CdpPage) -> Self {
        Self {
            page,
            elements: Mutex::new(HandleTable::new()),
            browser: None,
            handler: None,
        }
    }

    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched
    pub async fn launch(headless: bool, sandbox: bool) -> WaitResult<Self> {
        let mut builder = CdpConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        if !sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(WaitError::config)?;

        let (browser, mut handler) = CdpBrowser::launch(config).await.map_err(classify)?;
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(classify)?;
        tracing::info!(headless, "chromium launched");
        Ok(Self {
            page,
            elements: Mutex::new(HandleTable::new()),
            browser: Some(Arc::new(Mutex::new(browser))),
            handler: Some(handle),
        })
    }

    /// Close the browser, if this driver launched it
    ///
    /// # Errors
    ///
    /// Returns error if the browser refuses to close
    pub async fn close(self) -> WaitResult<()> {
        if let Some(browser) = self.browser {
            let _ = browser.lock().await.close().await.map_err(classify)?;
        }
        if let Some(handle) = self.handler {
            handle.abort();
        }
        Ok(())
    }

    async fn remember(&self, found: Vec<Element>) -> Vec<ElementRef> {
        let mut table = self.elements.lock().await;
        found
            .into_iter()
            .map(|element| {
                let node = *element.backend_node_id.inner();
                table.remember(node, element)
            })
            .collect()
    }

    /// Drop the handle when `result` says its node is gone
    async fn evict_on_stale<R>(
        &self,
        element: &ElementRef,
        result: WaitResult<R>,
    ) -> WaitResult<R> {
        if matches!(&result, Err(e) if e.is_stale()) {
            let _ = self.elements.lock().await.forget(element);
        }
        result
    }

    async fn call(&self, element: &ElementRef, function: &str) -> WaitResult<serde_json::Value> {
        let result = {
            let table = self.elements.lock().await;
            match table.get(element) {
                Ok(handle) => handle
                    .call_js_fn(function, false)
                    .await
                    .map(|returns| returns.result.value.unwrap_or(serde_json::Value::Null))
                    .map_err(classify),
                Err(e) => Err(e),
            }
        };
        self.evict_on_stale(element, result).await
    }

    async fn flag(&self, element: &ElementRef, function: &str) -> WaitResult<bool> {
        Ok(self.call(element, function).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl AutomationDriver for ChromiumDriver {
    async fn find_elements(
        &self,
        selector: &Selector,
        scope: Option<&ElementRef>,
    ) -> WaitResult<Vec<ElementRef>> {
        tracing::trace!(selector = selector.as_str(), "cdp lookup");
        let found = match (scope, selector) {
            (None, Selector::Css(css)) => {
                self.page.find_elements(css.as_str()).await.map_err(classify)
            }
            (None, Selector::XPath(xpath)) => {
                self.page.find_xpaths(xpath.as_str()).await.map_err(classify)
            }
            (Some(parent), Selector::Css(css)) => {
                let found = {
                    let table = self.elements.lock().await;
                    match table.get(parent) {
                        Ok(handle) => handle.find_elements(css.as_str()).await.map_err(classify),
                        Err(e) => Err(e),
                    }
                };
                self.evict_on_stale(parent, found).await
            }
            (Some(_), Selector::XPath(xpath)) => {
                return Err(WaitError::operation(format!(
                    "scoped XPath lookup is not supported: {xpath}"
                )));
            }
        };
        Ok(self.remember(found?).await)
    }

    async fn click(&self, element: &ElementRef) -> WaitResult<()> {
        let result = {
            let table = self.elements.lock().await;
            match table.get(element) {
                Ok(handle) => handle.click().await.map(|_| ()).map_err(classify),
                Err(e) => Err(e),
            }
        };
        self.evict_on_stale(element, result).await
    }

    async fn script_click(&self, element: &ElementRef) -> WaitResult<()> {
        let _ = self.call(element, CLICK_JS).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> WaitResult<()> {
        let _ = self.call(element, CLEAR_JS).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> WaitResult<()> {
        let result = {
            let table = self.elements.lock().await;
            match table.get(element) {
                Ok(handle) => match handle.focus().await {
                    Ok(handle) => handle.type_str(text).await.map(|_| ()).map_err(classify),
                    Err(e) => Err(classify(e)),
                },
                Err(e) => Err(e),
            }
        };
        self.evict_on_stale(element, result).await
    }

    async fn attribute(&self, element: &ElementRef, name: &str) -> WaitResult<Option<String>> {
        let result = {
            let table = self.elements.lock().await;
            match table.get(element) {
                Ok(handle) => handle.attribute(name).await.map_err(classify),
                Err(e) => Err(e),
            }
        };
        self.evict_on_stale(element, result).await
    }

    async fn is_displayed(&self, element: &ElementRef) -> WaitResult<bool> {
        self.flag(element, DISPLAYED_JS).await
    }

    async fn is_enabled(&self, element: &ElementRef) -> WaitResult<bool> {
        self.flag(element, ENABLED_JS).await
    }

    async fn is_selected(&self, element: &ElementRef) -> WaitResult<bool> {
        self.flag(element, SELECTED_JS).await
    }

    async fn text(&self, element: &ElementRef) -> WaitResult<String> {
        let result = {
            let table = self.elements.lock().await;
            match table.get(element) {
                Ok(handle) => handle
                    .inner_text()
                    .await
                    .map(Option::unwrap_or_default)
                    .map_err(classify),
                Err(e) => Err(e),
            }
        };
        self.evict_on_stale(element, result).await
    }

    async fn navigate(&self, url: &str) -> WaitResult<()> {
        let _ = self.page.goto(url).await.map_err(|e| {
            WaitError::operation(format!("navigation to {url} failed: {e}"))
        })?;
        // Handles from the previous document are all stale now
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn current_url(&self) -> WaitResult<String> {
        Ok(self
            .page
            .url()
            .await
            .map_err(classify)?
            .unwrap_or_default())
    }

    async fn refresh(&self) -> WaitResult<()> {
        let _ = self.page.reload().await.map_err(classify)?;
        self.elements.lock().await.clear();
        Ok(())
    }

    async fn release(&self, element: &ElementRef) {
        if self.elements.lock().await.forget(element) {
            tracing::trace!(%element, "released element handle");
        }
    }

    async fn type_to_focused(&self, text: &str) -> WaitResult<()> {
        let _ = self
            .page
            .execute(InsertTextParams::new(text))
            .await
            .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_detached_node_as_stale() {
        let err = classify("Could not find node with given id");
        assert!(err.is_stale());
        let err = classify("Node is detached from document");
        assert!(err.is_stale());
    }

    #[test]
    fn test_classify_other_errors_as_operation() {
        let err = classify("Element is not clickable at point (10, 10)");
        assert!(matches!(err, WaitError::Operation { .. }));
    }

    mod handle_table_tests {
        use super::*;

        #[test]
        fn test_unknown_handle_is_stale() {
            let table: HandleTable<u32> = HandleTable::new();
            let err = table.get(&ElementRef::new("gone")).unwrap_err();
            assert!(err.is_stale());
        }

        #[test]
        fn test_repeated_lookups_reuse_entry() {
            let mut table = HandleTable::new();
            let first = table.remember(42, 1_u32);
            for value in 2..50 {
                assert_eq!(table.remember(42, value), first);
            }
            assert_eq!(table.len(), 1);
            assert_eq!(*table.get(&first).unwrap(), 49);
        }

        #[test]
        fn test_table_bounded_by_distinct_nodes() {
            let mut table = HandleTable::new();
            for _ in 0..100 {
                for node in 0..3 {
                    let _ = table.remember(node, node);
                }
            }
            assert_eq!(table.len(), 3);
        }

        #[test]
        fn test_forget_shrinks_table() {
            let mut table = HandleTable::new();
            let kept = table.remember(1, "a");
            let dropped = table.remember(2, "b");

            assert!(table.forget(&dropped));
            assert!(!table.forget(&dropped));
            assert_eq!(table.len(), 1);
            assert!(table.get(&dropped).unwrap_err().is_stale());
            assert_eq!(*table.get(&kept).unwrap(), "a");

            table.clear();
            assert_eq!(table.len(), 0);
        }
    }
}
