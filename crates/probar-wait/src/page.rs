//! Page Object Model Support
//!
//! A page object wraps a [`Browser`] and knows when it has loaded. The only
//! capability the wait engine relies on is [`PageObject::load_condition`];
//! [`condition::page_loaded`](crate::condition::page_loaded) builds the page
//! from the session and polls that condition.
//!
//! Elements are declared explicitly through a [`PageElements`] registry:
//! each entry is a name and a selector, and the registry hands out accessors
//! that locate the element again on every call.
//!
//! # Example
//!
//! ```ignore
//! struct LoginPage {
//!     browser: Browser,
//!     elements: PageElements,
//! }
//!
//! impl PageObject for LoginPage {
//!     fn from_browser(browser: Browser) -> Self {
//!         let elements = PageElements::new(browser.clone())
//!             .with_element("user", "input#user")
//!             .with_element("logon", "//button[text()=\"Log On\"]");
//!         Self { browser, elements }
//!     }
//!
//!     fn browser(&self) -> &Browser {
//!         &self.browser
//!     }
//!
//!     fn load_condition(&self) -> Condition {
//!         condition::visible(self.elements.accessor("logon").unwrap())
//!     }
//! }
//! ```

use crate::browser::{Browser, ElementLocator};
use crate::condition::Condition;
use crate::element::{Component, WebComponent};
use crate::result::{WaitError, WaitResult};
use crate::selector::Selector;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A page, or a self-contained part of one
#[async_trait]
pub trait PageObject: Send + Sync + Sized + 'static {
    /// Build the page over a session
    fn from_browser(browser: Browser) -> Self;

    /// Session the page lives in
    fn browser(&self) -> &Browser;

    /// Ready once the page is loaded enough to interact with
    fn load_condition(&self) -> Condition;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Evaluate the load condition once
    async fn is_visible(&self) -> WaitResult<bool> {
        self.load_condition().check(self.browser()).await
    }

    /// Type into whatever has focus
    async fn type_keys(&self, text: &str) -> WaitResult<()> {
        self.browser().type_to_focused(text).await
    }

    /// Reload the page
    async fn refresh(&self) -> WaitResult<()> {
        self.browser().refresh().await
    }
}

/// Named element selectors of a page
#[derive(Debug, Clone)]
pub struct PageElements {
    browser: Browser,
    selectors: BTreeMap<String, Selector>,
}

impl PageElements {
    /// Create an empty registry over `browser`
    #[must_use]
    pub fn new(browser: Browser) -> Self {
        Self {
            browser,
            selectors: BTreeMap::new(),
        }
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, name: impl Into<String>, selector: impl Into<Selector>) -> Self {
        self.add_element(name, selector);
        self
    }

    /// Add (or replace) an element
    pub fn add_element(&mut self, name: impl Into<String>, selector: impl Into<Selector>) {
        let _ = self.selectors.insert(name.into(), selector.into());
    }

    /// Selector registered under `name`
    #[must_use]
    pub fn selector(&self, name: &str) -> Option<&Selector> {
        self.selectors.get(name)
    }

    /// Get all element names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.selectors.keys().map(String::as_str).collect()
    }

    fn require(&self, name: &str) -> WaitResult<&Selector> {
        self.selector(name)
            .ok_or_else(|| WaitError::config(format!("no element named {name:?} on this page")))
    }

    /// Accessor locating `name` on every call
    pub fn accessor(&self, name: &str) -> WaitResult<ElementLocator> {
        Ok(self.browser.locator(self.require(name)?.clone()))
    }

    /// Typed accessor locating `name` on every call
    pub fn accessor_as<T: Component>(&self, name: &str) -> WaitResult<ElementLocator<T>> {
        Ok(self.browser.locator_as::<T>(self.require(name)?.clone()))
    }

    /// Locate `name` now
    pub async fn locate(&self, name: &str) -> WaitResult<WebComponent> {
        let selector = self.require(name)?.clone();
        self.browser.find_element(selector).await
    }

    /// Locate `name` now as a typed component
    pub async fn locate_as<T: Component>(&self, name: &str) -> WaitResult<T> {
        let selector = self.require(name)?.clone();
        self.browser.find_element_as::<T>(selector).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::condition::{self, Accessor};
    use crate::driver::{MockDriver, MockNode};
    use crate::element::{Button, TextInput};
    use crate::wait::WaitOptions;
    use std::time::Duration;

    struct LoginPage {
        browser: Browser,
        elements: PageElements,
    }

    impl PageObject for LoginPage {
        fn from_browser(browser: Browser) -> Self {
            let elements = PageElements::new(browser.clone())
                .with_element("user", "input#user")
                .with_element("logon", "//button[text()=\"Log On\"]");
            Self { browser, elements }
        }

        fn browser(&self) -> &Browser {
            &self.browser
        }

        fn load_condition(&self) -> Condition {
            condition::visible(self.elements.accessor("logon").unwrap())
        }
    }

    impl LoginPage {
        async fn log_on(&self, user: &str) -> WaitResult<()> {
            let input: TextInput = self.elements.locate_as("user").await?;
            let _ = input.fill(user).await?;
            self.elements.locate_as::<Button>("logon").await?.click().await
        }
    }

    struct HomePage {
        browser: Browser,
    }

    impl PageObject for HomePage {
        fn from_browser(browser: Browser) -> Self {
            Self { browser }
        }

        fn browser(&self) -> &Browser {
            &self.browser
        }

        fn load_condition(&self) -> Condition {
            condition::url_contains("/home")
        }

        fn page_name(&self) -> &str {
            "Home"
        }
    }

    fn session() -> (MockDriver, Browser) {
        let driver = MockDriver::new();
        let browser = Browser::new(driver.clone())
            .with_wait_options(WaitOptions::new().with_timeout(500).with_poll_interval(5));
        (driver, browser)
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_explicit_registry() {
            let (_, browser) = session();
            let mut elements = PageElements::new(browser).with_element("b", "#b");
            elements.add_element("a", "//a");
            assert_eq!(elements.names(), vec!["a", "b"]);
            assert!(elements.selector("a").unwrap().is_xpath());
            assert!(elements.selector("c").is_none());
        }

        #[tokio::test]
        async fn test_unknown_name_is_config_error() {
            let (_, browser) = session();
            let elements = PageElements::new(browser);
            assert!(matches!(
                elements.accessor("missing").unwrap_err(),
                WaitError::Config { .. }
            ));
            assert!(matches!(
                elements.locate("missing").await.unwrap_err(),
                WaitError::Config { .. }
            ));
        }

        #[tokio::test]
        async fn test_accessor_relocates_each_call() {
            let (driver, browser) = session();
            let first = driver.add_node(MockNode::new("#status"));
            let elements = PageElements::new(browser).with_element("status", "#status");
            let status = elements.accessor("status").unwrap();

            assert_eq!(status.access().await.unwrap().element_ref(), first);
            let second = driver.rerender(&first).unwrap();
            assert_eq!(status.access().await.unwrap().element_ref(), second);
        }
    }

    mod page_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_until_page_has_loaded() {
            let (driver, browser) = session();
            let adder = driver.clone();
            drop(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let _ = adder.add_node(MockNode::new("input#user"));
                let _ = adder.add_node(MockNode::new("//button[text()=\"Log On\"]"));
            }));

            let login: LoginPage = browser.wait_until_page_has_loaded().await.unwrap();
            assert!(login.is_visible().await.unwrap());
            assert!(login.page_name().ends_with("LoginPage"));

            login.log_on("admin").await.unwrap();
            assert!(driver.was_called("send_keys:"));
            assert_eq!(driver.call_count("click:"), 2);
        }

        #[tokio::test]
        async fn test_any_page_has_loaded() {
            let (driver, browser) = session();
            driver.set_url("https://example.com/home");
            browser
                .wait_until_any_page_has_loaded([
                    condition::page_loaded::<LoginPage>(),
                    condition::page_loaded::<HomePage>(),
                ])
                .await
                .unwrap();
            let home = HomePage::from_browser(browser);
            assert_eq!(home.page_name(), "Home");
            assert!(home.is_visible().await.unwrap());
        }

        #[tokio::test]
        async fn test_provided_helpers() {
            let (driver, browser) = session();
            let home = HomePage::from_browser(browser);
            home.type_keys("q").await.unwrap();
            home.refresh().await.unwrap();
            assert_eq!(driver.typed(), vec!["q".to_string()]);
            assert!(driver.was_called("refresh"));
        }
    }
}
