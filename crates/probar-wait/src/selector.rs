//! Selector syntax for element lookup.
//!
//! A selector string is XPath when it contains `//`, CSS otherwise. The
//! switch is purely lexical; no validation of either syntax happens here.

use crate::result::{WaitError, WaitResult};
use serde::{Deserialize, Serialize};

/// Marker that switches a selector string to XPath
pub const XPATH_MARKER: &str = "//";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector (e.g., `//button[text()="Log On"]`)
    XPath(String),
}

impl Selector {
    /// Parse a raw selector string using the lexical XPath marker
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.contains(XPATH_MARKER) {
            Self::XPath(raw)
        } else {
            Self::Css(raw)
        }
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Selector matching any element whose own text equals `text`
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self::XPath(format!("//*[text()=\"{text}\"]"))
    }

    /// The raw selector text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) => s,
        }
    }

    /// Whether this is an XPath selector
    #[must_use]
    pub const fn is_xpath(&self) -> bool {
        matches!(self, Self::XPath(_))
    }

    /// Scope this selector under a parent selector.
    ///
    /// CSS uses a descendant combinator. XPath is joined as a path, so a
    /// child starting with `//` searches all descendants of the parent.
    ///
    /// # Errors
    ///
    /// Returns a config error when parent and child use different syntaxes
    pub fn within(&self, parent: &Self) -> WaitResult<Self> {
        match (parent, self) {
            (Self::Css(p), Self::Css(c)) => Ok(Self::Css(format!("{p} {c}"))),
            (Self::XPath(p), Self::XPath(c)) => Ok(Self::XPath(format!("{p}{c}"))),
            _ => Err(WaitError::config(format!(
                "cannot scope '{self}' under '{parent}': CSS and XPath do not mix"
            ))),
        }
    }

    /// JavaScript expression resolving to the first match (or `null`)
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue")
            }
        }
    }

    /// JavaScript expression counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelectorAll({s:?}).length"),
            Self::XPath(s) => {
                format!("document.evaluate({s:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength")
            }
        }
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for Selector {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_css_by_default() {
            assert_eq!(Selector::parse("div.dialog"), Selector::css("div.dialog"));
            assert!(!Selector::parse("input[title=\"Search\"]").is_xpath());
        }

        #[test]
        fn test_xpath_marker_switches_syntax() {
            let sel = Selector::parse("//button[text()=\"Log On\"]");
            assert!(sel.is_xpath());
            assert_eq!(sel.as_str(), "//button[text()=\"Log On\"]");
        }

        #[test]
        fn test_marker_anywhere_in_string() {
            assert!(Selector::parse("(//div)[2]").is_xpath());
        }

        #[test]
        fn test_from_str() {
            let sel: Selector = "body".into();
            assert_eq!(sel, Selector::Css("body".into()));
        }

        #[test]
        fn test_with_text() {
            let sel = Selector::with_text("Save");
            assert_eq!(sel.as_str(), "//*[text()=\"Save\"]");
            assert!(sel.is_xpath());
        }
    }

    mod scoping_tests {
        use super::*;

        #[test]
        fn test_css_within_css() {
            let child = Selector::css("#spinner.active");
            assert_eq!(
                child.within(&Selector::css("div.panel")).unwrap().as_str(),
                "div.panel #spinner.active"
            );
        }

        #[test]
        fn test_xpath_within_xpath() {
            let child = Selector::xpath("//span");
            assert_eq!(
                child
                    .within(&Selector::xpath("//div[@id='a']"))
                    .unwrap()
                    .as_str(),
                "//div[@id='a']//span"
            );
        }

        #[test]
        fn test_mixed_syntaxes_rejected() {
            let err = Selector::css("span")
                .within(&Selector::xpath("//div"))
                .unwrap_err();
            assert!(matches!(err, WaitError::Config { .. }));
            assert!(err.to_string().contains("'span'"));

            let err = Selector::xpath("//span")
                .within(&Selector::css("div.panel"))
                .unwrap_err();
            assert!(matches!(err, WaitError::Config { .. }));
        }
    }

    #[test]
    fn test_queries() {
        assert!(Selector::css("button").to_query().contains("querySelector"));
        assert!(Selector::xpath("//a").to_query().contains("document.evaluate"));
        assert!(Selector::css("li").to_count_query().ends_with(".length"));
        assert!(Selector::xpath("//li")
            .to_count_query()
            .ends_with("snapshotLength"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Selector::css("a.b").to_string(), "a.b");
    }
}
