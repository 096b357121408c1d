//! Immediate assertions on components.
//!
//! Unlike waits, these check the current state once and fail with
//! [`WaitError::Assertion`] straight away.
//!
//! ```ignore
//! ensure(&save_button).is_enabled().await?;
//! ensure(&title).text_is("Dashboard").await?;
//! ```

use crate::element::Component;
use crate::result::{WaitError, WaitResult};

/// Assertions on one component
#[derive(Debug)]
pub struct Ensure<'a, C> {
    component: &'a C,
}

/// Start asserting on `component`
#[must_use]
pub const fn ensure<C: Component>(component: &C) -> Ensure<'_, C> {
    Ensure { component }
}

impl<C: Component> Ensure<'_, C> {
    /// Visible text equals `expected`, ignoring surrounding whitespace
    pub async fn text_is(&self, expected: &str) -> WaitResult<()> {
        let element = self.component.as_ref();
        let text = element.text().await?;
        if text.trim() == expected.trim() {
            Ok(())
        } else {
            Err(WaitError::assertion(format!(
                "Element {} text is '{text}'. Expected value is '{expected}'",
                element.selector()
            )))
        }
    }

    /// Component is displayed
    pub async fn is_visible(&self) -> WaitResult<()> {
        let element = self.component.as_ref();
        if element.is_displayed().await {
            Ok(())
        } else {
            Err(WaitError::assertion(format!(
                "Element {} is not visible",
                element.selector()
            )))
        }
    }

    /// Component is not displayed
    pub async fn is_not_visible(&self) -> WaitResult<()> {
        let element = self.component.as_ref();
        if element.is_displayed().await {
            Err(WaitError::assertion(format!(
                "Element {} is visible",
                element.selector()
            )))
        } else {
            Ok(())
        }
    }

    /// Component accepts interaction, by its own notion of disabled
    pub async fn is_enabled(&self) -> WaitResult<()> {
        if self.component.is_disabled().await {
            Err(WaitError::assertion(format!(
                "Element {} is disabled",
                self.component.as_ref().selector()
            )))
        } else {
            Ok(())
        }
    }
}
