//! Result and error types for the wait engine.

use thiserror::Error;

/// Result type for wait, retry and element operations
pub type WaitResult<T> = Result<T, WaitError>;

/// Coarse classification of a [`WaitError`].
///
/// Retry predicates and the poll loop branch on this rather than on
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Locator matched nothing
    NotFound,
    /// Element reference is no longer attached to the document
    StaleReference,
    /// Poll budget exhausted
    Timeout,
    /// A session validator detected an unexpected state
    Validation,
    /// Generic failure passed through from the driver
    Operation,
    /// Immediate assertion failed
    Assertion,
    /// Configuration could not be loaded or parsed
    Config,
}

impl FailureKind {
    /// Whether this kind means "the target state has not occurred yet"
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::NotFound | Self::StaleReference)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not-found",
            Self::StaleReference => "stale-reference",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Operation => "operation",
            Self::Assertion => "assertion",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Errors raised by the wait engine and its collaborators
#[derive(Debug, Error)]
pub enum WaitError {
    /// Locator matched nothing
    #[error("No element matches selector {selector}")]
    NotFound {
        /// Selector that was looked up
        selector: String,
    },

    /// Element reference was detached from the document
    #[error("Stale element reference: {message}")]
    StaleReference {
        /// Error message
        message: String,
    },

    /// Wait timed out
    #[error("Wait timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Validator raised
    #[error("Validation failed: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Driver operation failed (click obstructed, script error, ...)
    #[error("Operation failed: {message}")]
    Operation {
        /// Error message
        message: String,
    },

    /// Assertion failed (from `ensure()`)
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl WaitError {
    /// Create a not-found error
    #[must_use]
    pub fn not_found(selector: impl Into<String>) -> Self {
        Self::NotFound {
            selector: selector.into(),
        }
    }

    /// Create a stale reference error
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::StaleReference {
            message: message.into(),
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an operation error
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::StaleReference { .. } => FailureKind::StaleReference,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Validation { .. } => FailureKind::Validation,
            Self::Operation { .. } => FailureKind::Operation,
            Self::Assertion { .. } => FailureKind::Assertion,
            Self::Config { .. } | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => FailureKind::Config,
        }
    }

    /// Element reference went stale
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }

    /// Locator matched nothing
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Poll budget ran out
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// NotFound or Stale: the element "does not exist (yet / any more)"
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }
}
