// Error types for autowait

use crate::driver::ActionableState;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for autowait operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum Error {
    /// A single-target operation resolved to zero or several elements
    ///
    /// Refine the locator with `first()`, `last()` or `nth()` when several
    /// elements are expected to match.
    #[error(
        "Strict mode violation: selector '{selector}' resolved to {count} element(s), expected exactly 1"
    )]
    AmbiguousMatch { selector: String, count: usize },

    /// The element never became actionable before the deadline
    ///
    /// Carries the flags observed on the last poll.
    #[error("Element '{selector}' was not actionable after {timeout:?}: {state}")]
    NotActionable {
        selector: String,
        state: ActionableState,
        timeout: Duration,
    },

    /// Assertion timeout (expect API)
    ///
    /// `actual` is the last value observed before the deadline passed.
    #[error("Assertion timeout after {timeout:?}: expected {subject} {expected}, but was {actual}")]
    AssertionTimeout {
        subject: String,
        expected: String,
        actual: String,
        timeout: Duration,
    },

    /// Navigation timeout
    ///
    /// Occurs when the page URL never matched the awaited pattern.
    #[error("Navigation timeout after {timeout:?} waiting for URL {pattern}, last URL was '{last_url}'")]
    NavigationTimeout {
        pattern: String,
        last_url: String,
        timeout: Duration,
    },

    /// No new browsing context appeared before the deadline
    #[error("Timed out after {timeout:?} waiting for a new browsing context")]
    ContextWaitTimeout { timeout: Duration },

    /// Element handle used after its node detached or its document was replaced
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// Target was closed (browser or page)
    ///
    /// Occurs when attempting to perform an operation on a closed target.
    #[error("Target closed: Cannot perform operation on closed {target_type}. {context}")]
    TargetClosed {
        target_type: String,
        context: String,
    },

    /// Timeout waiting for an operation that has no richer diagnostic
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Failed to establish connection with the browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Transport-level error (WebSocket communication)
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Protocol-level error (DevTools protocol)
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,

    /// Invalid argument provided to method
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with additional context
    #[error("{0}: {1}")]
    Context(String, #[source] Box<Error>),
}

impl Error {
    /// Adds context to the error
    pub fn context(self, msg: impl Into<String>) -> Self {
        Error::Context(msg.into(), Box::new(self))
    }

    /// Returns true for the timeout family of errors.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::NotActionable { .. }
            | Error::AssertionTimeout { .. }
            | Error::NavigationTimeout { .. }
            | Error::ContextWaitTimeout { .. }
            | Error::Timeout(_) => true,
            Error::Context(_, source) => source.is_timeout(),
            _ => false,
        }
    }

    pub(crate) fn page_closed(context: impl Into<String>) -> Self {
        Error::TargetClosed {
            target_type: "page".to_string(),
            context: context.into(),
        }
    }
}
