//! Error types for the PWD crawler.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pwd_crawler::{Result, Error};
//!
//! async fn example(crawler: &mut Crawler<CdpEngine>) -> Result<()> {
//!     crawler.start_session().await?;
//!     crawler.add_instance().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Fatal startup | [`Error::LaunchFailed`], [`Error::Config`] |
//! | Terminal remote | [`Error::OutOfCapacity`] |
//! | Validation | [`Error::MissingCredential`] |
//! | Degradation | [`Error::MissingPage`], [`Error::NotReady`] |
//! | Sequencing | [`Error::SessionNotStarted`] |
//! | Execution | [`Error::Timeout`], [`Error::ElementNotFound`] |
//! | External | [`Error::Cdp`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use chromiumoxide::error::CdpError;
use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Fatal Startup Errors
    // ========================================================================
    /// Browser launch failed.
    ///
    /// Returned when the automation engine process cannot be started.
    /// A failed launch is fatal for the run; there is no retry.
    #[error("Browser launch failed: {message}")]
    LaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// Configuration error.
    ///
    /// Returned when credential or launch configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Terminal Remote Condition
    // ========================================================================
    /// The remote service is out of capacity.
    ///
    /// Returned when session start lands on the out-of-capacity page.
    /// The browser is force-closed before this is returned.
    #[error("Remote service out of capacity: {url}")]
    OutOfCapacity {
        /// The out-of-capacity URL that was observed.
        url: String,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Missing credential field for the password login flow.
    ///
    /// Returned before any UI interaction is attempted.
    #[error("Missing credential: {field}")]
    MissingCredential {
        /// Name of the missing field.
        field: &'static str,
    },

    // ========================================================================
    // Session State Errors
    // ========================================================================
    /// Operation invoked while the session is not ready.
    ///
    /// Returned after the browser has been closed, or before launch
    /// completed.
    #[error("Session not ready")]
    NotReady,

    /// No page registered under the given name.
    ///
    /// Returned when an operation needs a page that was never opened or
    /// whose registration was skipped after a degraded open.
    #[error("No page registered under name: {name}")]
    MissingPage {
        /// The missing registry name.
        name: String,
    },

    /// Instance provisioning attempted before a workspace session exists.
    #[error("No active workspace session")]
    SessionNotStarted,

    /// The engine's page-created notification stream ended.
    ///
    /// The browser process or its event watcher terminated; the run is
    /// over and is not reconnected.
    #[error("Engine event stream ended, browser process terminated")]
    EngineTerminated,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when an operation exceeds its timeout duration.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Element not found by selector.
    ///
    /// Returned when a CSS selector matches no elements.
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// CSS selector used.
        selector: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Chrome DevTools Protocol error.
    #[error("Engine error: {0}")]
    Cdp(#[from] CdpError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a launch failed error.
    #[inline]
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self::LaunchFailed {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an out-of-capacity error.
    #[inline]
    pub fn out_of_capacity(url: impl Into<String>) -> Self {
        Self::OutOfCapacity { url: url.into() }
    }

    /// Creates a missing credential error.
    #[inline]
    pub fn missing_credential(field: &'static str) -> Self {
        Self::MissingCredential { field }
    }

    /// Creates a missing page error.
    #[inline]
    pub fn missing_page(name: impl Into<String>) -> Self {
        Self::MissingPage { name: name.into() }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error ends the run.
    ///
    /// Fatal errors are never retried: a failed launch, invalid
    /// configuration, a terminated engine, or the remote out-of-capacity
    /// condition.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LaunchFailed { .. }
                | Self::Config { .. }
                | Self::OutOfCapacity { .. }
                | Self::EngineTerminated
        )
    }

    /// Returns `true` if this is a validation error.
    ///
    /// Validation errors are reported before any UI interaction and leave
    /// no side effects behind.
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
