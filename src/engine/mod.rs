//! Browser Automation Engine interface.
//!
//! The crawler consumes the browser through the narrow [`Engine`] and
//! [`Page`] traits: process launch, page creation, selector-based
//! interaction, keyboard synthesis, cookie injection, and one standing
//! "page created" subscription. Everything else about the underlying
//! browser is out of scope.
//!
//! The production implementation is [`cdp::CdpEngine`] over chromiumoxide;
//! tests script the same interface with an in-memory engine.
//!
//! # Page-created subscription
//!
//! The target site opens its identity-provider login page in a tab the
//! crawler never asked for. [`Engine::take_page_events`] hands out an
//! unbounded receiver carrying every new page handle the engine observes;
//! the login flow awaits it directly, so the event race is an explicit
//! channel handshake rather than a callback mutating shared state.

// ============================================================================
// Modules
// ============================================================================

/// chromiumoxide-backed engine implementation.
pub mod cdp;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Key value for the Enter/Return key.
pub const ENTER: &str = "Enter";

// ============================================================================
// LaunchOptions
// ============================================================================

/// Browser process launch options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Process/log name.
    pub name: String,

    /// Run the browser without a GUI.
    pub headless: bool,

    /// Open devtools on startup.
    pub devtools: bool,
}

impl LaunchOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the process/log name.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables headless mode.
    #[inline]
    #[must_use]
    pub fn with_headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Enables devtools on startup.
    #[inline]
    #[must_use]
    pub fn with_devtools(mut self) -> Self {
        self.devtools = true;
        self
    }
}

// ============================================================================
// Page Trait
// ============================================================================

/// One automatable browser page.
///
/// Handles are cheap to clone and refer to the same underlying page.
#[async_trait]
pub trait Page: Clone + Send + Sync + 'static {
    /// Returns the page's current URL.
    async fn url(&self) -> Result<String>;

    /// Navigates the page to `url` and waits for the navigation to settle.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Reloads the page.
    async fn reload(&self) -> Result<()>;

    /// Waits for `selector` to match a visible element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`](crate::Error::Timeout) if no match
    /// appears within `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Types `text` into the first element matching `selector`.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Reads the `value` property of the first element matching `selector`.
    async fn read_value(&self, selector: &str) -> Result<String>;

    /// Synthesizes one key press against the page's focused element.
    ///
    /// `key` is either a single printable character or a named key such as
    /// [`ENTER`].
    async fn press_key(&self, key: &str) -> Result<()>;

    /// Injects a cookie scoped to the page's current URL.
    async fn set_cookie(&self, name: &str, value: &str) -> Result<()>;
}

// ============================================================================
// Engine Trait
// ============================================================================

/// One browser process.
#[async_trait]
pub trait Engine: Send + Sized + 'static {
    /// Page handle type.
    type Page: Page;

    /// Launches the browser process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaunchFailed`](crate::Error::LaunchFailed) if the
    /// process cannot be started. A failed launch is fatal for the run.
    async fn launch(options: &LaunchOptions) -> Result<Self>;

    /// Opens a blank page, reusing the browser's initial page if still
    /// unclaimed.
    ///
    /// Yields `Ok(None)` when the engine produced no usable handle; the
    /// caller treats that as a non-fatal degradation.
    async fn open_page(&mut self) -> Result<Option<Self::Page>>;

    /// Takes the standing page-created subscription.
    ///
    /// The receiver carries every new page the engine observes for the
    /// lifetime of the run, including pages opened by the target site
    /// itself. Can be taken once; subsequent calls return `None`.
    fn take_page_events(&mut self) -> Option<UnboundedReceiver<Self::Page>>;

    /// Closes the browser process.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
