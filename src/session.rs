//! Automation session: one browser process and a named page registry.
//!
//! [`Session`] owns the engine and maps short symbolic names (`pwd`,
//! `session`, `login`) to page handles. The engine owns the underlying
//! page resources; the registry only references them.
//!
//! # Example
//!
//! ```ignore
//! use pwd_crawler::{Session, CdpEngine, LaunchOptions};
//!
//! let mut session = Session::<CdpEngine>::launch(&LaunchOptions::new()).await?;
//! session.open_page("pwd", "https://labs.play-with-docker.com/").await?;
//! println!("{:?}", session.page_urls().await?);
//! session.close().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::engine::{Engine, LaunchOptions, Page};
use crate::error::{Error, Result};

// ============================================================================
// PageRegistry
// ============================================================================

/// Insertion-ordered name → page map.
///
/// At most one entry per name; names are case-normalized on every
/// operation. Iteration order is insertion order.
#[derive(Debug, Default)]
pub struct PageRegistry<P> {
    entries: Vec<(String, P)>,
}

impl<P> PageRegistry<P> {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a page under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: &str, page: P) {
        let name = name.to_lowercase();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, page));
    }

    /// Looks up a page by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&P> {
        let name = name.to_lowercase();
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    /// Removes and returns the entry under `name`.
    pub fn remove(&mut self, name: &str) -> Option<P> {
        let name = name.to_lowercase();
        let idx = self.entries.iter().position(|(n, _)| *n == name)?;
        Some(self.entries.remove(idx).1)
    }

    /// Moves the entry under `old` to `new`: the old key is removed and
    /// the same page is inserted under the new key, never both present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPage`] if no entry exists under `old`.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let page = self.remove(old).ok_or_else(|| Error::missing_page(old))?;
        self.insert(new, page);
        Ok(())
    }

    /// Returns registered names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &P)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Returns the number of registered pages.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no page is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One browser process plus its named page registry.
pub struct Session<E: Engine> {
    /// The automation engine.
    engine: E,

    /// Name → page handle.
    registry: PageRegistry<E::Page>,

    /// Process/log name.
    name: String,

    /// False once the browser has been closed; every operation other than
    /// launch fails fast while false.
    ready: bool,
}

impl<E: Engine> Session<E> {
    /// Launches the browser and creates the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LaunchFailed`] if the engine cannot start. A
    /// failed launch is fatal; the session is never created half-ready.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let engine = E::launch(options).await.inspect_err(|e| {
            error!(name = %options.name, error = %e, "Browser launch failed");
        })?;
        Ok(Self::with_engine(engine, &options.name))
    }

    /// Wraps an already-launched engine.
    pub fn with_engine(engine: E, name: &str) -> Self {
        Self {
            engine,
            registry: PageRegistry::new(),
            name: name.to_string(),
            ready: true,
        }
    }

    /// Returns `true` until the browser is closed.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Opens a page, navigates it, and registers it under `name`.
    ///
    /// When the engine yields no handle this is reported as a diagnostic
    /// and the registry is left unchanged; a later lookup of `name` fails
    /// with a clear [`Error::MissingPage`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] after close, or any navigation error.
    pub async fn open_page(&mut self, name: &str, url: &str) -> Result<()> {
        self.ensure_ready()?;
        debug!(session = %self.name, name = %name, url = %url, "Opening page");

        let Some(page) = self.engine.open_page().await? else {
            warn!(session = %self.name, name = %name, "Engine produced no page handle");
            return Ok(());
        };
        page.goto(url).await?;
        self.registry.insert(name, page);
        Ok(())
    }

    /// Looks up a registered page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] after close, [`Error::MissingPage`] if
    /// nothing is registered under `name`.
    pub fn page(&self, name: &str) -> Result<&E::Page> {
        self.ensure_ready()?;
        self.registry
            .get(name)
            .ok_or_else(|| Error::missing_page(name))
    }

    /// Returns the current URL of every registered page, in registry
    /// insertion order. Diagnostic helper.
    pub async fn page_urls(&self) -> Result<Vec<String>> {
        let mut urls = Vec::with_capacity(self.registry.len());
        for (_, page) in self.registry.iter() {
            urls.push(page.url().await?);
        }
        Ok(urls)
    }

    /// Takes the engine's standing page-created subscription.
    pub fn take_page_events(&mut self) -> Option<UnboundedReceiver<E::Page>> {
        self.engine.take_page_events()
    }

    /// Mutable access to the registry, for orchestration-level renames.
    pub(crate) fn registry_mut(&mut self) -> &mut PageRegistry<E::Page> {
        &mut self.registry
    }

    /// Closes the browser. All later operations fail with
    /// [`Error::NotReady`].
    pub async fn close(&mut self) -> Result<()> {
        self.ensure_ready()?;
        info!(session = %self.name, "Closing browser");
        self.engine.close().await?;
        self.ready = false;
        Ok(())
    }

    #[inline]
    fn ensure_ready(&self) -> Result<()> {
        if self.ready { Ok(()) } else { Err(Error::NotReady) }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{Action, MockEngine};

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    #[test]
    fn test_registry_insert_and_get() {
        let mut registry = PageRegistry::new();
        registry.insert("pwd", 1u32);
        assert_eq!(registry.get("pwd"), Some(&1));
        assert_eq!(registry.get("session"), None);
    }

    #[test]
    fn test_registry_names_are_case_normalized() {
        let mut registry = PageRegistry::new();
        registry.insert("PWD", 1u32);
        assert_eq!(registry.get("pwd"), Some(&1));
        assert_eq!(registry.names(), vec!["pwd"]);
    }

    #[test]
    fn test_registry_insert_replaces() {
        let mut registry = PageRegistry::new();
        registry.insert("pwd", 1u32);
        registry.insert("pwd", 2u32);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("pwd"), Some(&2));
    }

    #[test]
    fn test_registry_preserves_insertion_order() {
        let mut registry = PageRegistry::new();
        registry.insert("pwd", 1u32);
        registry.insert("login", 2u32);
        registry.insert("extra", 3u32);
        assert_eq!(registry.names(), vec!["pwd", "login", "extra"]);
    }

    #[test]
    fn test_registry_rename_moves_entry() {
        let mut registry = PageRegistry::new();
        registry.insert("pwd", 7u32);
        registry.rename("pwd", "session").unwrap();

        assert_eq!(registry.get("pwd"), None);
        assert_eq!(registry.get("session"), Some(&7));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rename_missing_fails() {
        let mut registry: PageRegistry<u32> = PageRegistry::new();
        let err = registry.rename("pwd", "session").unwrap_err();
        assert!(matches!(err, Error::MissingPage { .. }));
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_page_navigates_and_registers() {
        let (engine, handle) = MockEngine::new();
        let mut session = Session::with_engine(engine, "test");

        session.open_page("pwd", "https://example.com/").await.unwrap();

        assert!(session.page("pwd").is_ok());
        assert!(handle.actions().iter().any(|a| matches!(
            a,
            Action::Goto { url, .. } if url == "https://example.com/"
        )));
    }

    #[tokio::test]
    async fn test_degraded_open_leaves_registry_unchanged() {
        let (engine, handle) = MockEngine::new();
        handle.fail_next_open();
        let mut session = Session::with_engine(engine, "test");

        session.open_page("pwd", "https://example.com/").await.unwrap();

        let err = session.page("pwd").unwrap_err();
        assert!(matches!(err, Error::MissingPage { .. }));
    }

    #[tokio::test]
    async fn test_page_urls_in_insertion_order() {
        let (engine, _handle) = MockEngine::new();
        let mut session = Session::with_engine(engine, "test");

        session.open_page("pwd", "https://a.example/").await.unwrap();
        session.open_page("other", "https://b.example/").await.unwrap();

        let urls = session.page_urls().await.unwrap();
        assert_eq!(urls, vec!["https://a.example/", "https://b.example/"]);
    }

    #[tokio::test]
    async fn test_close_makes_operations_fail_fast() {
        let (engine, handle) = MockEngine::new();
        let mut session = Session::with_engine(engine, "test");
        session.open_page("pwd", "https://example.com/").await.unwrap();

        session.close().await.unwrap();
        assert!(handle.closed());
        assert!(!session.is_ready());

        assert!(matches!(session.page("pwd"), Err(Error::NotReady)));
        let err = session.open_page("x", "https://example.com/").await.unwrap_err();
        assert!(matches!(err, Error::NotReady));
        assert!(matches!(session.close().await, Err(Error::NotReady)));
    }
}
