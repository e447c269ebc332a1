//! Scripted in-memory engine for state-machine tests.
//!
//! Pages carry URL scripts, per-selector wait outcomes, and field values;
//! every automation action lands in one shared ordered log so tests can
//! assert exactly what ran, and in what order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Engine, LaunchOptions, Page};
use crate::error::{Error, Result};

// ============================================================================
// Action Log
// ============================================================================

/// One recorded automation action, tagged with the acting page id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Open,
    Close,
    Goto { page: usize, url: String },
    Reload { page: usize },
    WaitFor { page: usize, selector: String },
    Click { page: usize, selector: String },
    Type { page: usize, selector: String, text: String },
    ReadValue { page: usize, selector: String },
    PressKey { page: usize, key: String },
    SetCookie { page: usize, name: String, value: String },
}

#[derive(Debug, Default)]
struct Shared {
    log: Mutex<Vec<Action>>,
    fail_next_open: Mutex<bool>,
    next_page_id: Mutex<usize>,
}

impl Shared {
    fn record(&self, action: Action) {
        self.log.lock().push(action);
    }

    fn next_id(&self) -> usize {
        let mut id = self.next_page_id.lock();
        *id += 1;
        *id
    }
}

// ============================================================================
// MockEngine
// ============================================================================

pub(crate) struct MockEngine {
    shared: Arc<Shared>,
    events_rx: Option<UnboundedReceiver<MockPage>>,
}

impl MockEngine {
    /// Creates an engine plus the handle tests use to script and inspect it.
    pub(crate) fn new() -> (Self, MockHandle) {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            shared: Arc::clone(&shared),
            events_rx: Some(rx),
        };
        (engine, MockHandle { shared, events_tx: tx })
    }
}

#[async_trait]
impl Engine for MockEngine {
    type Page = MockPage;

    async fn launch(_options: &LaunchOptions) -> Result<Self> {
        Ok(Self::new().0)
    }

    async fn open_page(&mut self) -> Result<Option<Self::Page>> {
        self.shared.record(Action::Open);
        let mut fail = self.shared.fail_next_open.lock();
        if *fail {
            *fail = false;
            return Ok(None);
        }
        drop(fail);
        Ok(Some(MockPage::new(Arc::clone(&self.shared), "")))
    }

    fn take_page_events(&mut self) -> Option<UnboundedReceiver<Self::Page>> {
        self.events_rx.take()
    }

    async fn close(&mut self) -> Result<()> {
        self.shared.record(Action::Close);
        Ok(())
    }
}

// ============================================================================
// MockHandle
// ============================================================================

/// Test-side handle: scripts the engine and inspects the action log.
pub(crate) struct MockHandle {
    shared: Arc<Shared>,
    events_tx: UnboundedSender<MockPage>,
}

impl MockHandle {
    /// Creates a page outside the engine, as the target site would.
    pub(crate) fn external_page(&self, url: &str) -> MockPage {
        MockPage::new(Arc::clone(&self.shared), url)
    }

    /// Delivers a page on the page-created subscription.
    pub(crate) fn emit_page(&self, page: &MockPage) {
        self.events_tx
            .send(page.clone())
            .expect("page-created receiver dropped");
    }

    /// Makes the next `open_page` yield no handle.
    pub(crate) fn fail_next_open(&self) {
        *self.shared.fail_next_open.lock() = true;
    }

    /// Snapshot of every recorded action, in order.
    pub(crate) fn actions(&self) -> Vec<Action> {
        self.shared.log.lock().clone()
    }

    /// Number of actions recorded so far.
    pub(crate) fn action_count(&self) -> usize {
        self.shared.log.lock().len()
    }

    /// Whether the browser was closed.
    pub(crate) fn closed(&self) -> bool {
        self.shared.log.lock().contains(&Action::Close)
    }
}

// ============================================================================
// MockPage
// ============================================================================

/// Scripted page. Clones share identity and scripts.
#[derive(Clone, Debug)]
pub(crate) struct MockPage {
    id: usize,
    shared: Arc<Shared>,
    urls: Arc<Mutex<VecDeque<String>>>,
    wait_denied: Arc<Mutex<HashSet<String>>>,
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MockPage {
    fn new(shared: Arc<Shared>, url: &str) -> Self {
        let id = shared.next_id();
        Self {
            id,
            shared,
            urls: Arc::new(Mutex::new(VecDeque::from([url.to_string()]))),
            wait_denied: Arc::new(Mutex::new(HashSet::new())),
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Page identity, stable across clones.
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Appends a URL to the script; each `url()` call consumes one entry
    /// until only the last remains.
    pub(crate) fn push_url(&self, url: &str) {
        self.urls.lock().push_back(url.to_string());
    }

    /// Makes `wait_for(selector)` time out.
    pub(crate) fn deny_wait(&self, selector: &str) {
        self.wait_denied.lock().insert(selector.to_string());
    }

    /// Clears a wait denial.
    pub(crate) fn allow_wait(&self, selector: &str) {
        self.wait_denied.lock().remove(selector);
    }

    /// Sets the value read back for a selector.
    pub(crate) fn set_value(&self, selector: &str, value: &str) {
        self.values
            .lock()
            .insert(selector.to_string(), value.to_string());
    }
}

#[async_trait]
impl Page for MockPage {
    async fn url(&self) -> Result<String> {
        let mut urls = self.urls.lock();
        if urls.len() > 1 {
            Ok(urls.pop_front().unwrap_or_default())
        } else {
            Ok(urls.front().cloned().unwrap_or_default())
        }
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.shared.record(Action::Goto {
            page: self.id,
            url: url.to_string(),
        });
        *self.urls.lock() = VecDeque::from([url.to_string()]);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.shared.record(Action::Reload { page: self.id });
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.shared.record(Action::WaitFor {
            page: self.id,
            selector: selector.to_string(),
        });
        if self.wait_denied.lock().contains(selector) {
            return Err(Error::timeout(
                format!("wait_for({selector})"),
                timeout.as_millis() as u64,
            ));
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.shared.record(Action::Click {
            page: self.id,
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.shared.record(Action::Type {
            page: self.id,
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn read_value(&self, selector: &str) -> Result<String> {
        self.shared.record(Action::ReadValue {
            page: self.id,
            selector: selector.to_string(),
        });
        self.values
            .lock()
            .get(selector)
            .cloned()
            .ok_or_else(|| Error::element_not_found(selector))
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.shared.record(Action::PressKey {
            page: self.id,
            key: key.to_string(),
        });
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        self.shared.record(Action::SetCookie {
            page: self.id,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }
}

// ============================================================================
// Test Logging
// ============================================================================

/// Installs the test tracing subscriber. Repeated calls are no-ops.
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
