//! chromiumoxide-backed automation engine.
//!
//! Wraps one Chromium process behind the [`Engine`]/[`Page`] traits:
//! launch with headless/devtools options, selector waits as bounded
//! polling, key synthesis via `Input.dispatchKeyEvent`, cookie injection
//! via `Network.setCookie`.
//!
//! # New-page observation
//!
//! The CDP handler gives no ready-made push stream of attached `Page`
//! handles, so a watcher task diffs `browser.pages()` by target id on a
//! fixed interval and forwards fresh handles down the page-created
//! channel. Pages this engine opens itself are reported too, matching the
//! behavior of browser-level target-created notifications; subscribers
//! filter by URL.

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::ReloadParams;
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::{Engine, LaunchOptions, Page};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Interval between selector-wait polls.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Interval between new-target scans.
const TARGET_WATCH_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// CdpEngine
// ============================================================================

/// One Chromium process driven over the DevTools protocol.
pub struct CdpEngine {
    /// Browser handle, shared with the target watcher.
    browser: Arc<Mutex<Browser>>,

    /// The browser's initial blank page, reused by the first open.
    free_page: Option<CdpPage>,

    /// Standing page-created subscription, until taken.
    events: Option<UnboundedReceiver<CdpPage>>,

    /// CDP message pump.
    handler_task: JoinHandle<()>,

    /// New-target scanner feeding the page-created channel.
    watcher_task: JoinHandle<()>,
}

#[async_trait]
impl Engine for CdpEngine {
    type Page = CdpPage;

    async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if options.devtools {
            builder = builder.arg("--auto-open-devtools-for-tabs");
        }
        let config = builder.build().map_err(Error::launch_failed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::launch_failed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let initial = browser.pages().await.unwrap_or_default();
        let seen: HashSet<TargetId> = initial.iter().map(|p| p.target_id().clone()).collect();
        let free_page = initial.into_iter().next().map(CdpPage::new);

        let browser = Arc::new(Mutex::new(browser));
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher_task = tokio::spawn(watch_new_targets(Arc::clone(&browser), seen, tx));

        info!(name = %options.name, headless = options.headless, "Browser launched");

        Ok(Self {
            browser,
            free_page,
            events: Some(rx),
            handler_task,
            watcher_task,
        })
    }

    async fn open_page(&mut self) -> Result<Option<Self::Page>> {
        if let Some(page) = self.free_page.take() {
            debug!("Reusing initial blank page");
            return Ok(Some(page));
        }
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(Some(CdpPage::new(page)))
    }

    fn take_page_events(&mut self) -> Option<UnboundedReceiver<Self::Page>> {
        self.events.take()
    }

    async fn close(&mut self) -> Result<()> {
        info!("Closing browser");
        self.watcher_task.abort();
        {
            let mut browser = self.browser.lock().await;
            browser.close().await?;
            let _ = browser.wait().await;
        }
        self.handler_task.abort();
        Ok(())
    }
}

// ============================================================================
// Target Watcher
// ============================================================================

/// Scans for targets that were not present at the previous tick and
/// forwards their page handles. Exits when the subscription is dropped or
/// the browser stops answering.
async fn watch_new_targets(
    browser: Arc<Mutex<Browser>>,
    mut seen: HashSet<TargetId>,
    tx: UnboundedSender<CdpPage>,
) {
    loop {
        sleep(TARGET_WATCH_INTERVAL).await;

        let pages = match browser.lock().await.pages().await {
            Ok(pages) => pages,
            Err(e) => {
                debug!(error = %e, "Target scan failed, stopping watcher");
                return;
            }
        };

        for page in pages {
            if seen.insert(page.target_id().clone()) {
                debug!(target_id = ?page.target_id(), "New page observed");
                if tx.send(CdpPage::new(page)).is_err() {
                    return;
                }
            }
        }
    }
}

// ============================================================================
// CdpPage
// ============================================================================

/// Handle to one Chromium page.
#[derive(Clone)]
pub struct CdpPage {
    inner: chromiumoxide::page::Page,
}

impl CdpPage {
    fn new(inner: chromiumoxide::page::Page) -> Self {
        Self { inner }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let visible: bool = self
            .inner
            .evaluate(visibility_check(selector))
            .await?
            .into_value()?;
        Ok(visible)
    }
}

/// Expression deciding whether the first match for `selector` is rendered:
/// a non-empty bounding box and not `visibility: hidden`.
fn visibility_check(selector: &str) -> String {
    format!(
        "(() => {{ \
         const el = document.querySelector({selector:?}); \
         if (!el) return false; \
         const rect = el.getBoundingClientRect(); \
         if (rect.width === 0 || rect.height === 0) return false; \
         return window.getComputedStyle(el).visibility !== 'hidden'; \
         }})()"
    )
}

#[async_trait]
impl Page for CdpPage {
    async fn url(&self) -> Result<String> {
        Ok(self.inner.url().await?.unwrap_or_default())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating");
        self.inner.goto(url).await?;
        self.inner.wait_for_navigation().await?;
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        debug!("Reloading page");
        self.inner.execute(ReloadParams::default()).await?;
        self.inner.wait_for_navigation().await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            // Existence alone is not enough: a matched node that is
            // display:none or zero-sized must keep the wait polling.
            if self.inner.find_element(selector).await.is_ok()
                && self.is_visible(selector).await.unwrap_or(false)
            {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(
                    format!("wait_for({selector})"),
                    timeout.as_millis() as u64,
                ));
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        debug!(selector = %selector, "Clicking");
        self.inner
            .find_element(selector)
            .await
            .map_err(|_| Error::element_not_found(selector))?
            .click()
            .await?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        debug!(selector = %selector, len = text.len(), "Typing into element");
        self.inner
            .find_element(selector)
            .await
            .map_err(|_| Error::element_not_found(selector))?
            .click()
            .await?
            .type_str(text)
            .await?;
        Ok(())
    }

    async fn read_value(&self, selector: &str) -> Result<String> {
        let expr = format!("document.querySelector({selector:?})?.value ?? ''");
        let value: String = self.inner.evaluate(expr).await?.into_value()?;
        Ok(value)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let mut chars = key.chars();
        let printable = matches!((chars.next(), chars.next()), (Some(_), None));

        if printable {
            // Single character: a Char event carries the text directly.
            let params = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(key)
                .build()
                .map_err(Error::config)?;
            self.inner.execute(params).await?;
        } else {
            // Named key: down then up.
            let down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .key(key)
                .build()
                .map_err(Error::config)?;
            self.inner.execute(down).await?;

            let up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .key(key)
                .build()
                .map_err(Error::config)?;
            self.inner.execute(up).await?;
        }
        Ok(())
    }

    async fn set_cookie(&self, name: &str, value: &str) -> Result<()> {
        let url = self.inner.url().await?.unwrap_or_default();
        debug!(cookie = %name, url = %url, "Injecting cookie");
        let param = CookieParam::builder()
            .name(name)
            .value(value)
            .url(url)
            .build()
            .map_err(Error::config)?;
        self.inner.set_cookies(vec![param]).await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
