//! Session orchestrator for Play-with-Docker.
//!
//! [`Crawler`] drives the full login/session/command flow on top of a
//! [`Session`]: open the landing page, authenticate with one of two
//! mutually exclusive strategies, wait for the logged-in marker, start a
//! workspace session, provision instances, and type commands into the
//! embedded terminal.
//!
//! The external driver invokes operations in a fixed order:
//!
//! ```ignore
//! use pwd_crawler::{Crawler, CdpEngine, Site, UserInfo};
//!
//! let mut crawler = Crawler::<CdpEngine>::initialize(&options, Site::default()).await?;
//! crawler.login_with_password(&UserInfo::new("user", "secret")).await?;
//! while !crawler.check_login_status().await? {
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//! }
//! crawler.start_session().await?;
//! let domain = crawler.add_instance().await?;
//! crawler.enter_command("echo hello\nuname -a").await?;
//! ```
//!
//! # Login-page handshake
//!
//! Password login makes the target site open the identity provider in a
//! page the crawler never asked for. The flow clicks the provider link,
//! then awaits the engine's page-created channel, skipping pages whose URL
//! does not start with the configured login origin. The filter is a URL
//! prefix match, not a navigation-intent match: if several qualifying
//! pages appear in one login window, the first wins.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::UserInfo;
use crate::engine::{ENTER, Engine, LaunchOptions, Page};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::site::Site;

// ============================================================================
// Constants
// ============================================================================

/// Registry name of the landing page.
const PWD_PAGE: &str = "pwd";

/// Registry name of the workspace session page.
const SESSION_PAGE: &str = "session";

/// Registry name of the identity provider's login page.
const LOGIN_PAGE: &str = "login";

/// Prefix stripped from captured connection strings.
const SSH_PREFIX: &str = "ssh ";

/// Per-call wait for the logged-in marker; expiry is a benign false.
const LOGIN_MARKER_TIMEOUT: Duration = Duration::from_secs(3);

/// Wait for the identity provider's page to be created.
const LOGIN_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait for an expected element.
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between session-URL polls.
const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// SessionInfo
// ============================================================================

/// Active workspace session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// URL of the workspace session page.
    pub session_url: String,

    /// Connection domains of provisioned instances, in provisioning
    /// order. Append-only.
    pub instance_domain_list: Vec<String>,
}

// ============================================================================
// Crawler
// ============================================================================

/// Orchestrates one unattended Play-with-Docker run.
pub struct Crawler<E: Engine> {
    /// Browser session and page registry.
    session: Session<E>,

    /// Selector/URL coupling table.
    site: Site,

    /// Standing page-created subscription.
    page_events: UnboundedReceiver<E::Page>,

    /// Monotonic: once true, both login entry points become no-ops.
    logged_in: bool,

    /// Present once a workspace session is active.
    session_info: Option<SessionInfo>,
}

impl<E: Engine> std::fmt::Debug for Crawler<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("site", &self.site)
            .field("logged_in", &self.logged_in)
            .field("session_info", &self.session_info)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Crawler - Construction
// ============================================================================

impl<E: Engine> Crawler<E> {
    /// Launches the browser and opens the landing page under `pwd`.
    ///
    /// # Errors
    ///
    /// Launch or navigation failure here is fatal for the run.
    pub async fn initialize(options: &LaunchOptions, site: Site) -> Result<Self> {
        let session = Session::launch(options).await?;
        Self::bootstrap(session, site).await
    }

    /// Builds the crawler on an existing session.
    ///
    /// # Errors
    ///
    /// Returns an error if the site table is invalid, the page-created
    /// subscription was already taken, or the landing page cannot be
    /// opened.
    pub async fn bootstrap(mut session: Session<E>, site: Site) -> Result<Self> {
        site.validate()?;
        let page_events = session
            .take_page_events()
            .ok_or_else(|| Error::config("page-created subscription already taken"))?;

        session.open_page(PWD_PAGE, &site.urls.landing).await?;
        info!(pages = ?session.page_urls().await?, "Crawler initialized");

        Ok(Self {
            session,
            site,
            page_events,
            logged_in: false,
            session_info: None,
        })
    }
}

// ============================================================================
// Crawler - Accessors
// ============================================================================

impl<E: Engine> Crawler<E> {
    /// Returns `true` once a login has been confirmed.
    #[inline]
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Returns the active workspace session, if any.
    #[inline]
    #[must_use]
    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session_info.as_ref()
    }

    /// Returns the underlying automation session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session<E> {
        &self.session
    }
}

// ============================================================================
// Crawler - Login
// ============================================================================

impl<E: Engine> Crawler<E> {
    /// Logs in by injecting the session cookie and reloading the landing
    /// page.
    ///
    /// A second call after login is confirmed is an informational no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPage`] if the landing page is not
    /// registered.
    pub async fn login_with_cookie(&mut self, value: &str) -> Result<()> {
        if self.logged_in {
            info!("Already logged in, ignoring cookie login");
            return Ok(());
        }
        info!("Logging in with session cookie");

        let page = self.session.page(PWD_PAGE)?;
        page.set_cookie(&self.site.urls.cookie_name, value).await?;
        page.reload().await?;
        Ok(())
    }

    /// Logs in by typing credentials into the identity provider's login
    /// page.
    ///
    /// Opens the provider via the landing-page dropdown, awaits the page
    /// the site creates, and types id and password into it. A second call
    /// after login is confirmed is an informational no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] before any UI interaction if
    /// either field is empty, [`Error::Timeout`] if no qualifying page
    /// appears within the login window, [`Error::EngineTerminated`] if
    /// the page-created stream ends while waiting.
    pub async fn login_with_password(&mut self, user: &UserInfo) -> Result<()> {
        if self.logged_in {
            info!("Already logged in, ignoring password login");
            return Ok(());
        }
        if user.id.is_empty() {
            return Err(Error::missing_credential("id"));
        }
        if user.password.is_empty() {
            return Err(Error::missing_credential("password"));
        }
        info!("Logging in with password");

        {
            let page = self.session.page(PWD_PAGE)?;
            page.click(&self.site.selectors.login_dropdown).await?;
            page.click(&self.site.selectors.login_provider_link).await?;
        }

        let login_page = self.wait_for_login_page().await?;
        self.session.registry_mut().insert(LOGIN_PAGE, login_page);
        let submitted = self.submit_credentials(user).await;
        self.session.registry_mut().remove(LOGIN_PAGE);
        submitted
    }

    /// Checks whether the logged-in marker is visible on the landing
    /// page.
    ///
    /// A marker that has not appeared within one call's timeout is a
    /// normal negative result, not an error; the driver owns the retry
    /// cadence. Once confirmed, the state is monotonic and later calls
    /// return `true` without touching the page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPage`] if the landing page is not
    /// registered, or any non-timeout engine error.
    pub async fn check_login_status(&mut self) -> Result<bool> {
        if !self.logged_in {
            let page = self.session.page(PWD_PAGE)?;
            let marker = &self.site.selectors.login_success_marker;
            match page.wait_for(marker, LOGIN_MARKER_TIMEOUT).await {
                Ok(()) => self.logged_in = true,
                Err(e) if e.is_timeout() => {
                    debug!("Login marker not visible yet");
                }
                Err(e) => return Err(e),
            }
        }
        debug!(logged_in = self.logged_in, "Login status checked");
        Ok(self.logged_in)
    }

    /// Awaits the page-created channel until a page on the login origin
    /// appears. Pages created for any other reason are ignored.
    async fn wait_for_login_page(&mut self) -> Result<E::Page> {
        let origin = &self.site.urls.login_origin;
        let events = &mut self.page_events;

        let capture = async {
            while let Some(page) = events.recv().await {
                let url = page.url().await.unwrap_or_default();
                if url.starts_with(origin) {
                    debug!(url = %url, "Login page captured");
                    return Some(page);
                }
                debug!(url = %url, "Ignoring unrelated page");
            }
            None
        };

        match timeout(LOGIN_PAGE_TIMEOUT, capture).await {
            Ok(Some(page)) => Ok(page),
            Ok(None) => Err(Error::EngineTerminated),
            Err(_) => Err(Error::timeout(
                "wait for login page",
                LOGIN_PAGE_TIMEOUT.as_millis() as u64,
            )),
        }
    }

    /// Types id and password into the registered login page.
    async fn submit_credentials(&self, user: &UserInfo) -> Result<()> {
        let selectors = &self.site.selectors;
        let page = self.session.page(LOGIN_PAGE)?;

        page.wait_for(&selectors.username_field, ELEMENT_TIMEOUT).await?;
        page.type_text(&selectors.username_field, &user.id).await?;
        page.wait_for(&selectors.username_submit, ELEMENT_TIMEOUT).await?;
        page.click(&selectors.username_submit).await?;

        page.wait_for(&selectors.password_field, ELEMENT_TIMEOUT).await?;
        page.type_text(&selectors.password_field, &user.password).await?;
        page.wait_for(&selectors.password_submit, ELEMENT_TIMEOUT).await?;
        page.click(&selectors.password_submit).await?;

        Ok(())
    }
}

// ============================================================================
// Crawler - Session & Instances
// ============================================================================

impl<E: Engine> Crawler<E> {
    /// Starts a workspace session.
    ///
    /// Clicks the start control and polls the page URL once a second,
    /// without an upper bound, until it reaches the session prefix. On
    /// success the landing page is re-registered under `session` and an
    /// empty [`SessionInfo`] is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfCapacity`] after force-closing the browser
    /// if the out-of-capacity page is reached instead. Not retried.
    pub async fn start_session(&mut self) -> Result<()> {
        info!("Starting workspace session");
        self.session
            .page(PWD_PAGE)?
            .click(&self.site.selectors.start_session_button)
            .await?;

        let session_url = loop {
            let url = self.session.page(PWD_PAGE)?.url().await?;
            if url.starts_with(&self.site.urls.session_prefix) {
                break url;
            }
            if url.starts_with(&self.site.urls.out_of_capacity_prefix) {
                warn!(url = %url, "Out of capacity, closing browser");
                self.session.close().await?;
                return Err(Error::out_of_capacity(url));
            }
            sleep(SESSION_POLL_INTERVAL).await;
        };

        info!(session_url = %session_url, "Workspace session active");
        self.session.registry_mut().rename(PWD_PAGE, SESSION_PAGE)?;
        self.session_info = Some(SessionInfo {
            session_url,
            instance_domain_list: Vec::new(),
        });
        Ok(())
    }

    /// Provisions one compute instance and records its connection domain.
    ///
    /// Repeatable; each call appends exactly one entry to
    /// [`SessionInfo::instance_domain_list`] and never mutates prior
    /// entries. Returns the captured domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPage`] if no session page is registered,
    /// [`Error::SessionNotStarted`] if no session record exists.
    pub async fn add_instance(&mut self) -> Result<String> {
        let selectors = &self.site.selectors;
        let page = self.session.page(SESSION_PAGE)?;

        page.wait_for(&selectors.add_instance_button, ELEMENT_TIMEOUT).await?;
        page.click(&selectors.add_instance_button).await?;

        page.wait_for(&selectors.connection_string_field, ELEMENT_TIMEOUT).await?;
        let raw = page.read_value(&selectors.connection_string_field).await?;
        let domain = raw.strip_prefix(SSH_PREFIX).unwrap_or(&raw).to_string();

        let session_info = self.session_info.as_mut().ok_or(Error::SessionNotStarted)?;
        session_info.instance_domain_list.push(domain.clone());
        info!(
            domain = %domain,
            count = session_info.instance_domain_list.len(),
            "Instance provisioned"
        );
        Ok(domain)
    }

    /// Types a block of newline-separated commands into the terminal.
    ///
    /// Synthesizes one key press per character and one Enter press per
    /// line; newline characters are line delimiters only and are never
    /// typed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPage`] if no session page is registered.
    pub async fn enter_command(&self, command: &str) -> Result<()> {
        let page = self.session.page(SESSION_PAGE)?;
        let terminal = &self.site.selectors.terminal;

        page.wait_for(terminal, ELEMENT_TIMEOUT).await?;
        page.click(terminal).await?;

        for line in command.split('\n') {
            debug!(len = line.len(), "Typing command line");
            let mut buf = [0u8; 4];
            for ch in line.chars() {
                page.press_key(ch.encode_utf8(&mut buf)).await?;
            }
            page.press_key(ENTER).await?;
        }
        Ok(())
    }

    /// Closes the browser.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if the browser is already closed.
    pub async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }
}

// ============================================================================
// Tests
// ============================================================================
