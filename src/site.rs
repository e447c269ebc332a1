//! Target-site coupling: selectors and URLs.
//!
//! Every literal CSS selector and URL the crawler depends on lives here,
//! keyed by semantic role. This is the one surface tied to a specific
//! version of the target site; the state machine itself never embeds a
//! literal string.
//!
//! # Example
//!
//! ```ignore
//! use pwd_crawler::Site;
//!
//! let site = Site::default();          // Play-with-Docker literals
//! site.validate()?;
//! assert_eq!(site.urls.cookie_name, "id");
//! ```
//!
//! A driver may also deserialize an alternate table (e.g. after a site
//! redesign) instead of recompiling.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Selectors
// ============================================================================

/// CSS selectors keyed by semantic role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    /// Marker that becomes visible on the landing page once logged in.
    pub login_success_marker: String,

    /// Dropdown toggle that reveals the identity-provider link.
    pub login_dropdown: String,

    /// Identity-provider link inside the dropdown.
    pub login_provider_link: String,

    /// Control that starts a workspace session.
    pub start_session_button: String,

    /// Control that provisions a new compute instance.
    pub add_instance_button: String,

    /// Input field holding the generated connection string.
    pub connection_string_field: String,

    /// Terminal focus region on the session page.
    pub terminal: String,

    /// Username field on the identity provider's login page.
    pub username_field: String,

    /// Submit button for the username step.
    pub username_submit: String,

    /// Password field on the identity provider's login page.
    pub password_field: String,

    /// Submit button for the password step.
    pub password_submit: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_success_marker: "a.btn-success".to_string(),
            login_dropdown: "#btnGroupDrop1".to_string(),
            login_provider_link: "a.dropdown-item.ng-binding.ng-scope".to_string(),
            start_session_button: "a.btn-success".to_string(),
            add_instance_button: "button.md-primary.md-button.md-ink-ripple".to_string(),
            connection_string_field: "input#input_3.md-input".to_string(),
            terminal: "div.xterm-accessibility".to_string(),
            username_field: "#username".to_string(),
            username_submit: "button._button-login-id".to_string(),
            password_field: "#password".to_string(),
            password_submit: "button._button-login-password".to_string(),
        }
    }
}

// ============================================================================
// SiteUrls
// ============================================================================

/// URLs and URL prefixes of the target site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteUrls {
    /// Landing page opened at initialization.
    pub landing: String,

    /// URL prefix a page reaches once a workspace session is active.
    pub session_prefix: String,

    /// URL prefix signalling the remote service is out of capacity.
    pub out_of_capacity_prefix: String,

    /// Origin of the identity provider's login pages.
    ///
    /// Newly created pages are matched against this prefix; anything else
    /// is ignored.
    pub login_origin: String,

    /// Name of the session-identifying cookie.
    pub cookie_name: String,
}

impl Default for SiteUrls {
    fn default() -> Self {
        Self {
            landing: "https://labs.play-with-docker.com/".to_string(),
            session_prefix: "https://labs.play-with-docker.com/p/".to_string(),
            out_of_capacity_prefix: "https://labs.play-with-docker.com/ooc".to_string(),
            login_origin: "https://login.docker.com/".to_string(),
            cookie_name: "id".to_string(),
        }
    }
}

// ============================================================================
// Site
// ============================================================================

/// Complete site coupling table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// URLs and URL prefixes.
    pub urls: SiteUrls,

    /// CSS selectors keyed by role.
    pub selectors: Selectors,
}

impl Site {
    /// Validates the URL table.
    ///
    /// Selectors are opaque strings to this crate and are not checked;
    /// URLs must at least parse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid entry.
    pub fn validate(&self) -> Result<()> {
        for (role, value) in [
            ("landing", &self.urls.landing),
            ("session_prefix", &self.urls.session_prefix),
            ("out_of_capacity_prefix", &self.urls.out_of_capacity_prefix),
            ("login_origin", &self.urls.login_origin),
        ] {
            Url::parse(value)
                .map_err(|e| Error::config(format!("invalid {role} URL {value:?}: {e}")))?;
        }
        if self.urls.cookie_name.is_empty() {
            return Err(Error::config("cookie_name must not be empty"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
