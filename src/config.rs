//! Credential and launch configuration.
//!
//! The external driver builds a [`Config`] once at startup and passes it
//! into the crawler; the core never reads process environment on its own.
//!
//! # Example
//!
//! ```ignore
//! use pwd_crawler::Config;
//!
//! let config = Config::from_env()?;
//! let options = config.launch_options();
//! ```
//!
//! # Environment contract
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `NAME` | Process/log name (default `PWDCrawler`) |
//! | `HEADLESS` | Run the browser without a GUI |
//! | `DEV_TOOL` | Open devtools on startup |
//! | `ACCOUNT_ID` / `ACCOUNT_PASSWORD` | Password login strategy |
//! | `ACCOUNT_COOKIE` | Cookie login strategy |
//!
//! Exactly one login strategy must be configured.

// ============================================================================
// Imports
// ============================================================================

use std::env;

use crate::engine::LaunchOptions;
use crate::error::{Error, Result};

// ============================================================================
// UserInfo
// ============================================================================

/// Password-strategy credential pair.
///
/// Held only long enough to complete the login submission; the crawler
/// borrows it for the call and never stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    /// Account id (Docker ID).
    pub id: String,
    /// Account password.
    pub password: String,
}

impl UserInfo {
    /// Creates a credential pair.
    #[inline]
    pub fn new(id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Login strategy for the run.
///
/// Exactly one strategy is used per run; requiring both is a configuration
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Type id and password into the identity provider's login form.
    Password(UserInfo),

    /// Inject an opaque session cookie and reload.
    Cookie {
        /// The cookie value identifying the session.
        value: String,
    },
}

impl Credentials {
    /// Returns `true` if this is the cookie strategy.
    #[inline]
    #[must_use]
    pub fn is_cookie(&self) -> bool {
        matches!(self, Self::Cookie { .. })
    }
}

// ============================================================================
// Config
// ============================================================================

/// Run configuration, constructed by the external driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Process/log name.
    pub name: String,

    /// Run the browser without a GUI.
    pub headless: bool,

    /// Open devtools on startup.
    pub devtools: bool,

    /// Login strategy.
    pub credentials: Credentials,
}

impl Config {
    /// Builds the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if neither or both login strategies are
    /// configured, or if the password strategy is missing a field.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Separated from [`Config::from_env`] so tests never mutate process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same contract as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let id = lookup("ACCOUNT_ID");
        let password = lookup("ACCOUNT_PASSWORD");
        let cookie = lookup("ACCOUNT_COOKIE");

        let credentials = match (id, password, cookie) {
            (None, None, Some(value)) => Credentials::Cookie { value },
            (Some(id), Some(password), None) => Credentials::Password(UserInfo { id, password }),
            (Some(_) | None, Some(_) | None, Some(_)) => {
                return Err(Error::config(
                    "set ACCOUNT_ID and ACCOUNT_PASSWORD or ACCOUNT_COOKIE, not both",
                ));
            }
            (Some(_), None, None) => {
                return Err(Error::config("ACCOUNT_PASSWORD is not set"));
            }
            (None, Some(_), None) => {
                return Err(Error::config("ACCOUNT_ID is not set"));
            }
            (None, None, None) => {
                return Err(Error::config(
                    "set ACCOUNT_ID and ACCOUNT_PASSWORD or ACCOUNT_COOKIE",
                ));
            }
        };

        Ok(Self {
            name: lookup("NAME").unwrap_or_else(|| "PWDCrawler".to_string()),
            headless: flag(lookup("HEADLESS")),
            devtools: flag(lookup("DEV_TOOL")),
            credentials,
        })
    }

    /// Derives engine launch options from this configuration.
    #[must_use]
    pub fn launch_options(&self) -> LaunchOptions {
        let mut options = LaunchOptions::new().with_name(&self.name);
        if self.headless {
            options = options.with_headless();
        }
        if self.devtools {
            options = options.with_devtools();
        }
        options
    }
}

/// Interprets an environment flag: set and non-empty, not `0`/`false`.
fn flag(value: Option<String>) -> bool {
    match value {
        Some(v) => !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"),
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_cookie_strategy() {
        let config = Config::from_lookup(lookup_from(&[("ACCOUNT_COOKIE", "abc123")])).unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Cookie {
                value: "abc123".to_string()
            }
        );
        assert!(config.credentials.is_cookie());
        assert_eq!(config.name, "PWDCrawler");
    }

    #[test]
    fn test_password_strategy() {
        let config = Config::from_lookup(lookup_from(&[
            ("ACCOUNT_ID", "user"),
            ("ACCOUNT_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Password(UserInfo::new("user", "hunter2"))
        );
    }

    #[test]
    fn test_no_strategy_rejected() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_both_strategies_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("ACCOUNT_ID", "user"),
            ("ACCOUNT_PASSWORD", "hunter2"),
            ("ACCOUNT_COOKIE", "abc123"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_partial_password_strategy_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ACCOUNT_ID", "user")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_flags_and_name() {
        let config = Config::from_lookup(lookup_from(&[
            ("ACCOUNT_COOKIE", "abc"),
            ("NAME", "worker-3"),
            ("HEADLESS", "1"),
            ("DEV_TOOL", "false"),
        ]))
        .unwrap();
        assert_eq!(config.name, "worker-3");
        assert!(config.headless);
        assert!(!config.devtools);
    }

    #[test]
    fn test_launch_options_derivation() {
        let config = Config::from_lookup(lookup_from(&[
            ("ACCOUNT_COOKIE", "abc"),
            ("HEADLESS", "true"),
        ]))
        .unwrap();
        let options = config.launch_options();
        assert!(options.headless);
        assert!(!options.devtools);
        assert_eq!(options.name, "PWDCrawler");
    }
}
