//! # pwd-crawler
//!
//! Headless-browser orchestration for unattended [Play-with-Docker]
//! sessions: log in with a cookie or a password, wait for the login to be
//! confirmed, start a workspace session, provision instances, and type
//! shell commands into the embedded terminal.
//!
//! [Play-with-Docker]: https://labs.play-with-docker.com/
//!
//! ## Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`crawler`] | Session orchestrator and login/session state machine |
//! | [`session`] | Browser lifecycle and the named page registry |
//! | [`engine`] | Automation engine abstraction and the CDP implementation |
//! | [`site`] | Selector and URL coupling table for the target site |
//! | [`config`] | Environment-derived run configuration and credentials |
//! | [`error`] | Crate-wide error type and result alias |
//!
//! The orchestrator is generic over [`Engine`], so every state transition
//! is testable against a scripted in-memory engine; production runs use
//! [`CdpEngine`], which drives a real Chromium over the DevTools protocol.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pwd_crawler::{CdpEngine, Config, Crawler, Credentials, Result, Site};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let mut crawler =
//!         Crawler::<CdpEngine>::initialize(&config.launch_options(), Site::default()).await?;
//!
//!     match &config.credentials {
//!         Credentials::Cookie { value } => crawler.login_with_cookie(value).await?,
//!         Credentials::Password(user) => crawler.login_with_password(user).await?,
//!     }
//!     while !crawler.check_login_status().await? {
//!         tokio::time::sleep(Duration::from_secs(3)).await;
//!     }
//!
//!     crawler.start_session().await?;
//!     let domain = crawler.add_instance().await?;
//!     println!("instance ready at {domain}");
//!
//!     crawler.enter_command("docker run -d -p 80:80 nginx").await?;
//!     crawler.close().await
//! }
//! ```
//!
//! ## Configuration
//!
//! [`Config::from_env`] reads exactly one credential strategy from the
//! environment: `ACCOUNT_COOKIE`, or `ACCOUNT_ID` plus `ACCOUNT_PASSWORD`.
//! Supplying both strategies, or an incomplete one, is a configuration
//! error. `NAME`, `HEADLESS`, and `DEV_TOOL` are optional.

pub mod config;
pub mod crawler;
pub mod engine;
pub mod error;
pub mod session;
pub mod site;

pub use config::{Config, Credentials, UserInfo};
pub use crawler::{Crawler, SessionInfo};
pub use engine::cdp::{CdpEngine, CdpPage};
pub use engine::{ENTER, Engine, LaunchOptions, Page};
pub use error::{Error, Result};
pub use session::{PageRegistry, Session};
pub use site::{Selectors, Site, SiteUrls};
