//! # Core Configuration Module
//!
//! Provides configuration management for the wiki mirror core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding both site connections, the title cache location and the public link
//! layout. Validation is fail-fast: a missing credential or a malformed API URL
//! is reported at build time with an actionable message instead of surfacing
//! as a login failure halfway through a batch.
//!
//! ## Required Settings
//!
//! - Source site (`SiteConfig`) - authoritative wiki
//! - Destination site (`SiteConfig`) - mirror that receives writes
//! - Database path - SQLite file holding the title index
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest with cookie store)
//! - `Clock` - time source for poll windows (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SiteConfig};
//!
//! let config = CoreConfig::builder()
//!     .source(SiteConfig::from_env("SOURCE")?)
//!     .destination(SiteConfig::from_env("MIRROR")?)
//!     .database_path("/var/lib/wiki-mirror/titles.db")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// User agent sent to both sites unless overridden.
pub const DEFAULT_USER_AGENT: &str = "OniSyncBot/1.0 (https://klei.vip; Charles@klei.vip)";

/// Length of the incremental poll window.
pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_secs(3 * 60 * 60);

/// How long a disambiguation prompt waits for a reply.
pub const DEFAULT_DISAMBIGUATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for one wiki site.
#[derive(Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Display name used in logs and messages
    pub name: String,

    /// Full URL of the site's `api.php`
    pub api_url: String,

    /// Bot-password user name (`User@BotName`)
    pub username: String,

    pub password: String,

    /// Value for the `X-authkey` header some hosts require
    pub auth_key: Option<String>,

    pub user_agent: String,
}

impl std::fmt::Debug for SiteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteConfig")
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_key", &self.auth_key.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl SiteConfig {
    pub fn new(name: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_url: api_url.into(),
            username: String::new(),
            password: String::new(),
            auth_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Loads a site from `{PREFIX}_API_URL`, `{PREFIX}_USERNAME`,
    /// `{PREFIX}_PASSWORD` and the optional `{PREFIX}_NAME`,
    /// `{PREFIX}_AUTH_KEY`, `{PREFIX}_USER_AGENT` environment variables.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            lookup(&format!("{}_{}", prefix, suffix)).filter(|value| !value.trim().is_empty())
        };
        let required = |suffix: &str| {
            var(suffix).ok_or_else(|| {
                Error::Config(format!(
                    "Environment variable {}_{} is required",
                    prefix, suffix
                ))
            })
        };

        let mut site = SiteConfig::new(
            var("NAME").unwrap_or_else(|| prefix.to_lowercase()),
            required("API_URL")?,
        )
        .with_credentials(required("USERNAME")?, required("PASSWORD")?);

        if let Some(key) = var("AUTH_KEY") {
            site = site.with_auth_key(key);
        }
        if let Some(agent) = var("USER_AGENT") {
            site = site.with_user_agent(agent);
        }

        site.validate()?;
        Ok(site)
    }

    /// Checks that the site can be logged into.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("Site name cannot be empty".to_string()));
        }

        if !(self.api_url.starts_with("https://") || self.api_url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Site {} has invalid API URL '{}': expected an http(s) URL to api.php",
                self.name, self.api_url
            )));
        }

        if self.username.is_empty() || self.password.is_empty() {
            return Err(Error::Config(format!(
                "Site {} is missing credentials. Use .with_credentials() with a bot password.",
                self.name
            )));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config(format!(
                "Site {} has an empty user agent",
                self.name
            )));
        }

        Ok(())
    }
}

/// Layout of the public links handed out for cached titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Short-link domain, e.g. `klei.vip`
    pub domain: String,

    /// Host and path prefix of the source site's article URLs
    pub source_site: String,

    /// Host and path prefix of the mirror's article URLs
    pub mirror_site: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            domain: "klei.vip".to_string(),
            source_site: "oxygennotincluded.wiki.gg/zh".to_string(),
            mirror_site: "wiki.biligame.com/oni".to_string(),
        }
    }
}

/// Core configuration for the wiki mirror.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Authoritative site
    pub source: SiteConfig,

    /// Mirror site receiving writes
    pub destination: SiteConfig,

    /// Path to the SQLite title index
    pub database_path: PathBuf,

    pub links: LinkConfig,

    /// How far back the incremental poll looks
    pub poll_window: Duration,

    pub disambiguation_timeout: Duration,

    /// HTTP client shared by both site sessions (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Time source (optional, defaults to the system clock)
    pub clock: Option<Arc<dyn Clock>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("database_path", &self.database_path)
            .field("links", &self.links)
            .field("poll_window", &self.poll_window)
            .field("disambiguation_timeout", &self.disambiguation_timeout)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("clock", &self.clock.as_ref().map(|_| "Clock { ... }"))
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Both sites are valid and distinct
    /// - Database path is not empty
    /// - Durations are non-zero
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.destination.validate()?;

        if self.source.api_url == self.destination.api_url {
            return Err(Error::Config(format!(
                "Source and destination point at the same API ({}); refusing to mirror a site onto itself",
                self.source.api_url
            )));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.links.domain.trim().is_empty() {
            return Err(Error::Config("Link domain cannot be empty".to_string()));
        }

        if self.poll_window.is_zero() {
            return Err(Error::Config(
                "Poll window must be greater than zero".to_string(),
            ));
        }

        if self.disambiguation_timeout.is_zero() {
            return Err(Error::Config(
                "Disambiguation timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The injected HTTP client, or the desktop default when available.
    pub fn http_client_or_default(&self) -> Result<Arc<dyn HttpClient>> {
        match &self.http_client {
            Some(client) => Ok(client.clone()),
            None => provide_default_http_client(&self.source.user_agent),
        }
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(user_agent: &str) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_options(user_agent, Duration::from_secs(60))
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_user_agent: &str) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Enable the 'desktop-shims' feature to use the default reqwest client \
                 or inject one with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    source: Option<SiteConfig>,
    destination: Option<SiteConfig>,
    database_path: Option<PathBuf>,
    links: Option<LinkConfig>,
    poll_window: Option<Duration>,
    disambiguation_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    pub fn source(mut self, site: SiteConfig) -> Self {
        self.source = Some(site);
        self
    }

    pub fn destination(mut self, site: SiteConfig) -> Self {
        self.destination = Some(site);
        self
    }

    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn links(mut self, links: LinkConfig) -> Self {
        self.links = Some(links);
        self
    }

    /// Sets the incremental poll window. Default: 3 hours.
    pub fn poll_window(mut self, window: Duration) -> Self {
        self.poll_window = Some(window);
        self
    }

    /// Sets how long disambiguation waits for a reply. Default: 10 seconds.
    pub fn disambiguation_timeout(mut self, timeout: Duration) -> Self {
        self.disambiguation_timeout = Some(timeout);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig`, validating every field.
    pub fn build(self) -> Result<CoreConfig> {
        let source = self.source.ok_or_else(|| {
            Error::Config("Source site is required. Use .source() to set it.".to_string())
        })?;

        let destination = self.destination.ok_or_else(|| {
            Error::Config(
                "Destination site is required. Use .destination() to set it.".to_string(),
            )
        })?;

        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = CoreConfig {
            source,
            destination,
            database_path,
            links: self.links.unwrap_or_default(),
            poll_window: self.poll_window.unwrap_or(DEFAULT_POLL_WINDOW),
            disambiguation_timeout: self
                .disambiguation_timeout
                .unwrap_or(DEFAULT_DISAMBIGUATION_TIMEOUT),
            http_client: self.http_client,
            clock: self.clock,
        };

        config.validate()?;

        Ok(config)
    }
}
