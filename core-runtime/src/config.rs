//! # Portal Configuration Module
//!
//! Provides configuration management for the portal client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `PortalConfig`
//! instance that holds all necessary dependencies and settings for the client.
//! It enforces fail-fast validation to ensure all required bridges are provided
//! before initialization.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - Required for credential persistence
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `Navigator` - Login redirect on session expiry (default: no-op)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `HttpClient` and `SecureStore` are injected automatically if not provided.
//!
//! ## Usage
//!
//! ### Basic Configuration with Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::PortalConfig;
//!
//! let config = PortalConfig::builder()
//!     .base_url("https://portal.example.com/api")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::PortalConfig;
//! use std::sync::Arc;
//!
//! let config = PortalConfig::builder()
//!     .base_url("https://portal.example.com/api")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .navigator(Arc::new(MyNavigator))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable error
//! messages when capabilities are missing.

use crate::error::{Error, Result};
use bridge_traits::navigate::NoopNavigator;
use bridge_traits::{HttpClient, Navigator, SecureStore};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Portal configuration for the client core.
///
/// This struct holds all dependencies and settings required to initialize
/// the client. Use [`PortalConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct PortalConfig {
    /// Base URL of the portal API (e.g., "https://portal.example.com/api")
    pub base_url: Url,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// HTTP client for making API requests (optional with desktop default)
    pub http_client: Arc<dyn HttpClient>,

    /// Secure credential storage (required)
    pub secure_store: Arc<dyn SecureStore>,

    /// Routing capability used on session expiry (default: no-op)
    pub navigator: Arc<dyn Navigator>,

    /// Buffer size for the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("navigator", &"Navigator { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl PortalConfig {
    /// Creates a new builder for constructing a `PortalConfig`.
    pub fn builder() -> PortalConfigBuilder {
        PortalConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL uses http or https
    /// - Event buffer size is reasonable
    pub fn validate(&self) -> Result<()> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "Base URL must use http or https, got '{}'",
                    other
                )));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Other hosts: inject platform-native secure storage."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for API access. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native HTTP transport."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`PortalConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](PortalConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct PortalConfigBuilder {
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    event_buffer_size: Option<usize>,
}

impl PortalConfigBuilder {
    /// Sets the portal API base URL (required).
    ///
    /// A trailing slash is accepted and normalized away.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled. The client's cookie jar must
    /// persist across requests for session renewal to work.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// The secure store is used for persisting session credentials across
    /// restarts. It must provide platform-appropriate security
    /// (Keychain on macOS, Credential Manager on Windows, etc.).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the navigator implementation (optional).
    ///
    /// The navigator is invoked when the session becomes unrecoverable, to
    /// route the user back to the login entry point. Defaults to a no-op.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `PortalConfig` instance.
    ///
    /// This validates all required dependencies are provided and returns
    /// an error with an actionable message if anything is missing.
    ///
    /// # Returns
    ///
    /// Returns `Ok(PortalConfig)` on success, or an error if:
    /// - The base URL is missing or unparseable
    /// - Required bridges are missing (SecureStore, HttpClient without
    ///   desktop defaults)
    pub fn build(self) -> Result<PortalConfig> {
        let raw_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;

        let base_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw_url, e)))?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(NoopNavigator));

        let config = PortalConfig {
            base_url,
            request_timeout,
            http_client,
            secure_store,
            navigator,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
