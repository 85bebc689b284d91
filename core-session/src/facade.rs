//! Session Facade
//!
//! High-level entry point tying the store, renewal coordinator, and
//! authenticated client together. Hosts construct one [`SessionManager`]
//! from a [`PortalConfig`](core_runtime::config::PortalConfig) and drive
//! the whole session lifecycle through it.
//!
//! ## Example
//!
//! ```ignore
//! use core_runtime::config::PortalConfig;
//! use core_session::SessionManager;
//!
//! #[tokio::main]
//! async fn main() -> core_session::Result<()> {
//!     let config = PortalConfig::builder()
//!         .base_url("https://portal.example.com/api")
//!         .build()
//!         .expect("config");
//!
//!     let manager = SessionManager::new(&config);
//!     manager.hydrate().await;
//!
//!     if !manager.is_authenticated() {
//!         manager.login("student@example.com", "hunter2").await?;
//!     }
//!
//!     println!("signed in as {:?}", manager.current_user());
//!     Ok(())
//! }
//! ```

use crate::client::ApiClient;
use crate::error::{Result, SessionError};
use crate::refresh::RefreshCoordinator;
use crate::store::SessionStore;
use crate::types::{
    AuthResponse, LoginRequest, OtpResendRequest, OtpVerifyRequest, RegisterRequest, Session,
    SessionTokens, UserProfile,
};
use bridge_traits::http::HttpMethod;
use core_runtime::config::PortalConfig;
use core_runtime::events::{EventBus, PortalEvent, Receiver, SessionEvent};
use tracing::{info, instrument, warn};

/// Coordinates the authentication session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    store: SessionStore,
    events: EventBus,
}

impl SessionManager {
    /// Build a session manager and its collaborators from a portal
    /// configuration.
    ///
    /// The store starts empty; call [`hydrate`](Self::hydrate) to restore a
    /// persisted session from a previous run.
    pub fn new(config: &PortalConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let store = SessionStore::new(config.secure_store.clone());

        let refresh = std::sync::Arc::new(RefreshCoordinator::new(
            config.http_client.clone(),
            store.clone(),
            events.clone(),
            &config.base_url,
            config.request_timeout,
        ));

        let api = ApiClient::new(
            config.http_client.clone(),
            store.clone(),
            refresh,
            config.navigator.clone(),
            events.clone(),
            config.base_url.clone(),
            config.request_timeout,
        );

        Self { api, store, events }
    }

    /// Restore a persisted session, if one exists. Safe to call on every
    /// startup; failures leave the manager signed out.
    pub async fn hydrate(&self) {
        self.store.hydrate().await;
    }

    /// Authenticate with email and password.
    ///
    /// On success the session is stored (and persisted) and `SignedIn` is
    /// emitted. On failure nothing is stored and the server's message is
    /// surfaced when available.
    #[instrument(skip(self, password), fields(email = %core_runtime::logging::redact_if_sensitive("email", email)))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response: AuthResponse = match self.api.post_json("/login", &request).await {
            Ok(response) => response,
            Err(e) => return Err(self.report_auth_error(e)),
        };
        self.adopt_session(response).await
    }

    /// Create a new account. The server responds 201 and sends a one-time
    /// code for [`verify_otp`](Self::verify_otp) out of band.
    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        self.api.post("/register", request).await?;
        info!("Registration submitted");
        Ok(())
    }

    /// Verify a one-time code. A successful verification returns a full
    /// token set and is stored exactly like a login.
    #[instrument(skip(self, code), fields(email = %core_runtime::logging::redact_if_sensitive("email", email)))]
    pub async fn verify_otp(&self, email: &str, code: &str, purpose: &str) -> Result<Session> {
        let request = OtpVerifyRequest {
            email: email.to_string(),
            code: code.to_string(),
            purpose: purpose.to_string(),
        };

        let response: AuthResponse = match self.api.post_json("/otp/verify", &request).await {
            Ok(response) => response,
            Err(e) => return Err(self.report_auth_error(e)),
        };
        self.adopt_session(response).await
    }

    /// Ask the server to send a fresh one-time code.
    pub async fn resend_otp(&self, email: &str, purpose: &str) -> Result<()> {
        let request = OtpResendRequest {
            email: email.to_string(),
            purpose: purpose.to_string(),
        };

        self.api.post("/otp/resend", &request).await
    }

    /// Sign out.
    ///
    /// The server-side invalidation is best-effort: a failed `/logout` call
    /// is logged and ignored. The local session is always cleared, so the
    /// user ends up signed out no matter what the network does.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        match self.api.send(HttpMethod::Post, "/logout", None).await {
            Ok(response) if response.is_success() => {
                info!("Server-side logout confirmed");
            }
            Ok(response) => {
                warn!(status = response.status, "Server-side logout rejected");
            }
            Err(e) => {
                warn!(error = %e, "Server-side logout failed");
            }
        }

        self.store.clear().await;
        let _ = self.events.emit(PortalEvent::Session(SessionEvent::SignedOut));
    }

    /// Profile of the signed-in user, if any. Synchronous; reads the cache
    /// only.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.user()
    }

    /// Whether credentials are present. Their validity is decided by the
    /// server on the next request, not here.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// The authenticated API client, for feature modules layered on top.
    pub fn api_client(&self) -> &ApiClient {
        &self.api
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> Receiver<PortalEvent> {
        self.events.subscribe()
    }

    /// The underlying event bus.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    /// Announce a failed sign-in attempt to the host, then pass the error
    /// through. Rejected credentials and transport hiccups are retryable;
    /// a 403 is not.
    fn report_auth_error(&self, error: SessionError) -> SessionError {
        let recoverable = !matches!(error, SessionError::Forbidden { .. });
        let _ = self.events.emit(PortalEvent::Session(SessionEvent::AuthError {
            message: error.to_string(),
            recoverable,
        }));
        error
    }

    async fn adopt_session(&self, response: AuthResponse) -> Result<Session> {
        let user = response.user.ok_or_else(|| {
            SessionError::Serialization("token response carried no user profile".to_string())
        })?;

        let session = Session {
            tokens: SessionTokens::new(response.access_token, response.csrf_token),
            user,
        };

        self.store.save(session.clone()).await;
        let _ = self.events.emit(PortalEvent::Session(SessionEvent::SignedIn {
            user_id: session.user.id.clone(),
        }));
        info!(user_id = %session.user.id, "Signed in");

        Ok(session)
    }
}
