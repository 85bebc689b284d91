//! Authenticated API Client
//!
//! Wraps the HTTP transport with the portal's authentication discipline:
//! every request carries the cached credentials, and a 401 triggers exactly
//! one renewal-and-retry pass before the session is declared dead.
//!
//! ## Interceptor state machine
//!
//! For each request:
//!
//! 1. Attach `Authorization: Bearer` and `X-CSRF-Token` if credentials are
//!    cached, plus a fresh `X-Request-ID` per attempt.
//! 2. A 401 on a normal endpoint, not yet retried: mark the request retried,
//!    run the shared renewal, reattach the fresh credentials and reissue
//!    once. Whatever comes back the second time is returned verbatim.
//! 3. If renewal fails, or the retried request 401s again, the session is
//!    unrecoverable: clear the store, fire the navigator, emit
//!    `SessionExpired`, and surface `Unauthorized`.
//! 4. 401/403 on an `/admin/` path is an authorization verdict, not an
//!    expiry signal: surfaced directly, no renewal, session left intact.
//! 5. The renewal endpoint itself is never intercepted.
//!
//! Everything else passes through unchanged; the typed helpers then map
//! non-2xx statuses onto the error taxonomy.

use crate::error::{Result, SessionError};
use crate::refresh::RefreshCoordinator;
use crate::store::SessionStore;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::navigate::Navigator;
use bytes::Bytes;
use core_runtime::events::{EventBus, PortalEvent, SessionEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

const REFRESH_PATH: &str = "/auth/refresh";

/// Extract the server's `{"error": ...}` message from a response body.
pub(crate) fn server_message(response: &HttpResponse) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .map(|b| b.error)
}

/// Whether a path addresses the admin surface, where 401/403 means
/// "not allowed", not "token expired".
fn is_admin_path(path: &str) -> bool {
    path.contains("/admin/") || path == "/admin"
}

/// HTTP client with credential attachment and retry-once-after-refresh.
///
/// Cheap to clone; all clones share the same store, renewal coordinator,
/// and transport.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    store: SessionStore,
    refresh: Arc<RefreshCoordinator>,
    navigator: Arc<dyn Navigator>,
    events: EventBus,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: SessionStore,
        refresh: Arc<RefreshCoordinator>,
        navigator: Arc<dyn Navigator>,
        events: EventBus,
        base_url: Url,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            store,
            refresh,
            navigator,
            events,
            base_url,
            timeout,
        }
    }

    /// The session store backing this client.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Issue a request through the interceptor.
    ///
    /// Returns the final response, whatever its status; only transport
    /// failures and session expiry surface as errors. Most callers want the
    /// typed helpers instead.
    #[instrument(skip(self, body), fields(path = path))]
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        let response = self.execute_once(method, path, body.clone()).await?;

        if response.status != 401 || is_admin_path(path) || path == REFRESH_PATH {
            return Ok(response);
        }

        debug!("Request was rejected with 401, attempting session renewal");

        match self.refresh.refresh().await {
            Ok(_) => {
                let retried = self.execute_once(method, path, body).await?;
                if retried.status == 401 {
                    // The fresh credentials were rejected too; nothing more
                    // to try.
                    warn!("Retried request rejected again, session is unrecoverable");
                    self.expire_session().await;
                }
                Ok(retried)
            }
            Err(refresh_err) => {
                warn!(error = %refresh_err, "Session renewal failed");
                self.expire_session().await;
                let message = server_message(&response)
                    .unwrap_or_else(|| "Session expired".to_string());
                Err(SessionError::Unauthorized { message })
            }
        }
    }

    /// GET a JSON resource.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(HttpMethod::Get, path, None).await?;
        self.parse_json(response)
    }

    /// POST a JSON body and parse a JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let payload = encode_body(body)?;
        let response = self.send(HttpMethod::Post, path, Some(payload)).await?;
        self.parse_json(response)
    }

    /// POST a JSON body, expecting a success status and no meaningful body.
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let payload = encode_body(body)?;
        let response = self.send(HttpMethod::Post, path, Some(payload)).await?;
        self.expect_success(response)
    }

    /// PUT a JSON body and parse a JSON response.
    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let payload = encode_body(body)?;
        let response = self.send(HttpMethod::Put, path, Some(payload)).await?;
        self.parse_json(response)
    }

    /// DELETE a resource, expecting a success status.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(HttpMethod::Delete, path, None).await?;
        self.expect_success(response)
    }

    async fn execute_once(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        // A host-only base URL renders with a trailing slash; trim it so the
        // joined URL never carries a double slash.
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        let mut request = HttpRequest::new(method, url)
            .header("X-Request-ID", Uuid::new_v4().to_string())
            .timeout(self.timeout);

        // Credentials are re-read per attempt so a retry picks up the
        // renewed pair.
        if let Some(tokens) = self.store.tokens() {
            request = request
                .bearer_token(&tokens.access_token)
                .header("X-CSRF-Token", &tokens.csrf_token);
        }

        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body);
        }

        self.http
            .execute(request)
            .await
            .map_err(SessionError::from)
    }

    async fn expire_session(&self) {
        self.store.clear().await;
        self.navigator.to_login();
        let _ = self
            .events
            .emit(PortalEvent::Session(SessionEvent::SessionExpired));
    }

    fn parse_json<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T> {
        self.check_status(&response)?;
        response
            .json()
            .map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn expect_success(&self, response: HttpResponse) -> Result<()> {
        self.check_status(&response)
    }

    fn check_status(&self, response: &HttpResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let message = server_message(response);
        match response.status {
            401 => Err(SessionError::Unauthorized {
                message: message.unwrap_or_else(|| "Authentication required".to_string()),
            }),
            403 => Err(SessionError::Forbidden {
                message: message.unwrap_or_else(|| "Access denied".to_string()),
            }),
            status => Err(SessionError::Server {
                status,
                message: message.unwrap_or_else(|| "Request failed".to_string()),
            }),
        }
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| SessionError::Serialization(e.to_string()))
}
