//! Single-Flight Session Renewal
//!
//! Exchanges the renewal cookie (held by the transport) and the cached CSRF
//! token for a fresh credential pair via `POST /auth/refresh`.
//!
//! ## Single-flight guarantee
//!
//! Any number of callers may demand a refresh at once: a burst of requests
//! that all hit 401 within the same second is the normal case, not the edge
//! case. The coordinator memoizes the in-flight renewal as a
//! [`Shared`](futures::future::Shared) future; concurrent callers await the
//! same handle and receive clones of the same result, so at most one renewal
//! request is on the wire process-wide. The handle is cleared only after the
//! operation settles, success or failure, so a late caller starts a new
//! renewal instead of awaiting a stale one.
//!
//! There is no internal retry. A failed renewal propagates to every waiter
//! and the interceptor decides what to do with the session.

use crate::client::server_message;
use crate::error::{Result, SessionError};
use crate::store::SessionStore;
use crate::types::{AuthResponse, Session};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::events::{EventBus, PortalEvent, SessionEvent};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

type SharedRefresh = Shared<BoxFuture<'static, Result<Session>>>;

/// Coordinates session renewal so that concurrent demands collapse into a
/// single network call.
pub struct RefreshCoordinator {
    http: Arc<dyn HttpClient>,
    store: SessionStore,
    events: EventBus,
    refresh_url: String,
    timeout: Duration,
    in_flight: Mutex<Option<SharedRefresh>>,
}

impl RefreshCoordinator {
    pub fn new(
        http: Arc<dyn HttpClient>,
        store: SessionStore,
        events: EventBus,
        base_url: &Url,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            store,
            events,
            refresh_url: format!("{}/auth/refresh", base_url.as_str().trim_end_matches('/')),
            timeout,
            in_flight: Mutex::new(None),
        }
    }

    /// Renew the session, joining an in-flight renewal if one exists.
    ///
    /// On success the new session has already been written to the store
    /// before any waiter observes the result.
    ///
    /// # Errors
    ///
    /// - [`SessionError::MissingCredential`] if no CSRF token is cached;
    ///   returned before any network traffic
    /// - [`SessionError::Unauthorized`] if the server rejected the renewal
    /// - [`SessionError::Transport`] / [`SessionError::Server`] for
    ///   network and other server failures
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<Session> {
        let fut = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(existing) => {
                    debug!("Joining in-flight session renewal");
                    existing.clone()
                }
                None => {
                    let fut = Self::perform(
                        Arc::clone(&self.http),
                        self.store.clone(),
                        self.events.clone(),
                        self.refresh_url.clone(),
                        self.timeout,
                    )
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = fut.await;

        // Drop the memoized handle once it has settled. peek() distinguishes
        // the settled handle from a newer renewal some other task may have
        // started in the meantime.
        {
            let mut slot = self.in_flight.lock().await;
            if let Some(current) = slot.as_ref() {
                if current.peek().is_some() {
                    *slot = None;
                }
            }
        }

        result
    }

    async fn perform(
        http: Arc<dyn HttpClient>,
        store: SessionStore,
        events: EventBus,
        refresh_url: String,
        timeout: Duration,
    ) -> Result<Session> {
        let Some(tokens) = store.tokens() else {
            debug!("No CSRF token cached, renewal impossible");
            return Err(SessionError::MissingCredential);
        };

        let _ = events.emit(PortalEvent::Session(SessionEvent::TokenRefreshing));

        let request = HttpRequest::new(HttpMethod::Post, &refresh_url)
            .header("X-CSRF-Token", &tokens.csrf_token)
            .header("X-Request-ID", Uuid::new_v4().to_string())
            .timeout(timeout);

        let response = http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Session renewal request failed");
            SessionError::Transport(e.to_string())
        })?;

        if response.is_success() {
            let body: AuthResponse = response
                .json()
                .map_err(|e| SessionError::Serialization(e.to_string()))?;

            // The server may omit the profile on renewal; keep the cached one.
            let user = match body.user.or_else(|| store.user()) {
                Some(user) => user,
                None => {
                    return Err(SessionError::Serialization(
                        "renewal response carried no user profile and none is cached".to_string(),
                    ));
                }
            };

            let session = Session {
                tokens: crate::types::SessionTokens::new(body.access_token, body.csrf_token),
                user,
            };

            store.save(session.clone()).await;
            let _ = events.emit(PortalEvent::Session(SessionEvent::TokenRefreshed));
            info!(user_id = %session.user.id, "Session renewed");

            Ok(session)
        } else if response.status == 401 {
            let message = server_message(&response)
                .unwrap_or_else(|| "Session renewal was rejected".to_string());
            warn!("Session renewal rejected by server");
            Err(SessionError::Unauthorized { message })
        } else {
            let message = server_message(&response)
                .unwrap_or_else(|| "Session renewal failed".to_string());
            warn!(status = response.status, "Session renewal failed");
            Err(SessionError::Server {
                status: response.status,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionTokens, UserProfile};
    use bridge_traits::http::HttpResponse;
    use bridge_traits::storage::SecureStore;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct NullSecureStore;

    #[async_trait::async_trait]
    impl SecureStore for NullSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> bridge_traits::error::Result<()> {
            Ok(())
        }

        async fn get_secret(
            &self,
            _key: &str,
        ) -> bridge_traits::error::Result<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> bridge_traits::error::Result<()> {
            Ok(())
        }
    }

    /// Mock transport that answers every request with a fresh token pair
    /// after a short delay, counting the calls it actually serves.
    struct SlowRefreshServer {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl HttpClient for SlowRefreshServer {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> bridge_traits::error::Result<HttpResponse> {
            assert!(request.headers.contains_key("X-CSRF-Token"));
            assert!(request.headers.contains_key("X-Request-ID"));

            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;

            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(r#"{"accessToken": "fresh", "csrfToken": "fresh-csrf"}"#),
            })
        }
    }

    /// Mock transport that checks the exact request URL before answering
    /// with a fresh token pair.
    struct UrlCheckingServer {
        expected: &'static str,
    }

    #[async_trait::async_trait]
    impl HttpClient for UrlCheckingServer {
        async fn execute(
            &self,
            request: HttpRequest,
        ) -> bridge_traits::error::Result<HttpResponse> {
            assert_eq!(request.url, self.expected);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(r#"{"accessToken": "fresh", "csrfToken": "fresh-csrf"}"#),
            })
        }
    }

    struct RejectingServer;

    #[async_trait::async_trait]
    impl HttpClient for RejectingServer {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> bridge_traits::error::Result<HttpResponse> {
            Ok(HttpResponse {
                status: 401,
                headers: HashMap::new(),
                body: Bytes::from(r#"{"error": "refresh token expired"}"#),
            })
        }
    }

    async fn seeded_store() -> SessionStore {
        let store = SessionStore::new(Arc::new(NullSecureStore));
        let session = Session {
            tokens: SessionTokens::new("stale", "csrf-1"),
            user: UserProfile {
                id: "user-1".to_string(),
                email: "u@example.com".to_string(),
                role: "student".to_string(),
                student_id: None,
                name_kana: None,
                is_admin: false,
            },
        };
        store.save(session).await;
        store
    }

    fn coordinator(http: Arc<dyn HttpClient>, store: SessionStore) -> Arc<RefreshCoordinator> {
        let base = Url::parse("https://portal.example.com/api").unwrap();
        Arc::new(RefreshCoordinator::new(
            http,
            store,
            EventBus::new(16),
            &base,
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_collapse_to_one_call() {
        let server = Arc::new(SlowRefreshServer {
            calls: AtomicUsize::new(0),
        });
        let store = seeded_store().await;
        let coord = coordinator(server.clone(), store.clone());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coord = Arc::clone(&coord);
            handles.push(tokio::spawn(async move { coord.refresh().await }));
        }

        for handle in handles {
            let session = handle.await.unwrap().expect("refresh should succeed");
            assert_eq!(session.tokens.access_token, "fresh");
        }

        assert_eq!(
            server.calls.load(Ordering::SeqCst),
            1,
            "all concurrent callers must share one renewal request"
        );
        assert_eq!(store.tokens().unwrap().access_token, "fresh");
    }

    #[tokio::test]
    async fn test_refresh_after_settle_starts_new_call() {
        let server = Arc::new(SlowRefreshServer {
            calls: AtomicUsize::new(0),
        });
        let coord = coordinator(server.clone(), seeded_store().await);

        coord.refresh().await.expect("first refresh");
        coord.refresh().await.expect("second refresh");

        assert_eq!(server.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_credentials_aborts_before_network() {
        let server = Arc::new(SlowRefreshServer {
            calls: AtomicUsize::new(0),
        });
        let empty_store = SessionStore::new(Arc::new(NullSecureStore));
        let coord = coordinator(server.clone(), empty_store);

        let result = coord.refresh().await;
        assert_eq!(result, Err(SessionError::MissingCredential));
        assert_eq!(
            server.calls.load(Ordering::SeqCst),
            0,
            "no network call without a CSRF token"
        );
    }

    #[tokio::test]
    async fn test_host_only_base_url_joins_cleanly() {
        // A base URL without a path renders with a trailing slash; the
        // renewal URL must not end up with a double slash.
        let store = seeded_store().await;
        let base = Url::parse("https://portal.example.com").unwrap();
        let coord = RefreshCoordinator::new(
            Arc::new(UrlCheckingServer {
                expected: "https://portal.example.com/auth/refresh",
            }),
            store,
            EventBus::new(16),
            &base,
            Duration::from_secs(5),
        );

        coord.refresh().await.expect("refresh should succeed");
    }

    #[tokio::test]
    async fn test_rejected_refresh_fans_out_error() {
        let store = seeded_store().await;
        let coord = coordinator(Arc::new(RejectingServer), store.clone());

        let (a, b) = tokio::join!(coord.refresh(), coord.refresh());
        for result in [a, b] {
            match result {
                Err(SessionError::Unauthorized { message }) => {
                    assert_eq!(message, "refresh token expired");
                }
                other => panic!("expected Unauthorized, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_emits_lifecycle_events() {
        let store = seeded_store().await;
        let base = Url::parse("https://portal.example.com/api").unwrap();
        let events = EventBus::new(16);
        let mut sub = events.subscribe();

        let coord = RefreshCoordinator::new(
            Arc::new(SlowRefreshServer {
                calls: AtomicUsize::new(0),
            }),
            store,
            events,
            &base,
            Duration::from_secs(5),
        );

        coord.refresh().await.expect("refresh should succeed");

        assert_eq!(
            sub.recv().await.unwrap(),
            PortalEvent::Session(SessionEvent::TokenRefreshing)
        );
        assert_eq!(
            sub.recv().await.unwrap(),
            PortalEvent::Session(SessionEvent::TokenRefreshed)
        );
    }
}
