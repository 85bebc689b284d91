//! Tests driving the typed clients through the full authenticated stack:
//! credential attachment, renewal, and the admin exemption all behave the
//! same whether the caller goes through a typed client or raw paths.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use bytes::Bytes;
use core_api::{AnnouncementsClient, PaymentClient, SubscriptionClient};
use core_runtime::config::PortalConfig;
use core_session::{Session, SessionError, SessionManager, SessionTokens, UserProfile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const BASE_URL: &str = "https://portal.example.com/api";

struct FakePortal {
    valid_access: Mutex<String>,
    refresh_calls: AtomicUsize,
}

impl FakePortal {
    fn new(valid_access: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_access: Mutex::new(valid_access.to_string()),
            refresh_calls: AtomicUsize::new(0),
        })
    }

    fn authorized(&self, request: &HttpRequest) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        request.headers.get("Authorization") == Some(&expected)
    }

    fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }
}

#[async_trait]
impl HttpClient for FakePortal {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request.url.strip_prefix(BASE_URL).unwrap();

        if path == "/auth/refresh" {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            *self.valid_access.lock().unwrap() = "renewed".to_string();
            return Ok(Self::json(
                200,
                r#"{"accessToken": "renewed", "csrfToken": "renewed-csrf"}"#,
            ));
        }

        if path.starts_with("/admin/") {
            return Ok(Self::json(403, r#"{"error": "Admin access required"}"#));
        }

        if !self.authorized(&request) {
            return Ok(Self::json(401, r#"{"error": "token expired"}"#));
        }

        let body = match path {
            p if p.starts_with("/announcements?limit=") => {
                r#"{
                    "announcements": [
                        {"id": "a1", "title": "Welcome", "content": "Hello",
                         "createdAt": "2026-04-01T00:00:00Z", "updatedAt": "2026-04-01T00:00:00Z"}
                    ],
                    "count": 1
                }"#
            }
            "/announcements" => r#"{"announcements": [], "count": 0}"#,
            "/payment/setup-intent" => r#"{"clientSecret": "seti_secret"}"#,
            "/subscription/status" => {
                r#"{
                    "hasActiveSubscription": true,
                    "subscription": {
                        "id": "sub_1", "status": "active", "price_id": "price_monthly",
                        "current_period_end": "2026-09-01T00:00:00Z",
                        "cancel_at_period_end": false
                    }
                }"#
            }
            other => panic!("unexpected path: {}", other),
        };

        Ok(Self::json(200, body))
    }
}

#[derive(Default)]
struct MemStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets.lock().unwrap().remove(key);
        Ok(())
    }
}

async fn signed_in_manager(portal: Arc<FakePortal>, access: &str) -> SessionManager {
    let config = PortalConfig::builder()
        .base_url(BASE_URL)
        .http_client(portal)
        .secure_store(Arc::new(MemStore::default()))
        .build()
        .unwrap();

    let manager = SessionManager::new(&config);
    manager
        .api_client()
        .store()
        .save(Session {
            tokens: SessionTokens::new(access, "csrf-1"),
            user: UserProfile {
                id: "user-1".to_string(),
                email: "student@example.com".to_string(),
                role: "student".to_string(),
                student_id: None,
                name_kana: None,
                is_admin: false,
            },
        })
        .await;
    manager
}

#[tokio::test]
async fn test_announcements_list_with_limit() {
    let portal = FakePortal::new("valid");
    let manager = signed_in_manager(portal.clone(), "valid").await;
    let client = AnnouncementsClient::new(manager.api_client().clone());

    let page = client.list(Some(5)).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.announcements[0].title, "Welcome");

    let empty = client.list(None).await.unwrap();
    assert_eq!(empty.count, 0);
}

#[tokio::test]
async fn test_typed_client_gets_transparent_renewal() {
    let portal = FakePortal::new("valid");
    // Seed with a token the portal no longer accepts
    let manager = signed_in_manager(portal.clone(), "stale").await;
    let client = SubscriptionClient::new(manager.api_client().clone());

    let status = client.status().await.unwrap();
    assert!(status.has_active_subscription);
    assert_eq!(portal.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_admin_write_rejection_is_forbidden_not_expiry() {
    let portal = FakePortal::new("valid");
    let manager = signed_in_manager(portal.clone(), "valid").await;
    let client = AnnouncementsClient::new(manager.api_client().clone());

    let result = client.delete("a1").await;
    assert!(matches!(result, Err(SessionError::Forbidden { .. })));
    assert_eq!(portal.refresh_calls.load(Ordering::SeqCst), 0);
    assert!(manager.is_authenticated());
}

#[tokio::test]
async fn test_setup_intent_round_trip() {
    let portal = FakePortal::new("valid");
    let manager = signed_in_manager(portal.clone(), "valid").await;
    let client = PaymentClient::new(manager.api_client().clone());

    let intent = client.create_setup_intent().await.unwrap();
    assert_eq!(intent.client_secret, "seti_secret");
}
