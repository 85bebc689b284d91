use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential pair issued by the auth server.
///
/// The access token authenticates API requests; the CSRF token accompanies
/// state-changing requests and the renewal call. The long-lived renewal
/// credential is an HttpOnly cookie held by the transport and never appears
/// here.
///
/// # Security
///
/// Tokens should never be logged. The `Debug` implementation redacts both
/// values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived bearer token attached as `Authorization: Bearer ...`
    pub access_token: String,
    /// Anti-forgery token attached as `X-CSRF-Token`
    pub csrf_token: String,
}

impl SessionTokens {
    pub fn new(access_token: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            csrf_token: csrf_token.into(),
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("csrf_token", &"[REDACTED]")
            .finish()
    }
}

/// The authenticated user's profile as returned by the portal API.
///
/// Wire format is camelCase; fields are snake_case in Rust via serde rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub name_kana: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// A complete authenticated session: credential pair plus the profile of
/// the user they belong to. This is the unit of storage and of renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub tokens: SessionTokens,
    pub user: UserProfile,
}

// ============================================================================
// Wire payloads
// ============================================================================

/// Body of `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub role: String,
    pub student_id: String,
    pub name_kana: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /otp/verify`.
#[derive(Debug, Serialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub code: String,
    pub purpose: String,
}

/// Body of `POST /otp/resend`.
#[derive(Debug, Serialize)]
pub struct OtpResendRequest {
    pub email: String,
    pub purpose: String,
}

/// Token-issuing response shape shared by `/login`, `/otp/verify`, and
/// `/auth/refresh`. The refresh endpoint may omit the profile, in which case
/// the cached one is kept.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub csrf_token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tokens_debug_redacts() {
        let tokens = SessionTokens::new("secret_access", "secret_csrf");
        let debug_str = format!("{:?}", tokens);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret_access"));
        assert!(!debug_str.contains("secret_csrf"));
    }

    #[test]
    fn test_user_profile_camel_case_wire_format() {
        let json = r#"{
            "id": "user-1",
            "email": "student@example.com",
            "role": "student",
            "studentId": "S-001",
            "nameKana": "ヤマダ タロウ",
            "isAdmin": false
        }"#;

        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.student_id.as_deref(), Some("S-001"));
        assert_eq!(profile.name_kana.as_deref(), Some("ヤマダ タロウ"));
        assert!(!profile.is_admin);

        let serialized = serde_json::to_string(&profile).unwrap();
        assert!(serialized.contains("studentId"));
        assert!(serialized.contains("isAdmin"));
    }

    #[test]
    fn test_user_profile_optional_fields_default() {
        let json = r#"{"id": "a", "email": "a@example.com", "role": "admin"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.student_id.is_none());
        assert!(profile.name_kana.is_none());
        assert!(!profile.is_admin);
    }

    #[test]
    fn test_auth_response_without_user() {
        let json = r#"{"accessToken": "a", "csrfToken": "c"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "a");
        assert_eq!(resp.csrf_token, "c");
        assert!(resp.user.is_none());
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let session = Session {
            tokens: SessionTokens::new("access", "csrf"),
            user: UserProfile {
                id: "u-1".to_string(),
                email: "u@example.com".to_string(),
                role: "student".to_string(),
                student_id: None,
                name_kana: None,
                is_admin: false,
            },
        };

        let json = serde_json::to_vec(&session).unwrap();
        let restored: Session = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored, session);
    }
}
