//! # Session Management Module
//!
//! Handles the full authentication session lifecycle against the portal API:
//! - Credential storage with secure persistence ([`SessionStore`])
//! - Request authentication (Bearer + CSRF headers) and the
//!   retry-once-after-refresh response interceptor ([`ApiClient`])
//! - Single-flight token renewal ([`RefreshCoordinator`])
//! - High-level session operations: login, registration, OTP verification,
//!   logout ([`SessionManager`])
//!
//! ## Design notes
//!
//! The access token is a short-lived bearer credential paired with a CSRF
//! token; the long-lived renewal credential is an HttpOnly cookie that only
//! the HTTP transport ever sees. Token validity is decided lazily: requests
//! go out with whatever credentials are cached, and a 401 triggers exactly
//! one renewal-and-retry pass. Renewal is single-flight process-wide, so a
//! burst of expired requests costs one network call to the auth server.

pub mod client;
pub mod error;
pub mod facade;
pub mod refresh;
pub mod store;
pub mod types;

pub use client::ApiClient;
pub use error::{Result, SessionError};
pub use facade::SessionManager;
pub use refresh::RefreshCoordinator;
pub use store::SessionStore;
pub use types::{Session, SessionTokens, UserProfile};
