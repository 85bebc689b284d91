//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host shell.
//!
//! ## Overview
//!
//! This crate defines the contract between the portal client core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per host (desktop
//! app, test harness, embedded web view shell).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport with TLS and a
//!   cookie jar holding the out-of-band renewal credential
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence
//!   (Keychain/Credential Manager/Secret Service)
//!
//! ### UI Integration
//! - [`Navigator`](navigate::Navigator) - Routing capability used when the
//!   session becomes unrecoverable (redirect to the login entry point)
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Platform implementations should convert platform-specific errors to
//! `BridgeError` and provide actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks.

pub mod error;
pub mod http;
pub mod navigate;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use navigate::Navigator;
pub use storage::SecureStore;
