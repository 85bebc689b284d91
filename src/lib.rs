//! Umbrella crate for the Juice Academy portal client.
//!
//! Re-exports the workspace crates so host applications can depend on
//! `academy-client` alone and enable the documented feature flags
//! (e.g. `desktop-shims`) without wiring each crate individually.

pub use core_api;
pub use core_session;

pub use core_session::{ApiClient, Session, SessionError, SessionManager};
