use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors surfaced by the session layer.
///
/// `Clone` is required: a single renewal result fans out to every request
/// that was waiting on the shared in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No CSRF token is cached, so renewal cannot even be attempted.
    /// Treated the same as a signed-out state.
    #[error("No stored credential available for session renewal")]
    MissingCredential,

    /// The server rejected the credentials (401).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The server refused access to a privileged resource (403).
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Network-level failure: connection refused, TLS, timeout.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other non-success response from the server.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<BridgeError> for SessionError {
    fn from(e: BridgeError) -> Self {
        SessionError::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
