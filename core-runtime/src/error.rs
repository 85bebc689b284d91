//! Runtime-level errors: configuration problems and missing host
//! capabilities. Session and API failures have their own taxonomy in
//! `core-session`; this type only covers faults that prevent the client
//! from being wired up at all.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The supplied configuration is unusable (bad base URL, invalid log
    /// filter, zero-sized event buffer).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not injected and no platform default is
    /// available. The message says which feature or injection fixes it.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_names_the_capability() {
        let err = Error::CapabilityMissing {
            capability: "SecureStore".to_string(),
            message: "inject one or enable desktop-shims".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("SecureStore"));
        assert!(text.contains("desktop-shims"));
    }
}
