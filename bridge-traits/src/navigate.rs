//! Navigation Port
//!
//! The session layer needs one UI capability: when the session is
//! unrecoverable (refresh failed, or a request kept failing after the retry),
//! it must send the user to the login entry point. In the browser shell this
//! is a location change; in tests it is a stub recording the call.
//!
//! Passing the capability in, instead of reaching for a global, keeps the
//! core usable from any host shell.

/// Routing capability supplied by the host shell.
pub trait Navigator: Send + Sync {
    /// Navigate to the login entry point.
    ///
    /// Called after local session state has already been cleared; the
    /// implementation only changes what the user sees.
    fn to_login(&self);
}

/// Navigator that does nothing. Useful for headless hosts and tests that
/// don't assert on navigation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_login(&self) {}
}
