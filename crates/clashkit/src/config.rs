//! Client configuration.

use clashkit_keepalive::KeepAliveConfig;
use clashkit_protocol::ClientInfo;
use clashkit_session::SessionIdentity;

/// Configuration for a [`Client`](crate::Client).
///
/// All fields have working defaults, so `ClientConfig::default()` is enough
/// to log in as a new, anonymous player.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Device and build metadata sent verbatim in every login request.
    pub client_info: ClientInfo,
    /// Keep-alive cadence once logged in.
    pub keep_alive: KeepAliveConfig,
    /// Identity used for the first login. Anonymous by default; set it to
    /// [`SessionIdentity::resume`] to log back into an existing account.
    pub identity: SessionIdentity,
}

impl ClientConfig {
    /// Replaces out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`ClientBuilder::build`](crate::ClientBuilder::build).
    pub fn validated(mut self) -> Self {
        self.keep_alive = self.keep_alive.validated();
        if self.client_info.fingerprint_hash.is_empty() {
            tracing::warn!("client fingerprint hash is empty, the server will likely reject logins");
        }
        self
    }
}
