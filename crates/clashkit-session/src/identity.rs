//! Session identity: the user id and token pair.

/// Identifies an authenticated session to the server.
///
/// A fresh client is anonymous (`user_id == 0`, no token). The server
/// assigns both on the first successful login; sending them back on a later
/// login resumes the same account.
///
/// Invariant: `user_token` is `None` until the session has authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionIdentity {
    user_id: i64,
    user_token: Option<String>,
}

impl SessionIdentity {
    /// An anonymous identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// An identity restored from an earlier login.
    pub fn resume(user_id: i64, user_token: impl Into<String>) -> Self {
        Self {
            user_id,
            user_token: Some(user_token.into()),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn user_token(&self) -> Option<&str> {
        self.user_token.as_deref()
    }

    /// Records the identity the server handed out on login.
    pub fn authenticate(&mut self, user_id: i64, user_token: impl Into<String>) {
        self.user_id = user_id;
        self.user_token = Some(user_token.into());
        tracing::debug!(user_id, "session identity updated");
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_token.is_some()
    }
}
