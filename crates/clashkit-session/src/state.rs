//! The connection state machine.

use std::fmt;

use crate::SessionError;

/// Where a session is in its lifecycle.
///
/// ```text
///  Disconnected ──connect──► Connecting ──connected──► AwaitingHandshake
///        ▲                       │                            │
///        │                       │ connect failed             │ login ok
///        │                       ▼                            ▼
///        │                    Faulted ◄───── error ────────  Active
///        │                                                    │
///        └────────────── disconnect (any non-terminal) ───────┘
/// ```
///
/// `Faulted` is terminal: a new client has to be built to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport. The only state in which `connect` is accepted.
    #[default]
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Transport is up and the login packet has been queued.
    AwaitingHandshake,
    /// Logged in; keep-alives are flowing.
    Active,
    /// Something failed. Terminal.
    Faulted,
}

impl ConnectionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, AwaitingHandshake)
                | (Connecting, Faulted)
                | (Connecting, Disconnected)
                | (AwaitingHandshake, Active)
                | (AwaitingHandshake, Faulted)
                | (AwaitingHandshake, Disconnected)
                | (Active, Faulted)
                | (Active, Disconnected)
        )
    }

    /// Moves to `next` if the edge exists.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTransition`] otherwise; `self` is left
    /// unchanged.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), SessionError> {
        if !self.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        tracing::debug!(from = %self, to = %next, "session state transition");
        *self = next;
        Ok(())
    }

    /// Whether a transport channel exists in this state.
    pub fn has_transport(self) -> bool {
        matches!(self, Self::AwaitingHandshake | Self::Active)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Faulted
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHandshake => "awaiting-handshake",
            Self::Active => "active",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}
