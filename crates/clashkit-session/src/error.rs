//! Error types for the session layer.

use crate::ConnectionState;

/// Errors raised by the session state machine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The requested transition is not an edge of the state machine.
    ///
    /// `Faulted` has no outgoing edges, so every transition out of it
    /// lands here.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}
