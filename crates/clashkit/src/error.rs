//! Unified error type for the clashkit client.

use clashkit_keepalive::KeepAliveError;
use clashkit_protocol::ProtocolError;
use clashkit_session::SessionError;
use clashkit_transport::TransportError;

/// Top-level error returned by [`Client`](crate::Client) operations and
/// carried by [`FaultEvent`](crate::events::FaultEvent).
///
/// Transport failures are not wrapped blindly: a closed channel surfaces as
/// [`NotConnected`](Self::NotConnected), a decode failure as
/// [`Codec`](Self::Codec), and a malformed endpoint as
/// [`InvalidArgument`](Self::InvalidArgument), so callers can match on the
/// kind of failure without digging through layers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad caller input: an unparsable endpoint, a call made in a state
    /// that does not allow it, or no runtime to connect on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A handler is already registered for this packet id.
    #[error("a handler is already registered for packet id {0}")]
    DuplicateHandler(u16),

    /// No transport: not yet connected, disconnected, or faulted.
    #[error("not connected")]
    NotConnected,

    /// A packet could not be encoded, or received bytes could not be decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// Socket-level failure.
    #[error(transparent)]
    Transport(TransportError),

    /// The server answered the login with a failure packet.
    #[error("login rejected by server (reason {reason})")]
    LoginRejected {
        reason: i32,
        message: Option<String>,
    },

    #[error(transparent)]
    KeepAlive(#[from] KeepAliveError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected => Self::NotConnected,
            TransportError::Codec(e) => Self::Codec(e),
            TransportError::InvalidEndpoint(e) => Self::InvalidArgument(e),
            other => Self::Transport(other),
        }
    }
}
