use clashkit_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint string could not be understood.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The TCP connection could not be established.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The channel is closed (or was never opened).
    #[error("not connected")]
    NotConnected,

    /// The peer closed the connection.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A received frame could not be decoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),

    /// The receive loop has already been started on this channel.
    #[error("receive loop already started")]
    AlreadyReceiving,
}
