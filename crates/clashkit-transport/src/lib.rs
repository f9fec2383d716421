//! Transport layer for clashkit.
//!
//! Provides the [`Connector`] trait (how a byte stream to the server is
//! obtained), the TCP implementation [`TcpConnector`], and
//! [`PacketChannel`], which owns one connected stream and turns it into an
//! ordered packet pipe with a single receive loop.
//!
//! The channel is stream-agnostic: anything that is
//! `AsyncRead + AsyncWrite` works, which is how tests drive the whole
//! client over `tokio::io::duplex` instead of a socket.

#![allow(async_fn_in_trait)]

mod channel;
mod endpoint;
mod error;
mod tcp;

pub use channel::{read_frame, PacketChannel};
pub use endpoint::{Endpoint, DEFAULT_PORT};
pub use error::TransportError;
pub use tcp::TcpConnector;

use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

/// Opaque identifier for a packet channel.
///
/// Every [`PacketChannel`] gets a fresh id, so callbacks from a channel that
/// has since been replaced can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a new `ChannelId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan-{}", self.0)
    }
}

/// Opens byte streams to a game server.
///
/// The returned future completes exactly once, with either a connected
/// stream or the reason the attempt failed. No timeout is applied here;
/// a connect that hangs is bounded only by the operating system.
pub trait Connector: Send + Sync + 'static {
    /// The stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Connects to `endpoint`.
    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl std::future::Future<Output = Result<Self::Stream, TransportError>> + Send;
}
