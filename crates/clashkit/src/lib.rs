//! # clashkit
//!
//! Client session engine for a binary, packet-based game protocol over TCP.
//!
//! A [`Client`] connects to a game server, performs the login handshake,
//! dispatches every inbound packet to the handler registered for its id,
//! and keeps the session alive with a fixed-interval keep-alive once
//! logged in. Failures are never retried: the client moves to `Faulted`
//! and tells you why.
//!
//! ```text
//! Client (this crate)   ← lifecycle, handlers, events, packet logging
//!   ├─ clashkit-session    identity + connection state machine
//!   ├─ clashkit-keepalive  fixed-interval timer task
//!   ├─ clashkit-transport  Connector, PacketChannel
//!   └─ clashkit-protocol   Packet, frame header, PacketCodec
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clashkit::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ClientError> {
//!     let client = Client::new();
//!     client.on_chat_message(|msg| println!("{}: {}", msg.username, msg.message));
//!     client.connect("127.0.0.1:9339")?;
//!     tokio::signal::ctrl_c().await.ok();
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logger;
pub mod registry;

pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::ClientError;

/// Re-exports for the common case: `use clashkit::prelude::*;`.
pub mod prelude {
    pub use crate::events::{ChatMessageEvent, FaultEvent, LoginEvent, LoginResult};
    pub use crate::logger::{LogError, PacketLogger, TracingPacketLogger};
    pub use crate::registry::{HandlerRegistry, PacketHandler};
    pub use crate::{Client, ClientBuilder, ClientConfig, ClientError};

    pub use clashkit_keepalive::{KeepAliveConfig, KeepAliveStats};
    pub use clashkit_protocol::{
        packet_id, ChatMessageClient, ChatMessageServer, ClientInfo, JsonCodec, LoginFailed,
        LoginOk, LoginRequest, Packet, PacketCodec, PacketDirection,
    };
    pub use clashkit_session::{ConnectionState, SessionIdentity};
    pub use clashkit_transport::{Connector, Endpoint, TcpConnector, TransportError};
}
