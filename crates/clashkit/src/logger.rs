//! Packet logging.
//!
//! Every packet crossing the client boundary is handed to a
//! [`PacketLogger`] before anything else happens to it: outbound packets
//! before they are queued, inbound packets before dispatch. A logger that
//! fails never affects the packet itself; the client traces the error and
//! moves on.

use clashkit_protocol::{Packet, PacketDirection};

/// Errors a [`PacketLogger`] may report.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("packet log write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("packet log failed: {0}")]
    Other(String),
}

/// Receives a copy of every packet the client sends or receives.
///
/// Called synchronously on the sending task or the receive loop, so
/// implementations must be quick; hand off to a channel for anything slow.
pub trait PacketLogger: Send + Sync + 'static {
    fn log(&self, packet: &Packet, direction: PacketDirection) -> Result<(), LogError>;
}

/// The default logger: one `debug!` line per packet on the
/// `clashkit::packets` target.
///
/// Enable it with `RUST_LOG=clashkit::packets=debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPacketLogger;

impl PacketLogger for TracingPacketLogger {
    fn log(&self, packet: &Packet, direction: PacketDirection) -> Result<(), LogError> {
        tracing::debug!(
            target: "clashkit::packets",
            %direction,
            id = packet.id(),
            name = packet.name(),
            "packet"
        );
        Ok(())
    }
}
