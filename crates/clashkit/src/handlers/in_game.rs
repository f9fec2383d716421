//! Steady-state handlers.

use clashkit_protocol::{packet_id, Packet};

use crate::events::ChatMessageEvent;
use crate::registry::HandlerRegistry;
use crate::{Client, ClientError};

pub fn register(registry: &mut HandlerRegistry) -> Result<(), ClientError> {
    registry.register(packet_id::CHAT_MESSAGE_SERVER, handle_chat_message)?;
    registry.register(packet_id::KEEP_ALIVE_OK, handle_keep_alive_ok)
}

/// Raises `on_chat_message` for every chat line the server broadcasts.
pub fn handle_chat_message(client: &Client, packet: &Packet) {
    if let Packet::ChatMessageServer(msg) = packet {
        client.emit_chat_message(ChatMessageEvent::from(msg));
    }
}

pub fn handle_keep_alive_ok(_client: &Client, _packet: &Packet) {
    tracing::trace!("keep-alive acknowledged");
}
