//! Packet-id → handler lookup.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use clashkit_protocol::Packet;

use crate::{Client, ClientError};

/// Reacts to one kind of inbound packet.
///
/// Handlers run on the receive loop, one packet at a time, and get a
/// [`Client`] handle so they can reply or update the session. Long work
/// belongs on a spawned task.
///
/// Any `Fn(&Client, &Packet)` closure or function is a handler:
///
/// ```rust,no_run
/// use clashkit::prelude::*;
///
/// let client = Client::new();
/// client
///     .register_handler(24101, |_client: &Client, packet: &Packet| {
///         tracing::info!(%packet, "village data");
///     })
///     .unwrap();
/// ```
pub trait PacketHandler: Send + Sync + 'static {
    fn handle(&self, client: &Client, packet: &Packet);
}

impl<F> PacketHandler for F
where
    F: Fn(&Client, &Packet) + Send + Sync + 'static,
{
    fn handle(&self, client: &Client, packet: &Packet) {
        self(client, packet)
    }
}

/// Maps packet ids to their handler. At most one handler per id.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<u16, Arc<dyn PacketHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `id`.
    ///
    /// # Errors
    /// Returns [`ClientError::DuplicateHandler`] if `id` already has a
    /// handler. The existing one is kept.
    pub fn register<H: PacketHandler>(&mut self, id: u16, handler: H) -> Result<(), ClientError> {
        match self.handlers.entry(id) {
            Entry::Occupied(_) => Err(ClientError::DuplicateHandler(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(handler));
                tracing::trace!(id, "packet handler registered");
                Ok(())
            }
        }
    }

    /// The handler for `id`.
    pub fn get(&self, id: u16) -> Option<Arc<dyn PacketHandler>> {
        self.handlers.get(&id).cloned()
    }

    /// Runs the handler for `packet.id()`. Returns `false`, doing nothing,
    /// when no handler is registered.
    pub fn dispatch(&self, client: &Client, packet: &Packet) -> bool {
        match self.handlers.get(&packet.id()) {
            Some(handler) => {
                handler.handle(client, packet);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: u16) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
