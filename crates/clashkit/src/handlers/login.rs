//! Login reply handlers.

use clashkit_protocol::{packet_id, Packet};
use tracing::{debug, warn};

use crate::registry::HandlerRegistry;
use crate::{Client, ClientError};

pub fn register(registry: &mut HandlerRegistry) -> Result<(), ClientError> {
    registry.register(packet_id::LOGIN_OK, handle_login_ok)?;
    registry.register(packet_id::LOGIN_FAILED, handle_login_failed)
}

/// Stores the identity the server assigned and moves the session to
/// `Active`, which starts keep-alives.
pub fn handle_login_ok(client: &Client, packet: &Packet) {
    let Packet::LoginOk(ok) = packet else {
        debug!(%packet, "login-ok handler got another packet");
        return;
    };
    if let Err(e) = client.complete_login(ok) {
        warn!(error = %e, state = %client.state(), "login reply outside of handshake");
    }
}

pub fn handle_login_failed(client: &Client, packet: &Packet) {
    let Packet::LoginFailed(failed) = packet else {
        debug!(%packet, "login-failed handler got another packet");
        return;
    };
    if let Err(e) = client.fail_login(failed) {
        warn!(error = %e, state = %client.state(), "login rejection outside of handshake");
    }
}
