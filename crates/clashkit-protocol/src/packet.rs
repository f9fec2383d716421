//! Packet types that travel on the wire.
//!
//! A packet is a typed unit of protocol data. Every packet carries a numeric
//! type identifier (see [`packet_id`]); the identifier is what the handler
//! registry dispatches on, and what the frame header announces before the
//! body arrives.
//!
//! Identifiers in the 10000 range travel client → server, identifiers in
//! the 20000 range travel server → client.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ClientInfo;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Packet-type identifiers for the packets this crate models.
pub mod packet_id {
    /// Client → Server: login handshake.
    pub const LOGIN_REQUEST: u16 = 10101;
    /// Client → Server: keep-alive ping.
    pub const KEEP_ALIVE: u16 = 10108;
    /// Client → Server: chat line typed by the user.
    pub const CHAT_MESSAGE_CLIENT: u16 = 14715;
    /// Server → Client: login rejected.
    pub const LOGIN_FAILED: u16 = 20103;
    /// Server → Client: login accepted, carries the session identity.
    pub const LOGIN_OK: u16 = 20104;
    /// Server → Client: keep-alive acknowledgement.
    pub const KEEP_ALIVE_OK: u16 = 20108;
    /// Server → Client: chat line broadcast by the server.
    pub const CHAT_MESSAGE_SERVER: u16 = 24715;
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a packet crossed the client boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketDirection {
    /// Sent by this client.
    ToServer,
    /// Received from the server.
    FromServer,
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToServer => f.write_str("to-server"),
            Self::FromServer => f.write_str("from-server"),
        }
    }
}

// ---------------------------------------------------------------------------
// Packet bodies
// ---------------------------------------------------------------------------

/// Client → Server: the first packet of every connection.
///
/// Carries the session identity (zero / absent before the first successful
/// login) and the fixed device metadata from [`ClientInfo`], plus a seed
/// generated freshly for each connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_id: i64,
    pub user_token: Option<String>,
    pub client_major_version: i32,
    pub client_content_version: i32,
    pub client_minor_version: i32,
    pub fingerprint_hash: String,
    pub open_udid: String,
    pub mac_address: Option<String>,
    pub device_model: String,
    pub locale_key: i32,
    pub language: String,
    pub advertising_guid: String,
    pub os_version: String,
    pub is_advertising_tracking_enabled: bool,
    pub android_device_id: String,
    pub facebook_distribution_id: String,
    pub vendor_guid: String,
    pub seed: u32,
}

impl LoginRequest {
    /// Builds a login request from the session identity, the handshake
    /// metadata, and this connection's seed. Metadata is copied verbatim.
    pub fn new(
        user_id: i64,
        user_token: Option<String>,
        info: &ClientInfo,
        seed: u32,
    ) -> Self {
        Self {
            user_id,
            user_token,
            client_major_version: info.major_version,
            client_content_version: info.content_version,
            client_minor_version: info.minor_version,
            fingerprint_hash: info.fingerprint_hash.clone(),
            open_udid: info.open_udid.clone(),
            mac_address: info.mac_address.clone(),
            device_model: info.device_model.clone(),
            locale_key: info.locale_key,
            language: info.language.clone(),
            advertising_guid: info.advertising_guid.clone(),
            os_version: info.os_version.clone(),
            is_advertising_tracking_enabled: info.advertising_tracking_enabled,
            android_device_id: info.android_device_id.clone(),
            facebook_distribution_id: info.facebook_distribution_id.clone(),
            vendor_guid: info.vendor_guid.clone(),
            seed,
        }
    }
}

/// Server → Client: the login was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOk {
    pub user_id: i64,
    pub user_token: String,
    pub server_environment: String,
    pub server_major_version: i32,
    pub server_minor_version: i32,
    pub server_build: i32,
}

/// Server → Client: the login was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginFailed {
    /// Server-defined reason code (e.g. outdated client, maintenance).
    pub reason: i32,
    pub message: Option<String>,
}

/// Client → Server: a chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageClient {
    pub message: String,
}

/// Server → Client: a chat line from another player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageServer {
    pub message: String,
    pub username: String,
    pub user_id: i64,
    pub level: i32,
    pub clan_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Every packet the client can send or receive.
///
/// `Unknown` keeps packets whose identifier this crate does not model. They
/// still reach the handler registry, so an application can register a
/// handler for an identifier and parse the raw body itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    LoginRequest(LoginRequest),
    LoginOk(LoginOk),
    LoginFailed(LoginFailed),
    KeepAlive,
    KeepAliveOk,
    ChatMessageClient(ChatMessageClient),
    ChatMessageServer(ChatMessageServer),
    Unknown { id: u16, body: Vec<u8> },
}

impl Packet {
    /// The packet-type identifier.
    pub fn id(&self) -> u16 {
        match self {
            Self::LoginRequest(_) => packet_id::LOGIN_REQUEST,
            Self::LoginOk(_) => packet_id::LOGIN_OK,
            Self::LoginFailed(_) => packet_id::LOGIN_FAILED,
            Self::KeepAlive => packet_id::KEEP_ALIVE,
            Self::KeepAliveOk => packet_id::KEEP_ALIVE_OK,
            Self::ChatMessageClient(_) => packet_id::CHAT_MESSAGE_CLIENT,
            Self::ChatMessageServer(_) => packet_id::CHAT_MESSAGE_SERVER,
            Self::Unknown { id, .. } => *id,
        }
    }

    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginRequest(_) => "LoginRequest",
            Self::LoginOk(_) => "LoginOk",
            Self::LoginFailed(_) => "LoginFailed",
            Self::KeepAlive => "KeepAlive",
            Self::KeepAliveOk => "KeepAliveOk",
            Self::ChatMessageClient(_) => "ChatMessageClient",
            Self::ChatMessageServer(_) => "ChatMessageServer",
            Self::Unknown { .. } => "Unknown",
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}
