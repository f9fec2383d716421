//! Wire protocol for clashkit.
//!
//! This crate defines what travels between the client and the game server:
//!
//! - **Packets** ([`Packet`] and its bodies) with their numeric type
//!   identifiers ([`packet_id`]).
//! - **Framing** ([`FrameHeader`]): the 7-byte header in front of every body.
//! - **Codecs** ([`PacketCodec`] trait, [`JsonCodec`]): how packets become
//!   frames and back.
//! - **Handshake metadata** ([`ClientInfo`]): the fixed device record sent
//!   with every login.
//!
//! ```text
//! Transport (frames) → Protocol (Packet) → Client (dispatch by packet id)
//! ```

mod codec;
mod error;
pub mod frame;
mod handshake;
mod packet;

pub use codec::PacketCodec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::FrameHeader;
pub use handshake::ClientInfo;
pub use packet::{
    packet_id, ChatMessageClient, ChatMessageServer, LoginFailed, LoginOk,
    LoginRequest, Packet, PacketDirection,
};
