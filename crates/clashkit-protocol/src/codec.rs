//! Codec trait and implementations for turning packets into frames.
//!
//! A codec owns the *body* format. The frame header (see [`crate::frame`])
//! is shared by all codecs so the transport can find frame boundaries
//! without knowing which codec is in use.
//!
//! [`PacketCodec`] is object safe: the client stores it as
//! `Arc<dyn PacketCodec>` and never becomes generic over it.

#[cfg(feature = "json")]
use serde::{de::DeserializeOwned, Serialize};

#[cfg(feature = "json")]
use crate::frame::HEADER_LEN;
#[cfg(feature = "json")]
use crate::packet::packet_id;
#[cfg(feature = "json")]
use crate::FrameHeader;
use crate::{Packet, ProtocolError};

/// Encodes packets into complete frames and decodes complete frames back
/// into packets.
///
/// Implementations must be `Send + Sync + 'static`: one codec instance is
/// shared by the send path (any task) and the receive loop.
pub trait PacketCodec: Send + Sync + 'static {
    /// Encodes `packet` into a full frame (header + body).
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the body cannot be serialized,
    /// or [`ProtocolError::BodyTooLarge`] if it does not fit the header.
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes a full frame (header + body) into a packet.
    ///
    /// Identifiers the codec does not model decode to
    /// [`Packet::Unknown`] rather than failing.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidFrame`] if the frame length disagrees
    /// with its header, or [`ProtocolError::Decode`] for a malformed body.
    fn decode(&self, frame: &[u8]) -> Result<Packet, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`PacketCodec`] whose bodies are JSON (via `serde_json`).
///
/// Readable in a packet dump, which makes it the default while developing
/// against a test server. Behind the `json` feature (enabled by default).
///
/// ```rust
/// use clashkit_protocol::{ChatMessageClient, JsonCodec, Packet, PacketCodec};
///
/// let codec = JsonCodec;
/// let packet = Packet::ChatMessageClient(ChatMessageClient { message: "hi".into() });
///
/// let frame = codec.encode(&packet).unwrap();
/// assert_eq!(codec.decode(&frame).unwrap(), packet);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl JsonCodec {
    fn body<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(body).map_err(ProtocolError::Decode)
    }
}

#[cfg(feature = "json")]
impl PacketCodec for JsonCodec {
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
        let body = match packet {
            Packet::LoginRequest(p) => Self::body(p)?,
            Packet::LoginOk(p) => Self::body(p)?,
            Packet::LoginFailed(p) => Self::body(p)?,
            Packet::ChatMessageClient(p) => Self::body(p)?,
            Packet::ChatMessageServer(p) => Self::body(p)?,
            Packet::KeepAlive | Packet::KeepAliveOk => Vec::new(),
            Packet::Unknown { body, .. } => body.clone(),
        };

        let header = FrameHeader::new(packet.id(), body.len())?;
        let mut frame = Vec::with_capacity(header.frame_len());
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    fn decode(&self, frame: &[u8]) -> Result<Packet, ProtocolError> {
        let header = FrameHeader::parse(frame)?;
        if frame.len() != header.frame_len() {
            return Err(ProtocolError::InvalidFrame(format!(
                "header announces {} body bytes, frame carries {}",
                header.body_len,
                frame.len().saturating_sub(HEADER_LEN)
            )));
        }
        let body = &frame[HEADER_LEN..];

        let packet = match header.id {
            packet_id::LOGIN_REQUEST => Packet::LoginRequest(Self::parse(body)?),
            packet_id::LOGIN_OK => Packet::LoginOk(Self::parse(body)?),
            packet_id::LOGIN_FAILED => Packet::LoginFailed(Self::parse(body)?),
            packet_id::CHAT_MESSAGE_CLIENT => {
                Packet::ChatMessageClient(Self::parse(body)?)
            }
            packet_id::CHAT_MESSAGE_SERVER => {
                Packet::ChatMessageServer(Self::parse(body)?)
            }
            packet_id::KEEP_ALIVE => Packet::KeepAlive,
            packet_id::KEEP_ALIVE_OK => Packet::KeepAliveOk,
            id => Packet::Unknown {
                id,
                body: body.to_vec(),
            },
        };
        Ok(packet)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ChatMessageServer, ClientInfo, LoginOk, LoginRequest};

    #[test]
    fn test_login_request_survives_encode_decode() {
        let codec = JsonCodec;
        let packet = Packet::LoginRequest(LoginRequest::new(
            0,
            None,
            &ClientInfo::default(),
            1234,
        ));

        let frame = codec.encode(&packet).unwrap();
        assert_eq!(FrameHeader::parse(&frame).unwrap().id, 10101);
        assert_eq!(codec.decode(&frame).unwrap(), packet);
    }

    #[test]
    fn test_keep_alive_has_empty_body() {
        let frame = JsonCodec.encode(&Packet::KeepAlive).unwrap();
        assert_eq!(frame.len(), HEADER_LEN);
        assert_eq!(JsonCodec.decode(&frame).unwrap(), Packet::KeepAlive);
    }

    #[test]
    fn test_unmodelled_id_decodes_to_unknown_with_raw_body() {
        let mut frame = FrameHeader::new(24101, 3).unwrap().to_bytes().to_vec();
        frame.extend_from_slice(&[9, 8, 7]);

        let packet = JsonCodec.decode(&frame).unwrap();
        assert_eq!(
            packet,
            Packet::Unknown {
                id: 24101,
                body: vec![9, 8, 7]
            }
        );
        // Unknown bodies go back out byte for byte.
        assert_eq!(JsonCodec.encode(&packet).unwrap(), frame);
    }

    #[test]
    fn test_truncated_frame_is_invalid() {
        let frame = JsonCodec
            .encode(&Packet::LoginOk(LoginOk {
                user_id: 1,
                user_token: "t".into(),
                server_environment: "prod".into(),
                server_major_version: 7,
                server_minor_version: 156,
                server_build: 1,
            }))
            .unwrap();

        let result = JsonCodec.decode(&frame[..frame.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::InvalidFrame(_))));
    }

    #[test]
    fn test_garbage_body_is_decode_error() {
        let body = b"{not json";
        let mut frame = FrameHeader::new(24715, body.len()).unwrap().to_bytes().to_vec();
        frame.extend_from_slice(body);

        let result = JsonCodec.decode(&frame);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_body_is_plain_json() {
        let frame = JsonCodec
            .encode(&Packet::ChatMessageServer(ChatMessageServer {
                message: "gg".into(),
                username: "barbarian".into(),
                user_id: 7,
                level: 30,
                clan_name: None,
            }))
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&frame[HEADER_LEN..]).unwrap();
        assert_eq!(json["message"], "gg");
        assert_eq!(json["username"], "barbarian");
        assert!(json["clan_name"].is_null());
    }
}
