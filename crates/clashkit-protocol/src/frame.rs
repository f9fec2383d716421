//! Frame header layout.
//!
//! Every packet on the wire is a 7-byte header followed by the body:
//!
//! ```text
//! +---------+-----------------+-----------+----------------+
//! | id: u16 | body len: u24   | ver: u16  | body ...       |
//! +---------+-----------------+-----------+----------------+
//! ```
//!
//! All header fields are big-endian. The header is the only part of the
//! frame the transport needs to understand: it reads the header, learns the
//! body length, and hands the complete frame to a codec.

use crate::ProtocolError;

/// Length of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 7;

/// Largest body the 24-bit length field can describe.
pub const MAX_BODY_LEN: usize = 0xFF_FFFF;

/// The decoded fixed-size header of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Packet-type identifier.
    pub id: u16,
    /// Length of the body that follows the header.
    pub body_len: usize,
    /// Message version. Clients always send 0.
    pub version: u16,
}

impl FrameHeader {
    /// Creates a header for a body of `body_len` bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::BodyTooLarge`] if `body_len` exceeds
    /// [`MAX_BODY_LEN`].
    pub fn new(id: u16, body_len: usize) -> Result<Self, ProtocolError> {
        if body_len > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLarge(body_len));
        }
        Ok(Self {
            id,
            body_len,
            version: 0,
        })
    }

    /// Parses a header from the first [`HEADER_LEN`] bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::InvalidFrame(format!(
                "header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let id = u16::from_be_bytes([bytes[0], bytes[1]]);
        let body_len = u32::from_be_bytes([0, bytes[2], bytes[3], bytes[4]]) as usize;
        let version = u16::from_be_bytes([bytes[5], bytes[6]]);
        Ok(Self {
            id,
            body_len,
            version,
        })
    }

    /// Serializes the header into its 7-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let id = self.id.to_be_bytes();
        let len = (self.body_len as u32).to_be_bytes();
        let ver = self.version.to_be_bytes();
        [id[0], id[1], len[1], len[2], len[3], ver[0], ver[1]]
    }

    /// Total frame length (header plus body).
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.body_len
    }
}
