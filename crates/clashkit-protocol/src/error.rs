//! Error types for the protocol layer.
//!
//! Each clashkit crate defines its own error enum. A `ProtocolError` always
//! means the bytes themselves were wrong (or could not be produced), never
//! that the network misbehaved.

/// Errors that can occur while framing, encoding, or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a packet body failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The packet body could not be deserialized.
    ///
    /// Common causes: truncated bodies, missing required fields, or a body
    /// that belongs to a different packet type than the header claims.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame is structurally broken: short header, or a body length
    /// that disagrees with the header.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A body is longer than the 24-bit length field can describe.
    #[error("packet body too large: {0} bytes")]
    BodyTooLarge(usize),
}
