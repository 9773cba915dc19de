//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
///
/// The gateway treats a [`ProtocolError::Decode`] on an inbound frame as
/// "drop the frame": no reply is sent and the peer stays in its room.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag, or
    /// missing/mistyped fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
