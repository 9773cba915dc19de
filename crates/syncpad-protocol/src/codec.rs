//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The gateway only needs something that implements [`Codec`]; it never
//! calls `serde_json` directly. [`JsonCodec`] is the only implementation
//! today because browser clients speak JSON.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec value lives in the
/// server's shared state and is used from every connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use syncpad_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let msg: ClientMessage = codec
///     .decode(br#"{"type":"y_state","state":"AAE="}"#)
///     .unwrap();
/// assert_eq!(msg, ClientMessage::YState { state: "AAE=".into() });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, ServerMessage};

    #[test]
    fn test_encode_produces_utf8_json() {
        let bytes = JsonCodec
            .encode(&ServerMessage::Presence { count: 2 })
            .unwrap();
        let text = String::from_utf8(bytes).expect("json is utf-8");
        assert_eq!(text, r#"{"type":"presence","count":2}"#);
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let result: Result<ClientMessage, _> =
            JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_error_message_mentions_decode() {
        let err = JsonCodec
            .decode::<ClientMessage>(b"{}")
            .unwrap_err();
        assert!(err.to_string().starts_with("decode failed"));
    }
}
