//! Unified error type for the Syncpad relay.

use syncpad_protocol::ProtocolError;
use syncpad_room::RoomError;
use syncpad_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SyncpadError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection's room stopped running.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncpad_protocol::{ClientMessage, Codec, JsonCodec, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let syncpad_err: SyncpadError = err.into();
        assert!(matches!(syncpad_err, SyncpadError::Transport(_)));
        assert!(syncpad_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = JsonCodec.decode::<ClientMessage>(b"{").unwrap_err();
        let syncpad_err: SyncpadError = err.into();
        assert!(matches!(syncpad_err, SyncpadError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::Unavailable(RoomId::from("doc1"));
        let syncpad_err: SyncpadError = err.into();
        assert!(matches!(syncpad_err, SyncpadError::Room(_)));
        assert_eq!(syncpad_err.to_string(), "room doc1 is unavailable");
    }
}
