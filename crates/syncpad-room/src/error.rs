//! Error types for the room layer.

use syncpad_protocol::RoomId;

/// Errors that can occur when talking to a room.
///
/// Membership operations themselves never fail (a double leave is a
/// no-op), so the only failure is a room actor that is no longer running.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
