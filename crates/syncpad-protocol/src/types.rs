//! Wire types for the Syncpad relay.
//!
//! Every frame is a JSON object tagged by a snake_case `"type"` field, with
//! camelCase field names, e.g.
//!
//! ```text
//! {"type":"cursor","clientId":"b7e1","start":3,"end":5}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Name of a collaboration room.
///
/// Any string is a valid room name; peers that use the same name share a
/// document. Serialized as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Room used when a connection does not name one.
    pub const DEFAULT: &'static str = "default";

    /// Creates a room id from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the room name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoomId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// ClientMessage: peer → relay
// ---------------------------------------------------------------------------

/// A message a peer sends to its room.
///
/// `update` and `state` are encoded CRDT data (base64 Yjs updates in the
/// browser client). The relay forwards them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// An incremental document change, to be fanned out to the room.
    #[serde(rename_all = "camelCase")]
    YUpdate { client_id: String, update: String },

    /// A full document snapshot, sent in answer to a
    /// [`ServerMessage::StateRequest`].
    YState { state: String },

    /// The sender's caret or selection moved.
    #[serde(rename_all = "camelCase")]
    Cursor {
        client_id: String,
        #[serde(default)]
        start: u64,
        #[serde(default)]
        end: u64,
    },

    /// Ask every peer in the room to re-announce its cursor. Sent by a
    /// client right after it connects.
    #[serde(rename_all = "camelCase")]
    CursorRequest { client_id: String },
}

// ---------------------------------------------------------------------------
// ServerMessage: relay → peer
// ---------------------------------------------------------------------------

/// A message the room sends to one or more of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Number of members currently in the room. Sent to every member on
    /// each membership change.
    Presence { count: usize },

    /// A relayed [`ClientMessage::YUpdate`]. Echoed to the sender too;
    /// clients filter on `clientId`.
    #[serde(rename_all = "camelCase")]
    YUpdate { client_id: String, update: String },

    /// Bootstrap snapshot for a member that joined an active room.
    YSync { state: String },

    /// "Please send your full document state as `y_state`." Sent to one
    /// existing member whenever someone new is waiting for a snapshot.
    StateRequest,

    /// A relayed [`ClientMessage::Cursor`].
    #[serde(rename_all = "camelCase")]
    Cursor { client_id: String, start: u64, end: u64 },

    /// A relayed [`ClientMessage::CursorRequest`]; `from` is the asking
    /// client's id.
    CursorRequest { from: String },

    /// No peer holds any document state: start from an empty document.
    YInit,
}

impl ServerMessage {
    /// The wire tag of this message, handy for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::YUpdate { .. } => "y_update",
            Self::YSync { .. } => "y_sync",
            Self::StateRequest => "state_request",
            Self::Cursor { .. } => "cursor",
            Self::CursorRequest { .. } => "cursor_request",
            Self::YInit => "y_init",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
