//! Room coordination for Syncpad.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's member list and the queue of members waiting for a document
//! snapshot. Rooms run in parallel; inside a room every event is handled
//! in order, one at a time.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms on first use, one per name
//! - [`RoomHandle`]: send events to a running room actor
//! - [`PeerSender`]: the channel a room delivers a member's messages on
//! - [`RoomConfig`]: mailbox size, snapshot timeout, empty-document notice

mod config;
mod error;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{PeerSender, RoomHandle, RoomInfo};
