//! # Syncpad
//!
//! WebSocket relay for collaborative document editing.
//!
//! Browser clients keep their own CRDT documents and connect to
//! `ws://host/?room=<name>`. Syncpad groups connections by room, fans
//! document updates and cursor moves out to everyone in the room, and
//! bootstraps late joiners by asking an existing member for a full
//! snapshot. The relay never stores or interprets document contents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syncpad::prelude::*;
//!
//! # async fn start() -> Result<(), SyncpadError> {
//! let server = SyncpadServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::SyncpadError;
pub use server::{DEFAULT_PEER_BUFFER, SyncpadServer, SyncpadServerBuilder};

/// Everything needed to configure and run a relay.
pub mod prelude {
    pub use crate::{SyncpadError, SyncpadServer, SyncpadServerBuilder};
    pub use syncpad_protocol::{ClientMessage, RoomId, ServerMessage};
    pub use syncpad_room::RoomConfig;
}
