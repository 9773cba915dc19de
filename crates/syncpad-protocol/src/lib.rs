//! Wire protocol for Syncpad.
//!
//! This crate defines what peers and the relay say to each other:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomId`]): the JSON
//!   envelopes that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those envelopes are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! Document payloads (`update`, `state`) are CRDT data produced and
//! consumed by clients. They are carried as opaque strings and never
//! interpreted here.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientMessage, RoomId, ServerMessage};
