//! Room registry: maps room names to running room actors.

use std::collections::HashMap;

use syncpad_protocol::RoomId;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomHandle};

/// Owns one room actor per room name.
///
/// Rooms are created on first use and then live for as long as the
/// registry does. The gateway holds the registry in its shared state and
/// resolves a room for every new connection.
pub struct RoomRegistry {
    /// Check, spawn and insert all happen under this lock, so two
    /// connections racing on a new name always end up in the same room.
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,

    /// Settings handed to every room this registry spawns.
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns the room called `room_id`, starting its actor if this is
    /// the first time the name is seen.
    pub async fn resolve(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id) {
            return handle.clone();
        }

        let handle = spawn_room(room_id.clone(), self.config.clone());
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = rooms.len(), "room created");
        handle
    }

    /// Returns the number of rooms created so far.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Lists every room name, sorted.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> =
            self.rooms.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
