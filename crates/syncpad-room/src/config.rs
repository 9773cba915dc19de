//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomRegistry`](crate::RoomRegistry)
/// creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Capacity of each room's command mailbox. Senders wait when it is
    /// full.
    pub channel_size: usize,

    /// How long a member asked for a snapshot may take to answer before
    /// the request is handed to another member. `None` waits forever.
    pub snapshot_timeout: Option<Duration>,

    /// Send `y_init` to a member that has nobody to sync from (the first
    /// member of a room, or joiners released because every state holder
    /// left).
    pub announce_empty_document: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            snapshot_timeout: Some(Duration::from_secs(5)),
            announce_empty_document: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RoomConfig::default();
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.snapshot_timeout, Some(Duration::from_secs(5)));
        assert!(config.announce_empty_document);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = RoomConfig {
            channel_size: 8,
            snapshot_timeout: None,
            announce_empty_document: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        let decoded: RoomConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, decoded);
    }
}
