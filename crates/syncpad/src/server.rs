//! `SyncpadServer` builder and server loop.
//!
//! This is the entry point for running a relay. It ties together all the
//! layers: transport → protocol → room.

use std::sync::Arc;
use std::time::Duration;

use syncpad_protocol::{Codec, JsonCodec};
use syncpad_room::{RoomConfig, RoomRegistry};
use syncpad_transport::WebSocketTransport;

use crate::SyncpadError;
use crate::handler::handle_connection;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_PEER_BUFFER: usize = 256;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry does its own locking.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) peer_buffer: usize,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Syncpad server.
///
/// # Example
///
/// ```rust,no_run
/// use syncpad::prelude::*;
///
/// # async fn start() -> Result<(), SyncpadError> {
/// let server = SyncpadServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct SyncpadServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    peer_buffer: usize,
    idle_timeout: Option<Duration>,
}

impl SyncpadServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            peer_buffer: DEFAULT_PEER_BUFFER,
            idle_timeout: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how many outbound messages may queue up for one connection
    /// before the room treats it as dead.
    pub fn peer_buffer(mut self, size: usize) -> Self {
        self.peer_buffer = size.max(1);
        self
    }

    /// Closes connections that send nothing for `timeout`. Disabled by
    /// default.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<SyncpadServer, SyncpadError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(self.room_config),
            codec: JsonCodec,
            peer_buffer: self.peer_buffer,
            idle_timeout: self.idle_timeout,
        });

        Ok(SyncpadServer { transport, state })
    }
}

impl Default for SyncpadServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Syncpad relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SyncpadServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl SyncpadServer {
    /// Creates a new builder.
    pub fn builder() -> SyncpadServerBuilder {
        SyncpadServerBuilder::new()
    }
}

impl<C: Codec> SyncpadServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a task for each accepted TCP connection that performs the
    /// WebSocket upgrade and then runs the connection handler, so a client
    /// stuck in its handshake never delays other clients. Failed accepts
    /// and upgrades are logged and the loop continues. Runs until the
    /// process is terminated.
    pub async fn run(self) -> Result<(), SyncpadError> {
        tracing::info!(addr = ?self.local_addr().ok(), "syncpad server running");

        loop {
            match self.transport.accept_pending().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer_addr = pending.peer_addr();
                        let conn = match pending.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(
                                    %peer_addr,
                                    error = %e,
                                    "websocket upgrade failed"
                                );
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = SyncpadServerBuilder::default();
        assert_eq!(builder.bind_addr, "127.0.0.1:8080");
        assert_eq!(builder.peer_buffer, DEFAULT_PEER_BUFFER);
        assert_eq!(builder.idle_timeout, None);
        assert_eq!(builder.room_config, RoomConfig::default());
    }

    #[test]
    fn test_builder_peer_buffer_is_at_least_one() {
        let builder = SyncpadServer::builder().peer_buffer(0);
        assert_eq!(builder.peer_buffer, 1);
    }

    #[tokio::test]
    async fn test_build_binds_ephemeral_port() {
        let server = SyncpadServer::builder()
            .bind("127.0.0.1:0")
            .build()
            .await
            .expect("should bind");
        let addr = server.local_addr().expect("local addr");
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_build_fails_on_bad_address() {
        let result = SyncpadServer::builder().bind("not an address").build().await;
        assert!(matches!(result, Err(SyncpadError::Transport(_))));
    }
}
