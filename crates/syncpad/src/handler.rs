//! Per-connection handler: room selection and message routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Pick the room from the `room` query parameter and join it
//!   2. Loop: forward decoded frames to the room, write the room's
//!      messages back to the socket
//!   3. Leave the room and close the socket

use std::sync::Arc;

use syncpad_protocol::{ClientMessage, Codec, RoomId, ServerMessage};
use syncpad_room::{RoomError, RoomHandle};
use syncpad_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::SyncpadError;
use crate::server::ServerState;

/// Drop guard that removes the connection from its room when the handler
/// exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async send.
struct MembershipGuard {
    peer: ConnectionId,
    room: RoomHandle,
}

impl Drop for MembershipGuard {
    fn drop(&mut self) {
        let peer = self.peer;
        let room = self.room.clone();
        tokio::spawn(async move {
            if let Err(e) = room.leave(peer).await {
                tracing::debug!(%peer, error = %e, "leave failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), SyncpadError> {
    let conn_id = conn.id();
    let room_id = room_from_query(conn.query());
    let room = state.registry.resolve(&room_id).await;

    let (tx, mut rx) = mpsc::channel(state.peer_buffer);
    room.join(conn_id, tx).await?;
    let _guard = MembershipGuard {
        peer: conn_id,
        room: room.clone(),
    };
    tracing::info!(%conn_id, %room_id, "peer connected");

    let result = relay(&conn, &state, &room, &mut rx).await;

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    // _guard drops here → leave fires.
    result
}

/// Moves frames between the socket and the room until either side ends.
async fn relay<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    room: &RoomHandle,
    outbound: &mut mpsc::Receiver<Arc<ServerMessage>>,
) -> Result<(), SyncpadError> {
    let conn_id = conn.id();
    let mut idle_deadline = state.idle_timeout.map(|t| Instant::now() + t);

    loop {
        tokio::select! {
            frame = conn.recv() => {
                let data = match frame {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        return Ok(());
                    }
                };
                if let Some(t) = state.idle_timeout {
                    idle_deadline = Some(Instant::now() + t);
                }

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(
                            %conn_id, error = %e, "dropping malformed frame"
                        );
                        continue;
                    }
                };
                dispatch(room, conn_id, msg).await?;
            }

            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    // The room dropped our sender: we were pruned.
                    tracing::debug!(%conn_id, "released by room");
                    return Ok(());
                };
                let bytes = state.codec.encode(&*msg)?;
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "send failed");
                    return Ok(());
                }
            }

            () = time::sleep_until(idle_deadline.unwrap_or_else(Instant::now)),
                if idle_deadline.is_some() =>
            {
                tracing::info!(%conn_id, "connection timed out");
                return Ok(());
            }
        }
    }
}

/// Routes one decoded client message to the room.
async fn dispatch(
    room: &RoomHandle,
    origin: ConnectionId,
    msg: ClientMessage,
) -> Result<(), RoomError> {
    match msg {
        ClientMessage::YUpdate { client_id, update } => {
            room.relay_update(origin, client_id, update).await
        }
        ClientMessage::YState { state } => {
            room.offer_snapshot(origin, state).await
        }
        ClientMessage::Cursor {
            client_id,
            start,
            end,
        } => room.move_cursor(origin, client_id, start, end).await,
        ClientMessage::CursorRequest { client_id } => {
            room.request_cursors(origin, client_id).await
        }
    }
}

/// Room named by the first `room` query parameter, percent-decoded.
/// Falls back to [`RoomId::DEFAULT`] when it is missing or empty.
fn room_from_query(query: Option<&str>) -> RoomId {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "room")
                .map(|(_, value)| value.into_owned())
        })
        .filter(|name| !name.is_empty())
        .map(RoomId::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_from_query_plain() {
        assert_eq!(room_from_query(Some("room=doc1")), RoomId::from("doc1"));
    }

    #[test]
    fn test_room_from_query_missing_is_default() {
        assert_eq!(room_from_query(None), RoomId::default());
        assert_eq!(room_from_query(Some("")), RoomId::default());
        assert_eq!(room_from_query(Some("lang=en")), RoomId::default());
    }

    #[test]
    fn test_room_from_query_empty_value_is_default() {
        assert_eq!(room_from_query(Some("room=")), RoomId::default());
        assert_eq!(room_from_query(Some("room")), RoomId::default());
    }

    #[test]
    fn test_room_from_query_percent_decoded() {
        assert_eq!(
            room_from_query(Some("room=team%2Fnotes%201")),
            RoomId::from("team/notes 1")
        );
    }

    #[test]
    fn test_room_from_query_among_other_params() {
        assert_eq!(
            room_from_query(Some("token=abc&room=doc2&room=ignored")),
            RoomId::from("doc2")
        );
    }
}
