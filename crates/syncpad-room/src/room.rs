//! Room actor: an isolated Tokio task that owns one room's membership.
//!
//! Each room runs in its own task and is driven through an mpsc mailbox.
//! Commands are handled strictly one at a time in arrival order, so the
//! member map and the snapshot queue need no locks.
//!
//! The room never keeps a copy of the document. A peer joining an active
//! room is queued, and an existing member is asked (`state_request`) for
//! a full snapshot; when one arrives (`y_state`) it is handed to every
//! queued joiner at once.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use syncpad_protocol::{RoomId, ServerMessage};
use syncpad_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};

use crate::{RoomConfig, RoomError};

/// Channel a room uses to deliver messages to one member's connection.
///
/// The room only ever calls `try_send`: a closed or full channel counts as
/// a dead peer and the member is removed. Dropping the sender is how the
/// room releases a connection.
pub type PeerSender = mpsc::Sender<Arc<ServerMessage>>;

/// Commands sent to a room actor through its mailbox.
pub(crate) enum RoomCommand {
    Join {
        peer: ConnectionId,
        sender: PeerSender,
    },
    Leave {
        peer: ConnectionId,
    },
    Update {
        origin: ConnectionId,
        client_id: String,
        update: String,
    },
    Snapshot {
        origin: ConnectionId,
        state: String,
    },
    Cursor {
        origin: ConnectionId,
        client_id: String,
        start: u64,
        end: u64,
    },
    CursorRequest {
        origin: ConnectionId,
        client_id: String,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
}

/// A point-in-time view of a room's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// The room's name.
    pub room_id: RoomId,
    /// Number of current members (the presence count).
    pub members: usize,
    /// Number of members still waiting for a snapshot.
    pub pending: usize,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone; every connection in the room holds one.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's name.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Adds a connection to the room. Its messages will be delivered
    /// through `sender`.
    pub async fn join(
        &self,
        peer: ConnectionId,
        sender: PeerSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Join { peer, sender }).await
    }

    /// Removes a connection from the room. Leaving twice is harmless.
    pub async fn leave(&self, peer: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Leave { peer }).await
    }

    /// Fans a document update out to every member, the origin included.
    pub async fn relay_update(
        &self,
        origin: ConnectionId,
        client_id: String,
        update: String,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Update {
            origin,
            client_id,
            update,
        })
        .await
    }

    /// Offers a full document snapshot to every member waiting for one.
    pub async fn offer_snapshot(
        &self,
        origin: ConnectionId,
        state: String,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Snapshot { origin, state }).await
    }

    /// Fans a cursor position out to every member.
    pub async fn move_cursor(
        &self,
        origin: ConnectionId,
        client_id: String,
        start: u64,
        end: u64,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Cursor {
            origin,
            client_id,
            start,
            end,
        })
        .await
    }

    /// Asks every member to re-announce its cursor.
    pub async fn request_cursors(
        &self,
        origin: ConnectionId,
        client_id: String,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::CursorRequest { origin, client_id })
            .await
    }

    /// Returns the room's current member and queue sizes.
    ///
    /// The reply is produced after every command sent before it has been
    /// handled.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The member that was last asked for a snapshot.
struct SnapshotRequest {
    provider: ConnectionId,
    deadline: Option<Instant>,
}

/// Why a member is being removed. Only used for logging.
#[derive(Debug, Clone, Copy)]
enum Departure {
    Left,
    DeliveryFailed,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    /// Keyed by connection id, so iteration visits the oldest connection
    /// first.
    members: BTreeMap<ConnectionId, PeerSender>,
    /// Members that joined an active room and have not had a snapshot yet.
    pending: VecDeque<ConnectionId>,
    in_flight: Option<SnapshotRequest>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until every handle has been dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        loop {
            let deadline = self.in_flight.as_ref().and_then(|r| r.deadline);
            tokio::select! {
                biased;

                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                () = time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.handle_snapshot_timeout();
                }
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer, sender } => {
                self.handle_join(peer, sender);
            }
            RoomCommand::Leave { peer } => {
                self.remove_member(peer, Departure::Left);
            }
            RoomCommand::Update {
                origin,
                client_id,
                update,
            } => {
                if self.is_member(origin, "y_update") {
                    self.broadcast(ServerMessage::YUpdate { client_id, update });
                }
            }
            RoomCommand::Snapshot { origin, state } => {
                if self.is_member(origin, "y_state") {
                    self.handle_snapshot(origin, state);
                }
            }
            RoomCommand::Cursor {
                origin,
                client_id,
                start,
                end,
            } => {
                if self.is_member(origin, "cursor") {
                    self.broadcast(ServerMessage::Cursor {
                        client_id,
                        start,
                        end,
                    });
                }
            }
            RoomCommand::CursorRequest { origin, client_id } => {
                if self.is_member(origin, "cursor_request") {
                    self.broadcast(ServerMessage::CursorRequest {
                        from: client_id,
                    });
                }
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
        }
    }

    fn handle_join(&mut self, peer: ConnectionId, sender: PeerSender) {
        if self.members.contains_key(&peer) {
            tracing::debug!(
                room_id = %self.room_id,
                %peer,
                "duplicate join ignored"
            );
            return;
        }

        self.members.insert(peer, sender);
        tracing::info!(
            room_id = %self.room_id,
            %peer,
            members = self.members.len(),
            "peer joined"
        );
        self.broadcast_presence();

        // The presence broadcast may already have pruned the joiner.
        if !self.members.contains_key(&peer) {
            return;
        }

        if self.members.len() == 1 {
            // Nobody to sync from.
            if self.config.announce_empty_document {
                self.deliver(peer, Arc::new(ServerMessage::YInit));
            }
            return;
        }

        self.pending.push_back(peer);
        // An outstanding request keeps its provider and its deadline, so a
        // stream of joiners cannot postpone rotation away from a silent
        // provider.
        let provider = self
            .in_flight
            .as_ref()
            .map(|r| r.provider)
            .filter(|p| self.is_provider_candidate(*p))
            .or_else(|| self.provider_candidates().next());
        self.request_snapshot(provider);
    }

    fn handle_snapshot(&mut self, origin: ConnectionId, state: String) {
        self.in_flight = None;
        if self.pending.is_empty() {
            tracing::debug!(
                room_id = %self.room_id,
                %origin,
                "snapshot offered with nobody waiting"
            );
            return;
        }

        let waiting: Vec<ConnectionId> = self.pending.drain(..).collect();
        let msg = Arc::new(ServerMessage::YSync { state });
        let mut delivered = 0;
        for peer in waiting {
            if self.deliver(peer, Arc::clone(&msg)) {
                delivered += 1;
            }
        }
        tracing::debug!(
            room_id = %self.room_id,
            %origin,
            delivered,
            "snapshot delivered"
        );
    }

    fn handle_snapshot_timeout(&mut self) {
        let Some(current) = self.in_flight.take().map(|r| r.provider) else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let next = self
            .provider_candidates()
            .find(|p| *p > current)
            .or_else(|| self.provider_candidates().next());
        tracing::warn!(
            room_id = %self.room_id,
            provider = %current,
            next = ?next,
            pending = self.pending.len(),
            "snapshot request timed out"
        );
        self.request_snapshot(next);
    }

    /// Asks `provider` for a snapshot, or releases the queue when nobody
    /// is able to provide one.
    fn request_snapshot(&mut self, provider: Option<ConnectionId>) {
        let Some(provider) = provider else {
            self.release_pending();
            return;
        };

        let deadline = match &self.in_flight {
            Some(r) if r.provider == provider => r.deadline,
            _ => self.config.snapshot_timeout.map(|t| Instant::now() + t),
        };
        self.in_flight = Some(SnapshotRequest { provider, deadline });
        tracing::debug!(
            room_id = %self.room_id,
            %provider,
            pending = self.pending.len(),
            "requesting snapshot"
        );
        // On failure the provider is pruned and remove_member picks the
        // next one.
        self.deliver(provider, Arc::new(ServerMessage::StateRequest));
    }

    /// Empties the queue when no remaining member holds document state.
    fn release_pending(&mut self) {
        self.in_flight = None;
        if self.pending.is_empty() {
            return;
        }

        let released: Vec<ConnectionId> = self.pending.drain(..).collect();
        tracing::info!(
            room_id = %self.room_id,
            released = released.len(),
            "no member holds document state, releasing pending joiners"
        );
        if self.config.announce_empty_document {
            let msg = Arc::new(ServerMessage::YInit);
            for peer in released {
                self.deliver(peer, Arc::clone(&msg));
            }
        }
    }

    /// Removes a member and releases its connection. Used both for
    /// explicit leaves and for peers whose channel failed. No-op for
    /// non-members.
    fn remove_member(&mut self, peer: ConnectionId, why: Departure) {
        if self.members.remove(&peer).is_none() {
            return;
        }
        self.pending.retain(|p| *p != peer);
        if self.pending.is_empty() {
            // Nobody left to serve.
            self.in_flight = None;
        }

        tracing::info!(
            room_id = %self.room_id,
            %peer,
            reason = ?why,
            members = self.members.len(),
            "peer left"
        );
        self.broadcast_presence();

        let was_provider = self
            .in_flight
            .as_ref()
            .is_some_and(|r| r.provider == peer);
        if was_provider {
            self.in_flight = None;
            if !self.pending.is_empty() {
                let next = self.provider_candidates().next();
                self.request_snapshot(next);
            }
        }
    }

    fn broadcast_presence(&mut self) {
        self.broadcast(ServerMessage::Presence {
            count: self.members.len(),
        });
    }

    /// Sends `msg` to every member, pruning the ones that cannot take it.
    fn broadcast(&mut self, msg: ServerMessage) {
        let msg = Arc::new(msg);
        let failed: Vec<ConnectionId> = self
            .members
            .iter()
            .filter(|(_, tx)| tx.try_send(Arc::clone(&msg)).is_err())
            .map(|(peer, _)| *peer)
            .collect();

        for peer in failed {
            tracing::debug!(
                room_id = %self.room_id,
                %peer,
                kind = msg.kind(),
                "delivery failed, pruning peer"
            );
            self.remove_member(peer, Departure::DeliveryFailed);
        }
    }

    /// Sends `msg` to one member. Returns `false` if `peer` is not a
    /// member or could not take the message (and was pruned).
    fn deliver(&mut self, peer: ConnectionId, msg: Arc<ServerMessage>) -> bool {
        let Some(tx) = self.members.get(&peer) else {
            return false;
        };
        let kind = msg.kind();
        if tx.try_send(msg).is_ok() {
            return true;
        }

        tracing::debug!(
            room_id = %self.room_id,
            %peer,
            kind,
            "delivery failed, pruning peer"
        );
        self.remove_member(peer, Departure::DeliveryFailed);
        false
    }

    /// Members that can be asked for a snapshot, oldest first. Anyone
    /// still waiting for a snapshot has nothing to give.
    fn provider_candidates(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members
            .keys()
            .copied()
            .filter(|p| !self.pending.contains(p))
    }

    fn is_provider_candidate(&self, peer: ConnectionId) -> bool {
        self.members.contains_key(&peer) && !self.pending.contains(&peer)
    }

    /// Events from a connection that was pruned while they sat in the
    /// mailbox are dropped.
    fn is_member(&self, origin: ConnectionId, kind: &'static str) -> bool {
        let member = self.members.contains_key(&origin);
        if !member {
            tracing::debug!(
                room_id = %self.room_id,
                %origin,
                kind,
                "event from non-member ignored"
            );
        }
        member
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            members: self.members.len(),
            pending: self.pending.len(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RoomActor {
        room_id: room_id.clone(),
        config,
        members: BTreeMap::new(),
        pending: VecDeque::new(),
        in_flight: None,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
