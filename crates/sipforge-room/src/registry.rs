//! Room registry: creates rooms on first join, routes events by code, and
//! reaps rooms when their last player disconnects.
//!
//! The registry is a plain value owned by the dispatch layer (behind its
//! mutex), not process-global state — tests instantiate as many isolated
//! registries as they like.

use std::collections::HashMap;

use sipforge_protocol::{ClientMessage, RoomCode};
use sipforge_transport::ConnectionId;

use crate::room::spawn_room;
use crate::{DisconnectOutcome, OutboundSender, RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Tracks every active room and which room each connection is bound to.
///
/// Rooms exist exactly as long as they have players: the first join to an
/// unknown code creates the room, and the disconnect of the last player
/// destroys it (which also drops its round alarm).
pub struct RoomRegistry {
    /// Active rooms, keyed by code.
    rooms: HashMap<RoomCode, RoomHandle>,

    /// Maps each connection to the room it joined.
    /// A connection is in at most ONE room at a time (key invariant) —
    /// this index both enforces that and makes disconnect reaping O(1)
    /// instead of a scan over every room.
    conn_rooms: HashMap<ConnectionId, RoomCode>,

    /// Configuration stamped onto every room this registry creates.
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            conn_rooms: HashMap::new(),
            config,
        }
    }

    /// Binds a connection to a pseudo in the room `code`, creating the room
    /// if this is the first join to that code.
    ///
    /// The pseudo is validated *before* any room is created so a rejected
    /// join can't leave an empty room behind. The room actor applies the
    /// remaining rules (conflict, rebind) and broadcasts the roster.
    pub async fn join(
        &mut self,
        code: RoomCode,
        pseudo: String,
        avatar: Option<String>,
        conn: ConnectionId,
        sender: OutboundSender,
    ) -> Result<(), RoomError> {
        if pseudo.trim().is_empty() {
            return Err(RoomError::InvalidIdentity);
        }
        if let Some(current) = self.conn_rooms.get(&conn) {
            if *current != code {
                return Err(RoomError::AlreadyBound(conn));
            }
        }

        let handle = self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| {
                tracing::info!(room = %code, "room created");
                spawn_room(code.clone(), self.config.clone(), DEFAULT_CHANNEL_SIZE)
            })
            .clone();

        handle.join(conn, sender, pseudo, avatar).await?;
        self.conn_rooms.insert(conn, code);
        Ok(())
    }

    /// Routes a room-scoped event to the room it names.
    ///
    /// Returns `false` when no such room exists — the caller decides whether
    /// that deserves an error reply (starting a round does) or silence
    /// (submitting media to a dead room does not).
    pub async fn deliver(
        &mut self,
        origin: ConnectionId,
        origin_tx: &OutboundSender,
        msg: ClientMessage,
    ) -> bool {
        let code = msg.code().clone();
        // Clone the handle so the rooms map isn't borrowed across the await.
        let Some(handle) = self.rooms.get(&code).cloned() else {
            return false;
        };

        match handle.message(origin, origin_tx.clone(), msg).await {
            Ok(()) => true,
            Err(_) => {
                // The actor died out from under us; drop the stale entry.
                self.forget(&code);
                false
            }
        }
    }

    /// Reaps a dropped connection: removes its player record, broadcasts
    /// the shrunken roster to the survivors, and destroys the room if the
    /// roster emptied. A connection that never joined is a no-op.
    pub async fn disconnect(&mut self, conn: ConnectionId) {
        let Some(code) = self.conn_rooms.remove(&conn) else {
            return;
        };
        let Some(handle) = self.rooms.get(&code).cloned() else {
            return;
        };

        match handle.disconnect(conn).await {
            Ok(DisconnectOutcome { now_empty: true, .. }) => {
                self.remove(&code).await;
            }
            Ok(_) => {}
            Err(_) => {
                self.forget(&code);
            }
        }
    }

    /// Shuts a room down and removes it from the registry.
    ///
    /// Dropping the actor also drops its alarm, so no timeout can fire for
    /// a removed room.
    pub async fn remove(&mut self, code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(code) {
            let _ = handle.shutdown().await;
            self.conn_rooms.retain(|_, c| c != code);
            tracing::info!(room = %code, "room removed");
        }
    }

    /// Drops a room entry without the shutdown round-trip (actor already
    /// gone).
    fn forget(&mut self, code: &RoomCode) {
        self.rooms.remove(code);
        self.conn_rooms.retain(|_, c| c != code);
        tracing::warn!(room = %code, "room actor vanished, entry dropped");
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether a room with this code currently exists.
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// The room a connection is bound to, if any.
    pub fn connection_room(&self, conn: &ConnectionId) -> Option<&RoomCode> {
        self.conn_rooms.get(conn)
    }
}
