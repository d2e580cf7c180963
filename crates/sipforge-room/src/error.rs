//! Error types for the room layer.

use sipforge_protocol::RoomCode;
use sipforge_transport::ConnectionId;

/// Errors that can occur during room operations.
///
/// Every variant's display string is client-facing: validation failures are
/// forwarded verbatim to the originating connection as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The pseudo is missing or blank.
    #[error("pseudo must be a non-empty name")]
    InvalidIdentity,

    /// The pseudo is already bound to a different connection in this room.
    #[error("pseudo \"{0}\" is already taken in this room")]
    IdentityConflict(String),

    /// The connection is already bound to a player record elsewhere.
    /// One connection maps to at most one player at a time.
    #[error("connection {0} is already in a room")]
    AlreadyBound(ConnectionId),

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Starting or advancing a round with nothing left to draw.
    #[error("no media left in the queue")]
    EmptyQueue,

    /// The room's command channel is closed — the actor is gone.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
