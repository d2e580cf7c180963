//! Unified error type for the Sipforge server.

use sipforge_protocol::ProtocolError;
use sipforge_room::RoomError;
use sipforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Callers of the `sipforge` meta-crate deal with this single type; the
/// `#[from]` attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SipforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (identity conflict, empty queue, missing room).
    #[error(transparent)]
    Room(#[from] RoomError),
}
