//! Wire protocol for Sipforge.
//!
//! This crate defines the "language" that the party clients and the server
//! speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`Media`], [`Player`],
//!   etc.) — the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer sits between transport (raw frames) and the room
//! engine (game rules). It knows nothing about connections or rooms beyond
//! the [`RoomCode`] every inbound message carries.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, MAX_DIFFICULTY, MIN_DIFFICULTY, Media, MediaKind, Player,
    PlayerStats, RoomCode, ServerMessage, VoteResult,
};
