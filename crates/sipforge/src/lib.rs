//! # Sipforge
//!
//! Backend for short-lived multiplayer party games: players join a shared
//! room by code, submit media, guess who posted what, vote, and rack up
//! drinking-game statistics round after round.
//!
//! The heavy lifting lives in the sub-crates — `sipforge-room` owns the
//! room/round engine, `sipforge-protocol` the wire format, and
//! `sipforge-transport` the WebSocket plumbing. This meta-crate glues them
//! into a runnable server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sipforge::prelude::*;
//!
//! # async fn run() -> Result<(), SipforgeError> {
//! let server = PartyServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::SipforgeError;
pub use server::{PartyServer, PartyServerBuilder};

/// The usual imports for building and talking to a Sipforge server.
pub mod prelude {
    pub use crate::{PartyServer, PartyServerBuilder, SipforgeError};
    pub use sipforge_protocol::{
        ClientMessage, Codec, JsonCodec, Media, MediaKind, Player, PlayerStats,
        RoomCode, ServerMessage, VoteResult,
    };
    pub use sipforge_room::{RoomConfig, RoomError, RoomRegistry};
    pub use sipforge_transport::ConnectionId;
}
