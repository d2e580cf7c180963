//! Room lifecycle and round orchestration for Sipforge.
//!
//! This is the stateful core of the party server. Each room runs as an
//! isolated Tokio task (actor model) owning its players, media queue, votes,
//! denunciation log, and round alarm.
//!
//! # Key types
//!
//! - [`PartyGame`] — the pure game rules (queue draws, vote scoring, stats)
//! - [`RoomRegistry`] — creates rooms on first join, reaps them when empty
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — room settings (round duration, rng seed)
//! - [`Outbound`] — an abstract delivery produced by a game operation

mod config;
mod error;
mod game;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use game::{Outbound, PartyGame, PlayerRecord};
pub use registry::RoomRegistry;
pub use room::{DisconnectOutcome, OutboundSender, RoomHandle};
