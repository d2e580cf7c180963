//! The party game state: players, the media queue, votes, denunciations,
//! and the scoring that ties them together.
//!
//! Everything here is synchronous and pure — no channels, no clocks, no
//! sockets. Each operation mutates the state and returns the list of
//! [`Outbound`] messages it produced; the room actor owns the delivery (and
//! the round alarm). Keeping the rules free of I/O is what makes them
//! unit-testable with nothing but a seeded rng.

use rand::Rng;

use sipforge_protocol::{Media, Player, RoomCode, ServerMessage, VoteResult};
use sipforge_transport::ConnectionId;

use crate::RoomError;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Where an outbound message should go.
///
/// Game operations describe deliveries abstractly; the actor resolves them
/// against its live connection senders. Fire-and-forget either way.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Every connection currently in the room.
    Broadcast(ServerMessage),
    /// Only the connection whose event triggered this operation.
    Origin(ServerMessage),
    /// One specific bound connection (e.g. the accused in a denunciation).
    Direct(ConnectionId, ServerMessage),
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One player's server-side record: the wire roster entry plus the
/// transport binding, which never leaves the process.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    /// The roster entry as clients see it.
    pub player: Player,
    /// Current transport binding. Reassigned when the same pseudo rejoins
    /// over a new connection.
    pub conn: ConnectionId,
}

/// A recorded vote for the current round. Cleared when a round starts or
/// when a reveal is broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Vote {
    from: String,
    target: String,
}

/// A recorded accusation. The log is never cleared for the room's lifetime —
/// unlike votes, denunciations accumulate across rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Denunciation {
    from: String,
    target: String,
}

// ---------------------------------------------------------------------------
// PartyGame
// ---------------------------------------------------------------------------

/// The complete mutable state of one room.
///
/// Owned by exactly one room actor; every operation runs to completion
/// before the next command is taken, so none of these methods need to guard
/// against interleaving.
pub struct PartyGame {
    code: RoomCode,
    /// Players in join order.
    players: Vec<PlayerRecord>,
    /// The session leader. Set to the first joiner at creation and promoted
    /// to the next-oldest surviving member when the host departs.
    host: Option<String>,
    /// Submitted media waiting to be drawn. Order carries no meaning.
    media_queue: Vec<Media>,
    /// The item in play, if a round is active. Once drawn, an item never
    /// returns to the queue.
    current_media: Option<Media>,
    votes: Vec<Vote>,
    denunciations: Vec<Denunciation>,
    /// Monotonic round counter, 0 while still in the lobby.
    round_number: u32,
}

impl PartyGame {
    /// Creates an empty room state for the given code.
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            players: Vec::new(),
            host: None,
            media_queue: Vec::new(),
            current_media: None,
            votes: Vec::new(),
            denunciations: Vec::new(),
            round_number: 0,
        }
    }

    // -- Accessors ---------------------------------------------------------

    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The roster as clients see it, in join order.
    pub fn roster(&self) -> Vec<Player> {
        self.players.iter().map(|r| r.player.clone()).collect()
    }

    /// The current session leader's pseudo.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Number of players currently in the room.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// `true` when the last player has left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Undrawn media left in the queue.
    pub fn media_remaining(&self) -> usize {
        self.media_queue.len()
    }

    /// The item in play, if a round is active.
    pub fn current_media(&self) -> Option<&Media> {
        self.current_media.as_ref()
    }

    /// Rounds started so far.
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Votes recorded for the current round.
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Accusations recorded over the room's lifetime.
    pub fn denunciation_count(&self) -> usize {
        self.denunciations.len()
    }

    /// The full accusation log, oldest first, as (accuser, accused) pairs.
    pub fn denunciation_log(&self) -> impl Iterator<Item = (&str, &str)> {
        self.denunciations
            .iter()
            .map(|d| (d.from.as_str(), d.target.as_str()))
    }

    fn record(&self, pseudo: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|r| r.player.pseudo == pseudo)
    }

    fn record_mut(&mut self, pseudo: &str) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|r| r.player.pseudo == pseudo)
    }

    // -- Join / leave ------------------------------------------------------

    /// Adds a player, or rebinds an existing pseudo to its connection.
    ///
    /// Rules:
    /// - a blank pseudo is rejected ([`RoomError::InvalidIdentity`]);
    /// - a pseudo held by a *different* connection is rejected
    ///   ([`RoomError::IdentityConflict`]) — names are first-come;
    /// - the same pseudo on the same connection is an idempotent rejoin;
    /// - a connection that already holds a record under another pseudo is
    ///   rejected ([`RoomError::AlreadyBound`]).
    ///
    /// On success, broadcasts the updated roster to the whole room.
    pub fn join(
        &mut self,
        pseudo: &str,
        avatar: Option<String>,
        conn: ConnectionId,
    ) -> Result<Vec<Outbound>, RoomError> {
        if pseudo.trim().is_empty() {
            return Err(RoomError::InvalidIdentity);
        }

        match self.players.iter().position(|r| r.player.pseudo == pseudo) {
            Some(idx) if self.players[idx].conn != conn => {
                return Err(RoomError::IdentityConflict(pseudo.to_string()));
            }
            Some(idx) => {
                // Idempotent rejoin: refresh the binding.
                self.players[idx].conn = conn;
            }
            None => {
                if self.players.iter().any(|r| r.conn == conn) {
                    return Err(RoomError::AlreadyBound(conn));
                }
                self.players.push(PlayerRecord {
                    player: Player::new(pseudo, avatar),
                    conn,
                });
                if self.host.is_none() {
                    self.host = Some(pseudo.to_string());
                }
            }
        }

        tracing::info!(
            room = %self.code,
            %pseudo,
            players = self.players.len(),
            "player joined"
        );

        Ok(vec![Outbound::Broadcast(ServerMessage::RoomUpdate {
            players: self.roster(),
        })])
    }

    /// Removes whichever player is bound to `conn`.
    ///
    /// Returns `None` if the connection holds no record here. Otherwise the
    /// remaining members get the updated roster, and the host role moves to
    /// the next-oldest member if the host just left. The caller checks
    /// [`is_empty`](Self::is_empty) afterwards to decide whether the room
    /// should be destroyed.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Option<Vec<Outbound>> {
        let idx = self.players.iter().position(|r| r.conn == conn)?;
        let leaver = self.players.remove(idx);

        if self.host.as_deref() == Some(leaver.player.pseudo.as_str()) {
            self.host = self.players.first().map(|r| r.player.pseudo.clone());
        }

        tracing::info!(
            room = %self.code,
            pseudo = %leaver.player.pseudo,
            players = self.players.len(),
            "player left"
        );

        Some(vec![Outbound::Broadcast(ServerMessage::RoomUpdate {
            players: self.roster(),
        })])
    }

    // -- Media queue / rounds ----------------------------------------------

    /// Appends submitted media to the queue.
    ///
    /// Difficulty is clamped into range here so every later read can trust
    /// the field.
    pub fn submit_media(&mut self, items: Vec<Media>) {
        let count = items.len();
        self.media_queue
            .extend(items.into_iter().map(Media::normalized));
        tracing::debug!(room = %self.code, count, "media queued");
    }

    /// Draws a media item and opens a new round.
    ///
    /// The draw is a uniform index into the remaining queue, without
    /// replacement — a drawn item never comes back. Votes reset for the new
    /// round; the denunciation log does not. The caller arms the round alarm
    /// on success.
    pub fn start_round(&mut self, rng: &mut impl Rng) -> Result<Vec<Outbound>, RoomError> {
        if self.media_queue.is_empty() {
            return Err(RoomError::EmptyQueue);
        }

        let idx = rng.random_range(0..self.media_queue.len());
        let media = self.media_queue.swap_remove(idx);
        self.current_media = Some(media.clone());
        self.votes.clear();
        self.round_number += 1;

        tracing::info!(
            room = %self.code,
            round = self.round_number,
            remaining = self.media_queue.len(),
            "round started"
        );

        Ok(vec![
            Outbound::Broadcast(ServerMessage::GameStarted),
            Outbound::Broadcast(ServerMessage::CurrentRound {
                media,
                players: self.roster(),
                round_number: self.round_number,
            }),
        ])
    }

    /// Replays the current round to the requester (reconnect resync).
    /// Nothing is sent while the room sits in the lobby or between reveals.
    pub fn current_round(&self) -> Vec<Outbound> {
        match &self.current_media {
            Some(media) => vec![Outbound::Origin(ServerMessage::CurrentRound {
                media: media.clone(),
                players: self.roster(),
                round_number: self.round_number,
            })],
            None => Vec::new(),
        }
    }

    // -- Denunciations -----------------------------------------------------

    /// Records an accusation and tips off the accused.
    ///
    /// Purely social: the log entry and the `timesDenounced` counter have no
    /// effect on scoring. The notification only goes out if the target is
    /// actually in the room.
    pub fn denounce(&mut self, from: &str, target: &str) -> Vec<Outbound> {
        self.denunciations.push(Denunciation {
            from: from.to_string(),
            target: target.to_string(),
        });

        let mut out = Vec::new();
        if let Some(accused) = self.record_mut(target) {
            accused.player.stats.times_denounced += 1;
            out.push(Outbound::Direct(
                accused.conn,
                ServerMessage::Denounced {
                    from: from.to_string(),
                },
            ));
        }

        tracing::debug!(room = %self.code, %from, %target, "denunciation recorded");
        out
    }

    // -- Voting ------------------------------------------------------------

    /// Records a vote for who authored the drawn media.
    ///
    /// First vote wins: a voter's repeat calls change nothing and confirm
    /// nothing. A correct pick lets the voter distribute drinks; a wrong
    /// pick makes them drink, both scaled by the media's difficulty. The
    /// target's `timesTargeted` bumps regardless of correctness.
    pub fn vote(&mut self, from: &str, target: &str) -> Vec<Outbound> {
        if self.votes.iter().any(|v| v.from == from) {
            return Vec::new();
        }
        // No round in play — a stale vote from a lagging client. Drop it.
        let Some(media) = &self.current_media else {
            return Vec::new();
        };

        let correct = target == media.author;
        let difficulty = u32::from(media.difficulty);

        self.votes.push(Vote {
            from: from.to_string(),
            target: target.to_string(),
        });

        if let Some(voter) = self.record_mut(from) {
            let stats = &mut voter.player.stats;
            if correct {
                stats.times_correct += 1;
                stats.drinks_given += difficulty;
            } else {
                stats.times_wrong += 1;
                stats.drinks_taken += difficulty;
            }
        }
        if let Some(voted) = self.record_mut(target) {
            voted.player.stats.times_targeted += 1;
        }

        tracing::debug!(room = %self.code, %from, %target, correct, "vote recorded");

        vec![Outbound::Origin(ServerMessage::VoteConfirmed {
            target: target.to_string(),
        })]
    }

    // -- Reveal ------------------------------------------------------------

    /// Scores and broadcasts the round's votes, then clears them so a stale
    /// vote set can't leak into the next round. No-op without a drawn item.
    pub fn reveal(&mut self) -> Vec<Outbound> {
        let Some(payload) = self.reveal_payload() else {
            return Vec::new();
        };
        self.votes.clear();
        tracing::info!(room = %self.code, round = self.round_number, "votes revealed");
        vec![Outbound::Broadcast(payload)]
    }

    /// Read-only reveal, unicast to the requester. Repeatable — a client
    /// re-entering the reveal screen can resync as often as it likes.
    pub fn peek_reveal(&self) -> Vec<Outbound> {
        match self.reveal_payload() {
            Some(payload) => vec![Outbound::Origin(payload)],
            None => Vec::new(),
        }
    }

    fn reveal_payload(&self) -> Option<ServerMessage> {
        let media = self.current_media.as_ref()?;

        // The author may already have left the room; clients render that as
        // an anonymous reveal.
        let author = self.record(&media.author).map(|r| r.player.clone());

        let results = self
            .votes
            .iter()
            .map(|v| {
                let correct = v.target == media.author;
                let action = if correct {
                    format!("distributes {} drink(s)", media.difficulty)
                } else {
                    format!("drinks {} drink(s)", media.difficulty)
                };
                VoteResult {
                    name: v.from.clone(),
                    choice: v.target.clone(),
                    correct,
                    action,
                }
            })
            .collect();

        Some(ServerMessage::VotesRevealed {
            author,
            difficulty: media.difficulty,
            results,
            players: self.roster(),
            has_more_media: !self.media_queue.is_empty(),
        })
    }

    // -- Roster / end-of-game ----------------------------------------------

    /// Roster snapshot for the requester.
    pub fn players_list(&self) -> Vec<Outbound> {
        vec![Outbound::Origin(ServerMessage::PlayersList {
            players: self.roster(),
        })]
    }

    /// Final cumulative stats for the requester.
    pub fn end_stats(&self) -> Vec<Outbound> {
        vec![Outbound::Origin(ServerMessage::EndStats {
            players: self.roster(),
        })]
    }

    /// Tells the whole room the party is over. No state change.
    pub fn end_game(&self) -> Vec<Outbound> {
        tracing::info!(room = %self.code, "end of game");
        vec![Outbound::Broadcast(ServerMessage::EndGame)]
    }
}

// =========================================================================
// Tests
// =========================================================================
