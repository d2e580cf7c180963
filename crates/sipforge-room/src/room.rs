//! Room actor: an isolated Tokio task that owns one party's state.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. One command is processed at a time, so
//! vote-dedup, cancel-then-arm, and reveal-then-clear never interleave —
//! the actor model gives the room its atomicity without a single lock.
//!
//! The actor also owns the round alarm: the `select!` loop below is the only
//! place a timeout can fire, and it fires between commands, never inside one.

use std::collections::HashMap;

use sipforge_alarm::RoundAlarm;
use sipforge_protocol::{ClientMessage, RoomCode, ServerMessage};
use sipforge_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{PartyGame, RoomConfig, RoomError};
use crate::game::Outbound;

/// Channel sender for delivering outbound messages to one connection.
///
/// Unbounded and fire-and-forget: a slow or dead receiver never blocks the
/// room's event processing.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// What happened when a connection was detached from a room.
#[derive(Debug, Clone, Copy)]
pub struct DisconnectOutcome {
    /// Whether a player record was actually removed.
    pub removed: bool,
    /// Whether the room is now empty (and should be destroyed).
    pub now_empty: bool,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Bind a connection to a pseudo (creating the record if needed).
    Join {
        conn: ConnectionId,
        sender: OutboundSender,
        pseudo: String,
        avatar: Option<String>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Deliver a game event from a connection.
    Message {
        origin: ConnectionId,
        origin_tx: OutboundSender,
        msg: ClientMessage,
    },

    /// Detach a connection (transport dropped).
    Disconnect {
        conn: ConnectionId,
        reply: oneshot::Sender<DisconnectOutcome>,
    },

    /// Shut down the room.
    Shutdown,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. The registry holds
/// one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Sends a join request and waits for the verdict.
    pub async fn join(
        &self,
        conn: ConnectionId,
        sender: OutboundSender,
        pseudo: String,
        avatar: Option<String>,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                conn,
                sender,
                pseudo,
                avatar,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Delivers a game event (fire-and-forget).
    pub async fn message(
        &self,
        origin: ConnectionId,
        origin_tx: OutboundSender,
        msg: ClientMessage,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Message {
                origin,
                origin_tx,
                msg,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Detaches a connection and waits to learn whether the room emptied.
    pub async fn disconnect(
        &self,
        conn: ConnectionId,
    ) -> Result<DisconnectOutcome, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Disconnect {
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor. Runs inside a Tokio task.
struct RoomActor {
    game: PartyGame,
    config: RoomConfig,
    /// Per-connection outbound channels, registered at join time.
    senders: HashMap<ConnectionId, OutboundSender>,
    /// Media draw source. Seeded from config for deterministic tests.
    rng: StdRng,
    /// The round timeout. At most one deadline pending; dropped with the
    /// actor, so a destroyed room can't leave a timer behind.
    alarm: RoundAlarm,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands and the alarm until shutdown.
    async fn run(mut self) {
        tracing::info!(room = %self.game.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(RoomCommand::Join { conn, sender, pseudo, avatar, reply }) => {
                            let result = self.handle_join(conn, sender, pseudo, avatar);
                            let _ = reply.send(result);
                        }
                        Some(RoomCommand::Message { origin, origin_tx, msg }) => {
                            self.handle_message(origin, origin_tx, msg);
                        }
                        Some(RoomCommand::Disconnect { conn, reply }) => {
                            let outcome = self.handle_disconnect(conn);
                            let _ = reply.send(outcome);
                        }
                        Some(RoomCommand::Shutdown) | None => break,
                    }
                }
                _ = self.alarm.fired() => {
                    self.handle_round_timeout();
                }
            }
        }

        tracing::info!(room = %self.game.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        conn: ConnectionId,
        sender: OutboundSender,
        pseudo: String,
        avatar: Option<String>,
    ) -> Result<(), RoomError> {
        let outs = self.game.join(&pseudo, avatar, conn)?;
        // Register before dispatching so the joiner sees their own roster.
        self.senders.insert(conn, sender);
        self.dispatch(outs, None);
        Ok(())
    }

    fn handle_message(
        &mut self,
        origin: ConnectionId,
        origin_tx: OutboundSender,
        msg: ClientMessage,
    ) {
        let outs = match msg {
            // Joins travel through RoomCommand::Join so the registry can
            // track the binding; one arriving here is a routing bug.
            ClientMessage::JoinRoom { .. } => {
                tracing::warn!(
                    room = %self.game.code(),
                    %origin,
                    "join_room routed as plain message, ignoring"
                );
                Vec::new()
            }

            ClientMessage::SubmitPosts { posts, .. } => {
                self.game.submit_media(posts);
                Vec::new()
            }
            ClientMessage::AddMedia { media, .. } => {
                self.game.submit_media(vec![media]);
                Vec::new()
            }

            ClientMessage::StartGame { .. } | ClientMessage::NextRound { .. } => {
                self.start_round(&origin_tx)
            }

            ClientMessage::GetCurrentRound { .. } => self.game.current_round(),
            ClientMessage::Denounce { from, target, .. } => {
                self.game.denounce(&from, &target)
            }
            ClientMessage::GetPlayers { .. } => self.game.players_list(),
            ClientMessage::Vote { from, target, .. } => self.game.vote(&from, &target),
            ClientMessage::RevealVotes { .. } => self.game.reveal(),
            ClientMessage::RequestReveal { .. } => self.game.peek_reveal(),
            ClientMessage::GetEndStats { .. } => self.game.end_stats(),
            ClientMessage::GoToEnd { .. } => self.game.end_game(),
        };

        self.dispatch(outs, Some(&origin_tx));
    }

    /// Starts (or advances to) a round, arming the alarm on success.
    ///
    /// On failure the caller alone hears about it — the rest of the room is
    /// untouched, and any round already in flight keeps its deadline.
    fn start_round(&mut self, origin_tx: &OutboundSender) -> Vec<Outbound> {
        match self.game.start_round(&mut self.rng) {
            Ok(outs) => {
                // Cancel-then-arm: the previous round's deadline dies before
                // the new one exists. Two rounds can never both time out.
                self.alarm.arm(self.config.round_duration);
                outs
            }
            Err(e) => {
                let _ = origin_tx.send(ServerMessage::Error {
                    message: e.to_string(),
                });
                Vec::new()
            }
        }
    }

    fn handle_disconnect(&mut self, conn: ConnectionId) -> DisconnectOutcome {
        self.senders.remove(&conn);
        let removed = match self.game.remove_connection(conn) {
            Some(outs) => {
                self.dispatch(outs, None);
                true
            }
            None => false,
        };
        DisconnectOutcome {
            removed,
            now_empty: self.game.is_empty(),
        }
    }

    /// The round alarm fired: close the round and open voting.
    fn handle_round_timeout(&mut self) {
        tracing::info!(
            room = %self.game.code(),
            round = self.game.round_number(),
            "round timed out, vote phase open"
        );
        self.broadcast(ServerMessage::RoundEnded);
        self.broadcast(ServerMessage::VotePhase);
    }

    /// Resolves abstract deliveries against the live connection senders.
    fn dispatch(&self, outs: Vec<Outbound>, origin_tx: Option<&OutboundSender>) {
        for out in outs {
            match out {
                Outbound::Broadcast(msg) => self.broadcast(msg),
                Outbound::Origin(msg) => {
                    if let Some(tx) = origin_tx {
                        let _ = tx.send(msg);
                    }
                }
                Outbound::Direct(conn, msg) => self.send_to(conn, msg),
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }

    /// Sends to a single bound connection. Silently drops if the receiver
    /// is gone (player mid-disconnect).
    fn send_to(&self, conn: ConnectionId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&conn) {
            let _ = sender.send(msg);
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command channel — if it fills up, senders wait.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let actor = RoomActor {
        game: PartyGame::new(code.clone()),
        config,
        senders: HashMap::new(),
        rng,
        alarm: RoundAlarm::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
