//! Core protocol types for Sipforge's wire format.
//!
//! Every type here travels on the wire: these are the structures that get
//! serialized to JSON, sent over the connection, and deserialized on the
//! other side. Mobile clients speak camelCase, so payload fields are renamed
//! accordingly; message tags stay snake_case to match the event names the
//! clients subscribe to.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque room code — the string players type to join the same party.
///
/// Newtype wrapper so a room code can't be confused with a pseudo or any
/// other string floating through the dispatch layer. `#[serde(transparent)]`
/// keeps the wire form a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Creates a room code from anything string-like.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// What kind of content a media item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Lowest difficulty a media item can carry.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty a media item can carry.
pub const MAX_DIFFICULTY: u8 = 3;

fn default_difficulty() -> u8 {
    MIN_DIFFICULTY
}

/// A submitted media item waiting in a room's queue (or currently drawn).
///
/// The `uri` is opaque to the server — clients upload content elsewhere and
/// only the reference circulates here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Opaque reference to the content.
    pub uri: String,

    /// Content kind. Serialized as `type` to match the client event shape.
    #[serde(rename = "type")]
    pub kind: MediaKind,

    /// Drink multiplier, [`MIN_DIFFICULTY`]..=[`MAX_DIFFICULTY`].
    /// Absent on the wire means 1.
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,

    /// Pseudo of the player who submitted this item.
    pub author: String,
}

impl Media {
    /// Clamps `difficulty` into the valid range.
    ///
    /// Applied at the submission boundary so the rest of the engine can
    /// trust the field without re-checking.
    pub fn normalized(mut self) -> Self {
        self.difficulty = self.difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        self
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Cumulative per-player counters, accumulated across every round of a
/// room's lifetime. All start at zero and only ever go up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub drinks_given: u32,
    pub drinks_taken: u32,
    pub times_targeted: u32,
    pub times_correct: u32,
    pub times_wrong: u32,
    pub times_denounced: u32,
}

/// One roster entry as clients see it: identity plus running stats.
///
/// The server additionally binds each player to a connection, but that
/// binding never leaves the process — `Player` is the whole wire story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Display name, unique within a room (case-sensitive).
    pub pseudo: String,

    /// Opaque avatar reference, if the player picked one.
    pub avatar: Option<String>,

    /// Cumulative counters, flattened into the entry.
    #[serde(flatten)]
    pub stats: PlayerStats,
}

impl Player {
    /// Creates a fresh roster entry with zeroed stats.
    pub fn new(pseudo: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            pseudo: pseudo.into(),
            avatar,
            stats: PlayerStats::default(),
        }
    }
}

/// One scored line of a `votes_revealed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResult {
    /// Pseudo of the voter.
    pub name: String,
    /// Pseudo the voter picked as the author.
    pub choice: String,
    /// Whether the pick matched the drawn media's author.
    pub correct: bool,
    /// Human-readable consequence, e.g. "distributes 2 drink(s)".
    pub action: String,
}

// ---------------------------------------------------------------------------
// ClientMessage — inbound events
// ---------------------------------------------------------------------------

/// Everything a client can send.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so a join looks
/// like `{ "type": "join_room", "code": "AB12CD", "pseudo": "Alice", ... }`.
/// Unknown tags and missing fields fail deserialization at the boundary —
/// there is no partially-valid message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join (or implicitly create) a room under a pseudo.
    JoinRoom {
        code: RoomCode,
        pseudo: String,
        avatar: Option<String>,
    },

    /// Append a batch of media to the room's queue.
    SubmitPosts { code: RoomCode, posts: Vec<Media> },

    /// Append a single media item to the room's queue.
    AddMedia { code: RoomCode, media: Media },

    /// Start the first round.
    StartGame { code: RoomCode },

    /// Ask for a replay of the current round state (reconnect resync).
    GetCurrentRound { code: RoomCode },

    /// Accuse another player. Social only — no scoring effect.
    Denounce {
        code: RoomCode,
        from: String,
        target: String,
    },

    /// Ask for the current roster.
    GetPlayers { code: RoomCode },

    /// Vote for who authored the drawn media.
    Vote {
        code: RoomCode,
        from: String,
        target: String,
    },

    /// Score and broadcast the round's votes, then clear them.
    RevealVotes { code: RoomCode },

    /// Read-only reveal, unicast to the requester (screen re-entry resync).
    RequestReveal { code: RoomCode },

    /// Ask for the final cumulative stats.
    GetEndStats { code: RoomCode },

    /// Tell the whole room the game is over.
    GoToEnd { code: RoomCode },

    /// Advance to the next round.
    NextRound { code: RoomCode },
}

impl ClientMessage {
    /// The room this message addresses. Every inbound event is room-scoped.
    pub fn code(&self) -> &RoomCode {
        match self {
            Self::JoinRoom { code, .. }
            | Self::SubmitPosts { code, .. }
            | Self::AddMedia { code, .. }
            | Self::StartGame { code }
            | Self::GetCurrentRound { code }
            | Self::Denounce { code, .. }
            | Self::GetPlayers { code }
            | Self::Vote { code, .. }
            | Self::RevealVotes { code }
            | Self::RequestReveal { code }
            | Self::GetEndStats { code }
            | Self::GoToEnd { code }
            | Self::NextRound { code } => code,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage — outbound events
// ---------------------------------------------------------------------------

/// Everything the server can send.
///
/// Same internally tagged encoding as [`ClientMessage`]. Payload fields are
/// camelCase (`roundNumber`, `hasMoreMedia`) because that is what the clients
/// destructure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// A validation failure, reported only to the connection that caused it.
    Error { message: String },

    /// Roster changed (join or departure). Join order preserved.
    RoomUpdate { players: Vec<Player> },

    /// A round just started.
    GameStarted,

    /// Full state of the round in progress.
    CurrentRound {
        media: Media,
        players: Vec<Player>,
        round_number: u32,
    },

    /// The round timer fired.
    RoundEnded,

    /// Voting is open.
    VotePhase,

    /// You were denounced. Sent only to the accused.
    Denounced { from: String },

    /// Roster snapshot, unicast on request.
    PlayersList { players: Vec<Player> },

    /// Your vote was recorded. Unicast to the voter.
    VoteConfirmed { target: String },

    /// The scored outcome of the current round's votes.
    VotesRevealed {
        /// The author's roster entry, absent if that player already left.
        author: Option<Player>,
        difficulty: u8,
        /// One line per vote, in the order votes arrived.
        results: Vec<VoteResult>,
        players: Vec<Player>,
        /// Whether the queue still holds undrawn media.
        has_more_media: bool,
    },

    /// Final cumulative stats, unicast on request.
    EndStats { players: Vec<Player> },

    /// The party is over.
    EndGame,
}

// =========================================================================
// Tests
// =========================================================================
