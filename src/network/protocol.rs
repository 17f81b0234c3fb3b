//! Wire Protocol
//!
//! Topic names and JSON message shapes shared with the other peers on the
//! bus. Field names are fixed by the peers already deployed (`move`,
//! `clientId`, `type`), so the Rust names are mapped with serde renames.
//!
//! ## Topics
//!
//! | Topic                          | Retained | Payload            |
//! |--------------------------------|----------|--------------------|
//! | `<prefix>/challenge`           | yes      | [`ChallengeMessage`] |
//! | `<prefix>/challenge_accepted`  | yes      | [`ChallengeMessage`] |
//! | `<prefix>/move`                | no       | [`MoveMessage`]    |
//!
//! An empty payload on any topic means "cleared".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::mac::AuthCodec;
use crate::game::board::Weight;

/// Default topic prefix.
pub const DEFAULT_TOPIC_PREFIX: &str = "light_and_heavy";

/// `move` value every challenge carries.
pub const CHALLENGE_SENTINEL: u32 = 1;

// =============================================================================
// TOPICS
// =============================================================================

/// The three topics a peer uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    /// Handshake offers.
    Challenge,
    /// Handshake answers, published by the role-2 peer.
    ChallengeAccepted,
    /// Authenticated moves.
    Move,
}

impl Topic {
    /// All topics, in subscription order.
    pub const ALL: [Topic; 3] = [Topic::Challenge, Topic::ChallengeAccepted, Topic::Move];

    /// Topic suffix under the prefix.
    pub fn suffix(self) -> &'static str {
        match self {
            Topic::Challenge => "challenge",
            Topic::ChallengeAccepted => "challenge_accepted",
            Topic::Move => "move",
        }
    }

    /// Whether publishes on this topic are retained by the bus.
    pub fn is_retained(self) -> bool {
        !matches!(self, Topic::Move)
    }

    /// Full topic name under `prefix`.
    pub fn path(self, prefix: &str) -> String {
        format!("{}/{}", prefix, self.suffix())
    }

    /// Resolve a full topic name back to a topic.
    pub fn from_path(prefix: &str, path: &str) -> Option<Self> {
        let suffix = path.strip_prefix(prefix)?.strip_prefix('/')?;
        Topic::ALL.into_iter().find(|topic| topic.suffix() == suffix)
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

/// Challenge and challenge-accepted payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeMessage {
    /// Always [`CHALLENGE_SENTINEL`].
    #[serde(rename = "move")]
    pub move_number: u32,
    /// Sender's current handshake nonce.
    pub nonce: String,
    /// Tag over `"{move}{nonce}"`.
    pub hmac: String,
    /// Sender's client id.
    #[serde(rename = "clientId")]
    pub client_id: String,
}

/// Move payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    /// Move number, starting at 1 each game.
    #[serde(rename = "move")]
    pub move_number: u32,
    /// Column played.
    pub col: u8,
    /// Piece weight.
    #[serde(rename = "type")]
    pub weight: Weight,
    /// Colour tag; identifies the owner.
    pub color: String,
    /// Fresh per move.
    pub nonce: String,
    /// Tag over [`MoveMessage::mac_input`].
    pub hmac: String,
    /// Sender's client id.
    #[serde(rename = "clientId")]
    pub client_id: String,
}

impl MoveMessage {
    /// Authenticated string: `"{move + col}{type}{nonce}{color}"`.
    pub fn mac_input(&self) -> String {
        move_mac_input(self.move_number, self.col, self.weight, &self.nonce, &self.color)
    }
}

/// MAC input of a move.
///
/// Move number and column are added before concatenation; the deployed peers
/// compute the tag that way, so this has to match them.
pub fn move_mac_input(move_number: u32, col: u8, weight: Weight, nonce: &str, color: &str) -> String {
    let sum = u64::from(move_number) + u64::from(col);
    AuthCodec::canonical(&[&sum, &weight, &nonce, &color])
}

// =============================================================================
// REJECTIONS
// =============================================================================

/// Why an inbound payload was discarded.
///
/// These are expected on a shared bus and never escalate past a log line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// Empty payload: the topic was cleared.
    #[error("topic cleared")]
    Cleared,

    /// Not valid JSON of the expected shape.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Carries this peer's own nonce or client id.
    #[error("own message echoed back")]
    SelfEcho,

    /// Move number does not match the local counter.
    #[error("expected move {expected}, got {got}")]
    OutOfSequence {
        /// Local move counter.
        expected: u32,
        /// Number carried by the message.
        got: u32,
    },

    /// Tag does not verify under the shared secret.
    #[error("authentication failed")]
    BadMac,

    /// Challenge with a `move` other than the sentinel.
    #[error("challenge carries move {0}")]
    BadSentinel(u32),

    /// Colour tag names no known piece.
    #[error("unknown colour tag {0:?}")]
    UnknownColor(String),

    /// Column outside the board.
    #[error("column {0} out of range")]
    InvalidColumn(u8),
}

impl Rejection {
    /// Worth a warning rather than a debug line.
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Rejection::BadMac)
    }
}

/// Parse a payload, treating empty or whitespace-only bodies as cleared.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, Rejection> {
    let text = std::str::from_utf8(payload).map_err(|e| Rejection::Malformed(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(Rejection::Cleared);
    }
    serde_json::from_str(text).map_err(|e| Rejection::Malformed(e.to_string()))
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ChallengeMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl MoveMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

// =============================================================================
// TESTS
// =============================================================================
