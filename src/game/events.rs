//! Game Events
//!
//! Notifications for whatever renders the game (terminal, UI, test harness).
//! Emitted by the controller and fanned out by the peer runtime; nothing in
//! the engine consumes them.

use serde::{Deserialize, Serialize};

use super::board::{Board, Player, Weight};
use super::state::{MoveError, Outcome};

/// The most recent placement, for highlighting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    /// Row the piece landed in.
    pub row: usize,
    /// Column played.
    pub column: usize,
    /// Whether this peer played it.
    pub local: bool,
}

/// Render event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Handshake finished; this peer plays as `role`.
    RoleAssigned {
        /// Local role.
        role: Player,
        /// Client id of the peer the role was resolved against.
        peer_id: String,
    },

    /// Board contents changed (placement or reset).
    BoardChanged {
        /// Full board snapshot.
        board: Board,
        /// `None` after a reset.
        last_move: Option<LastMove>,
    },

    /// Side to move changed.
    TurnChanged {
        /// Side to move.
        turn: Player,
        /// Whether the local peer is to move.
        local: bool,
    },

    /// The game finished.
    GameEnded {
        /// Win or draw.
        outcome: Outcome,
        /// Whether the local peer won.
        local_win: bool,
    },

    /// A local move was refused; nothing was published.
    MoveRejected {
        /// Requested column.
        column: usize,
        /// Requested weight.
        weight: Weight,
        /// Why.
        reason: MoveError,
    },

    /// The peer posted a fresh challenge while this game is over.
    RematchRequested {
        /// Challenger's client id.
        peer_id: String,
    },

    /// The bus stayed unreachable after every retry. Terminal.
    ConnectionFailed {
        /// Connection attempts made.
        attempts: u32,
    },
}

impl GameEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::RoleAssigned { .. } => "role_assigned",
            GameEvent::BoardChanged { .. } => "board_changed",
            GameEvent::TurnChanged { .. } => "turn_changed",
            GameEvent::GameEnded { .. } => "game_ended",
            GameEvent::MoveRejected { .. } => "move_rejected",
            GameEvent::RematchRequested { .. } => "rematch_requested",
            GameEvent::ConnectionFailed { .. } => "connection_failed",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = GameEvent::TurnChanged {
            turn: Player::Two,
            local: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "turn_changed");
        assert_eq!(json["turn"], "Two");
        assert_eq!(event.name(), "turn_changed");
    }
}
