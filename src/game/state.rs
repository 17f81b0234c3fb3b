//! Game State
//!
//! Board, side to move, move counter and outcome for one game.
//! Applying a move is the only way the state advances; both the local player
//! and the validated remote peer go through [`GameState::apply_move`], so the
//! two boards stay in lockstep.

use serde::{Deserialize, Serialize};

use super::board::{Board, Piece, PlacementError, Player, Weight};
use super::win::{check_win, WinLine};

/// Light pieces each player starts with.
pub const INITIAL_LIGHT: u8 = 11;

/// Heavy pieces each player starts with.
pub const INITIAL_HEAVY: u8 = 10;

/// Move number of the first move of every game.
pub const FIRST_MOVE: u32 = 1;

// =============================================================================
// SUPPLY
// =============================================================================

/// Pieces each player may place per game, by weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSupply {
    /// Light pieces per player.
    pub light: u8,
    /// Heavy pieces per player.
    pub heavy: u8,
}

impl Default for PieceSupply {
    fn default() -> Self {
        Self {
            light: INITIAL_LIGHT,
            heavy: INITIAL_HEAVY,
        }
    }
}

impl PieceSupply {
    /// Allowance for one weight.
    pub fn of(&self, weight: Weight) -> u8 {
        match weight {
            Weight::Light => self.light,
            Weight::Heavy => self.heavy,
        }
    }
}

// =============================================================================
// OUTCOME / ERRORS
// =============================================================================

/// How a finished game ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Four in a line.
    Win(WinLine),
    /// Board full with no line.
    Draw,
}

impl Outcome {
    /// Winning player, if any.
    pub fn winner(&self) -> Option<Player> {
        match self {
            Outcome::Win(line) => Some(line.player),
            Outcome::Draw => None,
        }
    }
}

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum MoveError {
    /// No role has been negotiated yet.
    #[error("roles have not been negotiated")]
    NotNegotiated,

    /// It is the other player's turn.
    #[error("not your turn ({turn} to move)")]
    NotYourTurn {
        /// Side to move.
        turn: Player,
    },

    /// The game has ended; reset to play again.
    #[error("game is over")]
    GameOver,

    /// The player has used up this weight.
    #[error("{player} has no {weight} pieces left")]
    OutOfPieces {
        /// Player attempting the move.
        player: Player,
        /// Requested weight.
        weight: Weight,
    },

    /// The board refused the placement.
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// Result of an applied move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Number the move was played under.
    pub move_number: u32,
    /// Column played.
    pub column: usize,
    /// Row the piece landed in.
    pub row: usize,
    /// Piece placed.
    pub piece: Piece,
    /// Set if this move ended the game.
    pub outcome: Option<Outcome>,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// State of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current board.
    pub board: Board,
    /// Side to move.
    pub turn: Player,
    /// Number the next move will carry.
    pub move_number: u32,
    /// Set once a line is made or the board fills.
    pub over: bool,
    /// How the game ended.
    pub outcome: Option<Outcome>,
    /// Loser of the last decided game; opens the next one.
    pub last_loser: Option<Player>,
    /// Per-player allowance.
    pub supply: PieceSupply,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(PieceSupply::default())
    }
}

impl GameState {
    /// Fresh game, player 1 to move.
    pub fn new(supply: PieceSupply) -> Self {
        Self {
            board: Board::new(),
            turn: Player::One,
            move_number: FIRST_MOVE,
            over: false,
            outcome: None,
            last_loser: None,
            supply,
        }
    }

    /// Clear the board for a new game. The last loser moves first.
    pub fn reset(&mut self) {
        self.board = Board::new();
        self.turn = self.last_loser.unwrap_or(Player::One);
        self.move_number = FIRST_MOVE;
        self.over = false;
        self.outcome = None;
    }

    /// Winner of the finished game, if any.
    pub fn winner(&self) -> Option<Player> {
        self.outcome.as_ref().and_then(Outcome::winner)
    }

    /// Pieces of `weight` that `player` can still place this game.
    pub fn remaining(&self, player: Player, weight: Weight) -> u8 {
        let placed = self.board.count(Piece::new(player, weight));
        let placed = u8::try_from(placed).unwrap_or(u8::MAX);
        self.supply.of(weight).saturating_sub(placed)
    }

    /// Apply a move.
    ///
    /// On success the move number advances; then either the game ends (win or
    /// full board) or the turn passes. On error nothing changes.
    pub fn apply_move(&mut self, column: usize, piece: Piece) -> Result<Placement, MoveError> {
        if self.over {
            return Err(MoveError::GameOver);
        }

        let row = self.board.place(column, piece)?;
        let move_number = self.move_number;
        self.move_number += 1;

        if let Some(line) = check_win(&self.board) {
            self.last_loser = Some(line.player.other());
            self.finish(Outcome::Win(line));
        } else if self.board.is_full() {
            self.finish(Outcome::Draw);
        } else {
            self.turn = self.turn.other();
        }

        Ok(Placement {
            move_number,
            column,
            row,
            piece,
            outcome: self.outcome.clone(),
        })
    }

    fn finish(&mut self, outcome: Outcome) {
        self.over = true;
        self.outcome = Some(outcome);
    }
}

// =============================================================================
// TESTS
// =============================================================================
