//! Game Logic Module
//!
//! Board physics, win detection and per-game state. 100% deterministic and
//! free of I/O; the network layer feeds it authenticated moves.
//!
//! ## Module Structure
//!
//! - `board`: Grid, pieces and light/heavy placement
//! - `win`: Four-in-a-line detection
//! - `state`: Turn, move counter, outcome, reset
//! - `events`: Render events

pub mod board;
pub mod win;
pub mod state;
pub mod events;

// Re-export key types
pub use board::{Board, Piece, PlacementError, Player, Weight, COLS, ROWS};
pub use win::{check_win, Direction, WinLine};
pub use state::{GameState, MoveError, Outcome, PieceSupply, Placement};
pub use events::{GameEvent, LastMove};
