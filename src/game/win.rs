//! Win Detection
//!
//! Four contiguous cells with the same owner, in any of four directions.
//! Weight is ignored. The scan is row-major with columns ascending, and
//! directions are tried in a fixed order, so both peers report the same line
//! when several exist.

use serde::{Deserialize, Serialize};

use super::board::{Board, Player, COLS, ROWS};

/// Pieces in a winning line.
pub const LINE_LENGTH: usize = 4;

/// Direction of a line, as a step from its first cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Along a row.
    Horizontal,
    /// Along a column.
    Vertical,
    /// Row and column both increasing.
    DiagonalDownRight,
    /// Row increasing, column decreasing.
    DiagonalDownLeft,
}

impl Direction {
    /// Scan order.
    pub const ALL: [Direction; 4] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalDownRight,
        Direction::DiagonalDownLeft,
    ];

    /// `(row, column)` step.
    pub fn step(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::DiagonalDownRight => (1, 1),
            Direction::DiagonalDownLeft => (1, -1),
        }
    }
}

/// A winning line.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinLine {
    /// Owner of all four cells.
    pub player: Player,
    /// Direction the line runs in.
    pub direction: Direction,
    /// `(row, column)` coordinates, starting from the scan origin.
    pub cells: [(usize, usize); LINE_LENGTH],
}

/// First winning line on the board, if any.
pub fn check_win(board: &Board) -> Option<WinLine> {
    for row in 0..ROWS {
        for column in 0..COLS {
            let Some(piece) = board.get(row, column) else {
                continue;
            };
            for direction in Direction::ALL {
                if let Some(cells) = line_from(board, row, column, direction, piece.owner) {
                    return Some(WinLine {
                        player: piece.owner,
                        direction,
                        cells,
                    });
                }
            }
        }
    }
    None
}

fn line_from(
    board: &Board,
    row: usize,
    column: usize,
    direction: Direction,
    owner: Player,
) -> Option<[(usize, usize); LINE_LENGTH]> {
    let (row_step, column_step) = direction.step();
    let mut cells = [(row, column); LINE_LENGTH];

    for (index, cell) in cells.iter_mut().enumerate().skip(1) {
        let r = row.checked_add_signed(row_step * index as isize)?;
        let c = column.checked_add_signed(column_step * index as isize)?;
        if board.get(r, c)?.owner != owner {
            return None;
        }
        *cell = (r, c);
    }

    Some(cells)
}

// =============================================================================
// TESTS
// =============================================================================
