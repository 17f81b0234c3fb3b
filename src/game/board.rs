//! Board Engine
//!
//! 6×7 grid holding two weights of piece.
//!
//! Row 0 is the entry edge of every column. Light pieces always enter at
//! row 0 and float there as a contiguous run. A heavy piece comes to rest at
//! the far end of the column's free space and takes the floating run with it:
//! the run is re-stacked directly behind the heavy piece, in order.
//! Heavy pieces never move once placed.
//!
//! In every column reachable through [`Board::place`] the occupied cells form
//! at most two blocks: the floating light run starting at row 0, and a settled
//! block ending at row `ROWS - 1`.
//!
//! Everything here is deterministic. Both peers replay the same authenticated
//! moves and must arrive at identical boards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of rows.
pub const ROWS: usize = 6;

/// Number of columns.
pub const COLS: usize = 7;

// =============================================================================
// PLAYER / PIECE
// =============================================================================

/// One of the two fixed player identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    /// Player 1 (yellow).
    One = 1,
    /// Player 2 (red).
    Two = 2,
}

impl Player {
    /// Player number (1 or 2).
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Get player from number (1 or 2).
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    /// The opponent.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Owner encoded by a colour tag (either weight).
    pub fn from_color_tag(tag: &str) -> Option<Self> {
        [Player::One, Player::Two].into_iter().find(|player| {
            Weight::ALL
                .iter()
                .any(|weight| Piece::new(*player, *weight).color_tag() == tag)
        })
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

/// Piece weight class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weight {
    /// Enters at row 0 and floats.
    Light,
    /// Settles beneath the floating lights.
    Heavy,
}

impl Weight {
    /// Both weights, light first.
    pub const ALL: [Weight; 2] = [Weight::Light, Weight::Heavy];

    /// Wire name (`"light"` / `"heavy"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Weight::Light => "light",
            Weight::Heavy => "heavy",
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placed or placeable piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// Owning player.
    pub owner: Player,
    /// Weight class.
    pub weight: Weight,
}

impl Piece {
    /// Create a piece.
    pub const fn new(owner: Player, weight: Weight) -> Self {
        Self { owner, weight }
    }

    /// Is this a light piece?
    #[inline]
    pub fn is_light(self) -> bool {
        self.weight == Weight::Light
    }

    /// Is this a heavy piece?
    #[inline]
    pub fn is_heavy(self) -> bool {
        self.weight == Weight::Heavy
    }

    /// Colour tag carried in move messages.
    pub fn color_tag(self) -> &'static str {
        match (self.owner, self.weight) {
            (Player::One, Weight::Light) => "#ffff99",
            (Player::One, Weight::Heavy) => "#ffff00",
            (Player::Two, Weight::Light) => "#ff5050",
            (Player::Two, Weight::Heavy) => "#ff0000",
        }
    }

    /// Single-character symbol used in text renderings.
    pub fn symbol(self) -> char {
        match (self.owner, self.weight) {
            (Player::One, Weight::Light) => 'y',
            (Player::One, Weight::Heavy) => 'Y',
            (Player::Two, Weight::Light) => 'r',
            (Player::Two, Weight::Heavy) => 'R',
        }
    }

    /// Parse a symbol produced by [`Piece::symbol`].
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'y' => Some(Piece::new(Player::One, Weight::Light)),
            'Y' => Some(Piece::new(Player::One, Weight::Heavy)),
            'r' => Some(Piece::new(Player::Two, Weight::Light)),
            'R' => Some(Piece::new(Player::Two, Weight::Heavy)),
            _ => None,
        }
    }
}

// =============================================================================
// PLACEMENT ERRORS
// =============================================================================

/// Why a placement was refused. The board is unchanged in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementError {
    /// Column index outside `0..COLS`.
    #[error("column {column} does not exist")]
    InvalidColumn {
        /// Requested column.
        column: usize,
    },

    /// Column already holds `ROWS` pieces.
    #[error("column {column} is full")]
    ColumnFull {
        /// Requested column.
        column: usize,
    },

    /// Row 0 holds a heavy piece, so no light piece can enter.
    #[error("column {column} is capped by a heavy piece")]
    LightBlockedByHeavy {
        /// Requested column.
        column: usize,
    },

    /// Shifting the floating run would collide with a settled piece.
    #[error("no room for another light piece in column {column}")]
    LightOverflow {
        /// Requested column.
        column: usize,
    },
}

// =============================================================================
// BOARD
// =============================================================================

/// The game grid. `cells[row][column]`, row 0 is the entry edge.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Piece>; COLS]; ROWS],
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from text rows (row 0 first) using `.`, `y`, `Y`, `r`, `R`.
    ///
    /// Any layout is accepted, including ones placement could never produce;
    /// useful for win-detection fixtures and debugging. Returns `None` on a
    /// bad symbol or row length.
    pub fn from_rows(rows: [&str; ROWS]) -> Option<Self> {
        let mut board = Board::new();
        for (row, text) in rows.iter().enumerate() {
            if text.chars().count() != COLS {
                return None;
            }
            for (column, symbol) in text.chars().enumerate() {
                board.cells[row][column] = match symbol {
                    '.' => None,
                    other => Some(Piece::from_symbol(other)?),
                };
            }
        }
        Some(board)
    }

    /// Piece at `(row, column)`; `None` if empty or out of range.
    #[inline]
    pub fn get(&self, row: usize, column: usize) -> Option<Piece> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// All cells, row 0 first.
    pub fn cells(&self) -> &[[Option<Piece>; COLS]; ROWS] {
        &self.cells
    }

    /// Number of occupied cells in a column.
    pub fn column_count(&self, column: usize) -> usize {
        (0..ROWS).filter(|&row| self.get(row, column).is_some()).count()
    }

    /// Number of heavy pieces in a column.
    pub fn heavy_count(&self, column: usize) -> usize {
        (0..ROWS)
            .filter(|&row| self.get(row, column).is_some_and(Piece::is_heavy))
            .count()
    }

    /// Is the column at capacity?
    pub fn is_column_full(&self, column: usize) -> bool {
        self.column_count(column) >= ROWS
    }

    /// Is every column at capacity?
    pub fn is_full(&self) -> bool {
        (0..COLS).all(|column| self.is_column_full(column))
    }

    /// How many copies of `piece` are on the board.
    pub fn count(&self, piece: Piece) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| **cell == Some(piece))
            .count()
    }

    /// Place a piece, dispatching on its weight.
    ///
    /// Returns the row the new piece landed in.
    pub fn place(&mut self, column: usize, piece: Piece) -> Result<usize, PlacementError> {
        match piece.weight {
            Weight::Light => self.place_light(column, piece),
            Weight::Heavy => self.place_heavy(column, piece),
        }
    }

    /// Drop a heavy piece.
    ///
    /// It lands at `ROWS - n - 1` (`n` occupied cells). The light run floating
    /// at row 0 is lifted out and re-stacked directly behind the heavy piece,
    /// preserving its order.
    pub fn place_heavy(&mut self, column: usize, piece: Piece) -> Result<usize, PlacementError> {
        self.check_open(column)?;

        let landing = ROWS - self.column_count(column) - 1;
        let floating = self.floating_run(column, ROWS);

        for row in 0..floating.len() {
            self.cells[row][column] = None;
        }
        self.cells[landing][column] = Some(piece);
        // floating ⊆ occupied, so landing + floating.len() < ROWS
        for (offset, light) in floating.into_iter().enumerate() {
            self.cells[landing + 1 + offset][column] = Some(light);
        }

        Ok(landing)
    }

    /// Drop a light piece. Light pieces always enter at row 0.
    ///
    /// If row 0 is taken by a light piece, the floating run (bounded by
    /// `ROWS - heavy_count - 1`) moves one row further in to make room. If
    /// row 0 is taken by a heavy piece the column refuses lights outright.
    pub fn place_light(&mut self, column: usize, piece: Piece) -> Result<usize, PlacementError> {
        self.check_open(column)?;

        match self.cells[0][column] {
            None => {
                self.cells[0][column] = Some(piece);
                Ok(0)
            }
            Some(top) if top.is_heavy() => Err(PlacementError::LightBlockedByHeavy { column }),
            Some(_) => {
                let max_light_row = ROWS.saturating_sub(self.heavy_count(column) + 1);
                let run = self.floating_run(column, max_light_row + 1).len();

                if run > max_light_row || self.cells[run][column].is_some() {
                    return Err(PlacementError::LightOverflow { column });
                }

                for row in (0..run).rev() {
                    self.cells[row + 1][column] = self.cells[row][column];
                }
                self.cells[0][column] = Some(piece);
                Ok(0)
            }
        }
    }

    /// Contiguous light pieces from row 0, scanning at most `limit` rows.
    fn floating_run(&self, column: usize, limit: usize) -> Vec<Piece> {
        (0..limit.min(ROWS))
            .map_while(|row| self.get(row, column).filter(|piece| piece.is_light()))
            .collect()
    }

    fn check_open(&self, column: usize) -> Result<(), PlacementError> {
        if column >= COLS {
            return Err(PlacementError::InvalidColumn { column });
        }
        if self.is_column_full(column) {
            return Err(PlacementError::ColumnFull { column });
        }
        Ok(())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, row) in self.cells.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            for cell in row {
                let symbol = cell.map_or('.', Piece::symbol);
                write!(f, "{}", symbol)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const Y: Piece = Piece::new(Player::One, Weight::Light);
    const YY: Piece = Piece::new(Player::One, Weight::Heavy);
    const R: Piece = Piece::new(Player::Two, Weight::Light);
    const RR: Piece = Piece::new(Player::Two, Weight::Heavy);

    fn column(board: &Board, column: usize) -> Vec<Option<Piece>> {
        (0..ROWS).map(|row| board.get(row, column)).collect()
    }

    #[test]
    fn test_light_enters_at_row_zero() {
        let mut board = Board::new();
        assert_eq!(board.place_light(2, Y), Ok(0));
        assert_eq!(board.place_light(2, R), Ok(0));

        // Newest light at row 0, older one pushed in by one
        assert_eq!(board.get(0, 2), Some(R));
        assert_eq!(board.get(1, 2), Some(Y));
        assert_eq!(board.column_count(2), 2);
    }

    #[test]
    fn test_heavy_on_empty_column_settles_at_far_end() {
        let mut board = Board::new();
        assert_eq!(board.place_heavy(4, YY), Ok(ROWS - 1));
        assert_eq!(board.place_heavy(4, RR), Ok(ROWS - 2));
        assert_eq!(board.get(5, 4), Some(YY));
        assert_eq!(board.get(4, 4), Some(RR));
    }

    #[test]
    fn test_three_lights_then_heavy() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.place(3, Y).unwrap();
        }
        assert_eq!(board.place(3, RR), Ok(2));

        assert_eq!(
            column(&board, 3),
            vec![None, None, Some(RR), Some(Y), Some(Y), Some(Y)]
        );
        assert_eq!(board.column_count(3), 4);
    }

    #[test]
    fn test_heavy_carries_floating_run_in_order() {
        let mut board = Board::new();
        board.place(0, YY).unwrap(); // row 5
        board.place(0, Y).unwrap(); // row 0
        board.place(0, R).unwrap(); // R at 0, Y at 1

        assert_eq!(board.place(0, RR), Ok(2));
        assert_eq!(
            column(&board, 0),
            vec![None, None, Some(RR), Some(R), Some(Y), Some(YY)]
        );
    }

    #[test]
    fn test_light_after_heavy_floats_with_gap() {
        let mut board = Board::new();
        board.place(1, RR).unwrap();
        assert_eq!(board.place(1, Y), Ok(0));
        assert_eq!(
            column(&board, 1),
            vec![Some(Y), None, None, None, None, Some(RR)]
        );
    }

    #[test]
    fn test_full_column_rejected_without_mutation() {
        let mut board = Board::new();
        board.place(6, YY).unwrap();
        for _ in 0..5 {
            board.place(6, R).unwrap();
        }
        assert!(board.is_column_full(6));

        let before = board.clone();
        assert_eq!(board.place(6, Y), Err(PlacementError::ColumnFull { column: 6 }));
        assert_eq!(board.place(6, YY), Err(PlacementError::ColumnFull { column: 6 }));
        assert_eq!(board, before);
    }

    #[test]
    fn test_invalid_column() {
        let mut board = Board::new();
        assert_eq!(
            board.place(COLS, Y),
            Err(PlacementError::InvalidColumn { column: COLS })
        );
        assert_eq!(board, Board::new());
    }

    #[test]
    fn test_light_blocked_by_heavy_at_entry_row() {
        let mut board = Board::from_rows([
            "Y......",
            ".......",
            ".......",
            ".......",
            ".......",
            ".......",
        ])
        .unwrap();
        let before = board.clone();
        assert_eq!(
            board.place_light(0, R),
            Err(PlacementError::LightBlockedByHeavy { column: 0 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_light_overflow_into_settled_piece() {
        // Not reachable through placement: the floating run touches a settled
        // piece while the column still has room elsewhere
        let mut board = Board::from_rows([
            "y......",
            "y......",
            "R......",
            ".......",
            ".......",
            ".......",
        ])
        .unwrap();
        let before = board.clone();
        assert_eq!(
            board.place_light(0, R),
            Err(PlacementError::LightOverflow { column: 0 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_count_and_display() {
        let mut board = Board::new();
        board.place(0, Y).unwrap();
        board.place(1, Y).unwrap();
        board.place(2, RR).unwrap();
        assert_eq!(board.count(Y), 2);
        assert_eq!(board.count(RR), 1);
        assert_eq!(board.count(R), 0);

        let text = board.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), ROWS);
        assert_eq!(lines[0], "yy.....");
        assert_eq!(lines[5], "..R....");
        assert_eq!(Board::from_rows(lines.try_into().unwrap()), Some(board));
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        let rows = [".......", ".......", ".......", ".......", ".......", "......"];
        assert!(Board::from_rows(rows).is_none());
        let rows = [".......", ".......", ".......", ".......", ".......", "...x..."];
        assert!(Board::from_rows(rows).is_none());
    }

    #[test]
    fn test_color_tags_identify_owner() {
        for player in [Player::One, Player::Two] {
            for weight in Weight::ALL {
                let tag = Piece::new(player, weight).color_tag();
                assert_eq!(Player::from_color_tag(tag), Some(player));
            }
        }
        assert_eq!(Player::from_color_tag("#00ff00"), None);
    }

    fn piece_strategy() -> impl Strategy<Value = Piece> {
        (prop::bool::ANY, prop::bool::ANY).prop_map(|(first, light)| {
            let owner = if first { Player::One } else { Player::Two };
            let weight = if light { Weight::Light } else { Weight::Heavy };
            Piece::new(owner, weight)
        })
    }

    proptest! {
        #[test]
        fn prop_column_never_overflows(moves in prop::collection::vec((0..COLS, piece_strategy()), 0..120)) {
            let mut board = Board::new();
            for (col, piece) in moves {
                let before = board.clone();
                match board.place(col, piece) {
                    Ok(row) => {
                        prop_assert!(row < ROWS);
                        prop_assert_eq!(board.get(row, col), Some(piece));
                        prop_assert_eq!(board.column_count(col), before.column_count(col) + 1);
                    }
                    Err(_) => prop_assert_eq!(&board, &before),
                }
                prop_assert!(board.column_count(col) <= ROWS);
            }
        }

        #[test]
        fn prop_heavy_pieces_never_move(moves in prop::collection::vec((0..COLS, piece_strategy()), 0..120)) {
            let mut board = Board::new();
            for (col, piece) in moves {
                let before = board.clone();
                let Ok(row) = board.place(col, piece) else { continue };

                // Every heavy already on the board is still where it was
                for r in 0..ROWS {
                    for c in 0..COLS {
                        if let Some(existing) = before.get(r, c) {
                            if existing.is_heavy() {
                                prop_assert_eq!(board.get(r, c), Some(existing));
                            }
                        }
                    }
                }

                // Lights present before a heavy lands end up behind it
                if piece.is_heavy() {
                    for r in 0..ROWS {
                        if board.get(r, col).is_some_and(Piece::is_light) {
                            prop_assert!(r > row || before.get(r, col).is_none());
                        }
                    }
                    let lights_before = (0..ROWS)
                        .filter(|&r| before.get(r, col).is_some_and(Piece::is_light))
                        .count();
                    let lights_behind = (row + 1..ROWS)
                        .filter(|&r| board.get(r, col).is_some_and(Piece::is_light))
                        .count();
                    prop_assert_eq!(lights_before, lights_behind);
                }
            }
        }
    }
}
