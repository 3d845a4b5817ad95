//! Win detection.

use crate::{Board, Cell, Symbol};
use tracing::instrument;

/// Winning triples, in enumeration order: rows, then columns, then diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the first line fully held by one symbol, if any.
#[instrument(skip(board))]
pub fn find_winning_line(board: &Board) -> Option<(Symbol, [usize; 3])> {
    WIN_LINES.iter().find_map(|&line| {
        let [a, b, c] = line.map(|index| board.get(index));
        match (a, b, c) {
            (Some(Cell::Occupied(p1)), Some(Cell::Occupied(p2)), Some(Cell::Occupied(p3)))
                if p1 == p2 && p2 == p3 =>
            {
                Some((p1, line))
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(symbol: Symbol, indices: &[usize]) -> Board {
        indices.iter().map(|&i| (i, symbol)).collect()
    }

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(find_winning_line(&Board::new()), None);
    }

    #[test]
    fn test_every_line_detected() {
        for line in WIN_LINES {
            for symbol in [Symbol::X, Symbol::O] {
                let board = board_with(symbol, &line);
                assert_eq!(find_winning_line(&board), Some((symbol, line)));
            }
        }
    }

    #[test]
    fn test_mixed_line_is_not_a_win() {
        let board: Board = [(0, Symbol::X), (1, Symbol::O), (2, Symbol::X)]
            .into_iter()
            .collect();
        assert_eq!(find_winning_line(&board), None);
    }

    #[test]
    fn test_rows_take_priority_over_columns() {
        // Top row and left column both complete.
        let board = board_with(Symbol::X, &[0, 1, 2, 3, 6]);
        assert_eq!(find_winning_line(&board), Some((Symbol::X, [0, 1, 2])));
    }
}
