//! Win detection logic for tic-tac-toe.

use super::super::{Board, Cell, Mark};
use tracing::instrument;

/// The eight winning lines: rows, columns, diagonals.
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

/// Returns the mark holding a completed line, if any.
///
/// On a malformed board with several completed lines the first line in
/// [`WIN_LINES`] order wins.
#[instrument(skip(board))]
pub fn check_winner(board: &Board) -> Option<Mark> {
    WIN_LINES.iter().find_map(|[a, b, c]| {
        let cells = board.cells();
        match cells[*a] {
            Cell::Occupied(mark) if cells[*b] == cells[*a] && cells[*c] == cells[*a] => Some(mark),
            _ => None,
        }
    })
}

/// Returns true if writing `mark` at `index` would complete a line.
///
/// The cell itself is not checked for emptiness.
pub fn completes_line(board: &Board, index: usize, mark: Mark) -> bool {
    WIN_LINES
        .iter()
        .filter(|line| line.contains(&index))
        .any(|line| {
            line.iter()
                .filter(|&&i| i != index)
                .all(|&i| board.get(i) == Some(Cell::Occupied(mark)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(marks: &[(usize, Mark)]) -> Board {
        marks
            .iter()
            .fold(Board::empty(), |b, (i, m)| b.with_mark(*i, *m).unwrap())
    }

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(check_winner(&Board::empty()), None);
    }

    #[test]
    fn test_winner_top_row() {
        let board = board_with(&[(0, Mark::X), (1, Mark::X), (2, Mark::X)]);
        assert_eq!(check_winner(&board), Some(Mark::X));
    }

    #[test]
    fn test_winner_anti_diagonal() {
        let board = board_with(&[(2, Mark::O), (4, Mark::O), (6, Mark::O)]);
        assert_eq!(check_winner(&board), Some(Mark::O));
    }

    #[test]
    fn test_no_winner_mixed_line() {
        let board = board_with(&[(0, Mark::X), (1, Mark::O), (2, Mark::X)]);
        assert_eq!(check_winner(&board), None);
    }

    #[test]
    fn test_completes_line() {
        let board = board_with(&[(0, Mark::X), (1, Mark::X)]);
        assert!(completes_line(&board, 2, Mark::X));
        assert!(!completes_line(&board, 2, Mark::O));
        assert!(!completes_line(&board, 5, Mark::X));
    }
}
