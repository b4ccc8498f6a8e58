//! Board evaluation rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`](super::Board).

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::{WIN_LINES, check_winner, completes_line};

use super::{Board, Mark};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Evaluation {
    /// No completed line and at least one empty cell.
    Ongoing,
    /// A line of three holds this mark.
    Won(Mark),
    /// Board is full with no completed line.
    Drawn,
}

/// Evaluates the board: a completed line wins, otherwise a full board draws.
#[instrument(skip(board))]
pub fn evaluate(board: &Board) -> Evaluation {
    if let Some(mark) = check_winner(board) {
        Evaluation::Won(mark)
    } else if is_full(board) {
        Evaluation::Drawn
    } else {
        Evaluation::Ongoing
    }
}
