//! Move selection for automated participants.
//!
//! Tiers are tried in order: win now, block, center, corner, any. Win
//! and block pick the lowest qualifying index; corner and any draw
//! uniformly from the injected random source.

use super::position::Position;
use super::rules::completes_line;
use super::{Board, Mark};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, instrument};

const CENTER: usize = 4;

/// Chooses a cell for `own` on `board`.
///
/// Returns `None` only when the board has no empty cell.
#[instrument(skip(board, rng), fields(own = %own))]
pub fn choose_move<R: Rng + ?Sized>(board: &Board, own: Mark, rng: &mut R) -> Option<usize> {
    if let Some(index) = completing_cell(board, own) {
        debug!(index, "Taking winning cell");
        return Some(index);
    }

    if let Some(index) = completing_cell(board, own.opponent()) {
        debug!(index, "Blocking opponent");
        return Some(index);
    }

    if board.is_empty(CENTER) {
        debug!("Taking center");
        return Some(CENTER);
    }

    let corners: Vec<usize> = Position::CORNERS
        .iter()
        .map(|p| p.to_index())
        .filter(|&i| board.is_empty(i))
        .collect();
    if let Some(&index) = corners.choose(rng) {
        debug!(index, "Taking corner");
        return Some(index);
    }

    let remaining: Vec<usize> = board.available_cells().collect();
    let choice = remaining.choose(rng).copied();
    debug!(index = ?choice, "Taking any open cell");
    choice
}

/// Lowest empty cell where `mark` would complete a line.
pub fn completing_cell(board: &Board, mark: Mark) -> Option<usize> {
    board
        .available_cells()
        .find(|&index| completes_line(board, index, mark))
}
