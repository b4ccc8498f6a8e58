//! Named board positions for human-facing input.

use super::types::Board;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// A cell of the board by name; the discriminant is the row-major index.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::FromRepr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[repr(usize)]
pub enum Position {
    /// Index 0
    TopLeft = 0,
    /// Index 1
    TopCenter = 1,
    /// Index 2
    TopRight = 2,
    /// Index 3
    MiddleLeft = 3,
    /// Index 4
    Center = 4,
    /// Index 5
    MiddleRight = 5,
    /// Index 6
    BottomLeft = 6,
    /// Index 7
    BottomCenter = 7,
    /// Index 8
    BottomRight = 8,
}

impl Position {
    /// The four corners, in index order.
    pub const CORNERS: [Position; 4] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    /// Kebab-case label, e.g. `"top-left"`.
    pub fn label(self) -> &'static str {
        self.into()
    }

    /// Parses an index (`"0"`..`"8"`) or a label.
    ///
    /// Labels match case-insensitively and exactly, so `"top"` is rejected
    /// rather than guessed. Spaces and underscores stand in for hyphens.
    #[instrument]
    pub fn from_label_or_number(s: &str) -> Option<Position> {
        let s = s.trim();
        match s.parse::<usize>() {
            Ok(index) => Self::from_index(index),
            Err(_) => Position::from_str(&s.replace([' ', '_'], "-")).ok(),
        }
    }

    /// Row-major board index.
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Position for a board index, `None` past 8.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }

    /// Empty positions on the board, in index order.
    #[instrument(skip(board))]
    pub fn valid_moves(board: &Board) -> Vec<Position> {
        board
            .available_cells()
            .filter_map(Position::from_index)
            .collect()
    }
}
