mod policy;
mod position;
mod rules;
mod types;

pub use policy::{choose_move, completing_cell};
pub use position::Position;
pub use rules::{Evaluation, WIN_LINES, check_winner, completes_line, evaluate, is_full};
pub use types::{Board, CELL_COUNT, Cell, Mark};
