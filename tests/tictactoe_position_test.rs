//! Tests for tic-tac-toe position enum.

use strictly_arena::{Board, Mark, Position};

#[test]
fn test_position_to_index() {
    assert_eq!(Position::TopLeft.to_index(), 0);
    assert_eq!(Position::Center.to_index(), 4);
    assert_eq!(Position::BottomRight.to_index(), 8);
}

#[test]
fn test_position_from_index() {
    assert_eq!(Position::from_index(0), Some(Position::TopLeft));
    assert_eq!(Position::from_index(4), Some(Position::Center));
    assert_eq!(Position::from_index(8), Some(Position::BottomRight));
    assert_eq!(Position::from_index(9), None);
}

#[test]
fn test_parse_number_and_label() {
    assert_eq!(Position::from_label_or_number("4"), Some(Position::Center));
    assert_eq!(Position::from_label_or_number(" 8 "), Some(Position::BottomRight));
    assert_eq!(Position::from_label_or_number("top-left"), Some(Position::TopLeft));
    assert_eq!(Position::from_label_or_number("Bottom center"), Some(Position::BottomCenter));
    assert_eq!(Position::from_label_or_number("middle_right"), Some(Position::MiddleRight));
}

#[test]
fn test_parse_rejects_partial_and_out_of_range() {
    assert_eq!(Position::from_label_or_number("top"), None);
    assert_eq!(Position::from_label_or_number("9"), None);
    assert_eq!(Position::from_label_or_number(""), None);
}

#[test]
fn test_valid_moves_empty_board() {
    let board = Board::empty();
    let valid = Position::valid_moves(&board);
    assert_eq!(valid.len(), 9); // All positions valid on empty board
}

#[test]
fn test_valid_moves_filters_occupied() {
    let board = Board::empty()
        .with_mark(0, Mark::X)
        .and_then(|b| b.with_mark(4, Mark::O))
        .unwrap();

    let valid = Position::valid_moves(&board);
    assert_eq!(valid.len(), 7); // 2 occupied, 7 free
    assert!(!valid.contains(&Position::TopLeft));
    assert!(!valid.contains(&Position::Center));
    assert!(valid.contains(&Position::BottomRight));
}

#[test]
fn test_labels_are_kebab_case() {
    assert_eq!(Position::TopLeft.label(), "top-left");
    assert_eq!(Position::Center.to_string(), "center");
    assert_eq!(Position::CORNERS.map(Position::to_index), [0, 2, 6, 8]);
}
