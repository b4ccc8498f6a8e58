//! Caller-facing rejections raised by session transitions.

use derive_more::{Display, Error};

/// Why a proposed move was refused.
///
/// Checks run in declaration order, so a move that fails several checks
/// always reports the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum MoveRejection {
    /// The session is waiting for a second participant or has concluded.
    #[display("Session is not active")]
    SessionNotActive,

    /// The participant does not hold the current turn.
    #[display("It is not this participant's turn")]
    NotYourTurn,

    /// The cell index is outside 0-8.
    #[display("Cell index is out of range (must be 0-8)")]
    OutOfRange,

    /// The cell already holds a mark.
    #[display("Cell is already occupied")]
    CellOccupied,
}

/// Why a join was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Error)]
pub enum JoinRejection {
    /// Both seats are already taken.
    #[display("Session already has two participants")]
    SessionFull,

    /// The session is not waiting for participants.
    #[display("Session is not waiting for participants")]
    SessionNotWaiting,

    /// The joining participant already holds the first seat.
    #[display("Participant is already seated in this session")]
    DuplicateParticipant,
}
