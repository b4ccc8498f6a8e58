//! Game session model and state machine.

mod error;
mod invariants;
pub mod machine;
mod types;
mod validate;

pub use error::{JoinRejection, MoveRejection};
pub use invariants::{
    HistoryReplaysToBoard, Invariant, InvariantSet, InvariantViolation, OutcomeMatchesBoard,
    SeatingConsistent, SessionInvariants, TurnSeated,
};
pub use types::{
    Move, Outcome, Participant, ParticipantId, ParticipantKind, Phase, Seat, Session, SessionId,
};
pub use validate::validate;
