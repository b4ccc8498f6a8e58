//! First-class invariants for sessions.
//!
//! Invariants are logical properties that must hold for every session
//! the machine produces. They are testable independently and are
//! checked after each transition in debug builds.

use super::{Outcome, Phase, Session};
use crate::games::tictactoe::{Board, Evaluation, evaluate};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples of two to four invariants.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set.
    ///
    /// Returns every violation, not just the first.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>),+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !$inv::holds(state) {
                        violations.push(InvariantViolation::new($inv::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);

/// Invariant: one or two seats with distinct participants and marks,
/// and an active or concluded session has both seats filled.
pub struct SeatingConsistent;

impl Invariant<Session> for SeatingConsistent {
    fn holds(session: &Session) -> bool {
        let seats = session.seats();
        let sized = matches!(seats.len(), 1 | 2);
        let distinct = match seats {
            [a, b] => a.participant() != b.participant() && a.mark() != b.mark(),
            _ => true,
        };
        let filled = session.phase() == Phase::Waiting || seats.len() == 2;
        sized && distinct && filled
    }

    fn description() -> &'static str {
        "Seats hold one or two distinct participants with distinct marks"
    }
}

/// Invariant: the turn belongs to a seated participant.
pub struct TurnSeated;

impl Invariant<Session> for TurnSeated {
    fn holds(session: &Session) -> bool {
        session.phase() == Phase::Concluded || session.is_seated(&session.turn())
    }

    fn description() -> &'static str {
        "Turn refers to a seated participant"
    }
}

/// Invariant: replaying the history onto an empty board reproduces the
/// board, each move fills an empty cell with the mover's mark, and
/// movers alternate starting from the first seat.
pub struct HistoryReplaysToBoard;

impl Invariant<Session> for HistoryReplaysToBoard {
    fn holds(session: &Session) -> bool {
        let mut board = Board::empty();
        for (ply, mov) in session.history().iter().enumerate() {
            let Some(seat) = session.seats().get(ply % 2) else {
                return false;
            };
            if seat.participant() != mov.participant() || seat.mark() != mov.mark() {
                return false;
            }
            if !board.is_empty(*mov.cell()) {
                return false;
            }
            match board.with_mark(*mov.cell(), *mov.mark()) {
                Some(next) => board = next,
                None => return false,
            }
        }
        board == *session.board()
    }

    fn description() -> &'static str {
        "History replays to the board with alternating movers"
    }
}

/// Invariant: the outcome agrees with the board and the phase.
pub struct OutcomeMatchesBoard;

impl Invariant<Session> for OutcomeMatchesBoard {
    fn holds(session: &Session) -> bool {
        let evaluation = evaluate(session.board());
        match (session.phase(), session.outcome()) {
            (Phase::Concluded, Outcome::Won(winner)) => {
                session.mark_of(&winner).map(Evaluation::Won) == Some(evaluation)
            }
            (Phase::Concluded, Outcome::Drawn) => evaluation == Evaluation::Drawn,
            (Phase::Waiting | Phase::Active, Outcome::Undecided) => {
                evaluation == Evaluation::Ongoing
            }
            _ => false,
        }
    }

    fn description() -> &'static str {
        "Outcome matches the board and phase"
    }
}

/// All session invariants as a composable set.
pub type SessionInvariants = (
    SeatingConsistent,
    TurnSeated,
    HistoryReplaysToBoard,
    OutcomeMatchesBoard,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::Mark;
    use crate::session::{ParticipantId, machine};

    fn active_session() -> (Session, ParticipantId, ParticipantId) {
        let a = ParticipantId::new();
        let b = ParticipantId::new();
        let session = machine::join(&machine::create(a), b).unwrap();
        (session, a, b)
    }

    #[test]
    fn test_invariant_set_holds_for_new_session() {
        let session = machine::create(ParticipantId::new());
        assert!(SessionInvariants::check_all(&session).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_after_moves() {
        let (session, a, b) = active_session();
        let session = machine::apply_move(&session, &a, 0).unwrap();
        let session = machine::apply_move(&session, &b, 4).unwrap();
        assert!(SessionInvariants::check_all(&session).is_ok());
    }

    #[test]
    fn test_detects_board_corruption() {
        let (session, a, _) = active_session();
        let mut session = machine::apply_move(&session, &a, 0).unwrap();
        session.board = session.board.with_mark(8, Mark::O).unwrap();

        let violations = SessionInvariants::check_all(&session).unwrap_err();
        assert!(
            violations
                .iter()
                .any(|v| v.description == HistoryReplaysToBoard::description())
        );
    }

    #[test]
    fn test_detects_unseated_turn() {
        let (mut session, _, _) = active_session();
        session.turn = ParticipantId::new();
        assert!(!TurnSeated::holds(&session));
    }

    #[test]
    fn test_detects_active_with_one_seat() {
        let mut session = machine::create(ParticipantId::new());
        session.phase = Phase::Active;
        assert!(!SeatingConsistent::holds(&session));
    }

    #[test]
    fn test_detects_outcome_without_line() {
        let (mut session, a, _) = active_session();
        session.phase = Phase::Concluded;
        session.outcome = Outcome::Won(a);
        assert!(!OutcomeMatchesBoard::holds(&session));
    }

    #[test]
    fn test_two_invariants_as_set() {
        let session = machine::create(ParticipantId::new());
        type TwoInvariants = (SeatingConsistent, TurnSeated);
        assert!(TwoInvariants::check_all(&session).is_ok());
    }
}
