//! Session lifecycle transitions: waiting -> active -> concluded.
//!
//! Every transition is a pure function from a session snapshot to the
//! next session. Nothing here touches storage; committing the result
//! atomically is the service's job.

use super::invariants::{InvariantSet, SessionInvariants};
use super::validate::validate;
use super::{
    JoinRejection, Move, MoveRejection, Outcome, ParticipantId, Phase, Seat, Session, SessionId,
};
use crate::games::tictactoe::{Board, Evaluation, Mark, evaluate};
use chrono::Utc;
use tracing::{debug, info, instrument};

/// Creates a waiting session with `first` seated as `X`.
///
/// The turn is fixed to `first` even though no move is legal until a
/// second participant joins.
#[instrument(skip(first), fields(first = %first))]
pub fn create(first: ParticipantId) -> Session {
    let session = Session {
        id: SessionId::new(),
        board: Board::empty(),
        seats: vec![Seat::new(first, Mark::X)],
        turn: first,
        phase: Phase::Waiting,
        outcome: Outcome::Undecided,
        history: Vec::new(),
        created_at: Utc::now(),
        revision: 0,
    };
    info!(session_id = %session.id, "Session created");
    assert_invariants(&session);
    session
}

/// Seats `second` as `O` and activates the session.
///
/// # Errors
///
/// [`JoinRejection::SessionFull`] when both seats are taken,
/// [`JoinRejection::SessionNotWaiting`] when the phase is not waiting,
/// [`JoinRejection::DuplicateParticipant`] when `second` already sits
/// in the first seat.
#[instrument(skip(session, second), fields(session_id = %session.id(), second = %second))]
pub fn join(session: &Session, second: ParticipantId) -> Result<Session, JoinRejection> {
    if session.seats.len() >= 2 {
        return Err(JoinRejection::SessionFull);
    }
    if session.phase != Phase::Waiting {
        return Err(JoinRejection::SessionNotWaiting);
    }
    if session.is_seated(&second) {
        return Err(JoinRejection::DuplicateParticipant);
    }

    let mut next = session.clone();
    next.seats.push(Seat::new(second, Mark::O));
    next.phase = Phase::Active;
    next.revision += 1;

    info!(turn = %next.turn, "Session active");
    assert_invariants(&next);
    Ok(next)
}

/// Applies a move for `participant` at `cell`.
///
/// A winning move concludes the session with the mover as winner; a
/// move that fills the board concludes it as drawn. Otherwise the turn
/// passes to the other seat.
///
/// # Errors
///
/// Any [`MoveRejection`] from validation; the session is unchanged.
#[instrument(skip(session, participant), fields(session_id = %session.id(), participant = %participant))]
pub fn apply_move(
    session: &Session,
    participant: &ParticipantId,
    cell: usize,
) -> Result<Session, MoveRejection> {
    validate(session, participant, cell)?;

    // Validation guarantees the participant is seated and the cell in range.
    let mark = session
        .mark_of(participant)
        .ok_or(MoveRejection::NotYourTurn)?;
    let board = session
        .board
        .with_mark(cell, mark)
        .ok_or(MoveRejection::OutOfRange)?;

    let mut next = session.clone();
    next.board = board;
    next.history.push(Move::new(*participant, cell, mark));
    next.revision += 1;

    match evaluate(&next.board) {
        Evaluation::Won(_) => {
            next.outcome = Outcome::Won(*participant);
            next.phase = Phase::Concluded;
            info!(winner = %participant, plies = next.plies(), "Session won");
        }
        Evaluation::Drawn => {
            next.outcome = Outcome::Drawn;
            next.phase = Phase::Concluded;
            info!(plies = next.plies(), "Session drawn");
        }
        Evaluation::Ongoing => {
            next.turn = session
                .opponent_of(participant)
                .ok_or(MoveRejection::SessionNotActive)?;
            debug!(turn = %next.turn, "Turn passed");
        }
    }

    assert_invariants(&next);
    Ok(next)
}

/// Asserts that all session invariants hold (panic on violation in debug builds).
fn assert_invariants(session: &Session) {
    debug_assert!(
        SessionInvariants::check_all(session).is_ok(),
        "Session invariants violated: {:?}",
        SessionInvariants::check_all(session)
    );
}
