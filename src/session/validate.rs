//! Move validation against a session snapshot.

use super::{MoveRejection, ParticipantId, Phase, Session};
use crate::games::tictactoe::CELL_COUNT;
use tracing::{debug, instrument};

/// Checks a proposed move without touching the session.
///
/// Order: phase, turn, range, occupancy.
#[instrument(skip(session, participant), fields(session_id = %session.id(), participant = %participant))]
pub fn validate(
    session: &Session,
    participant: &ParticipantId,
    cell: usize,
) -> Result<(), MoveRejection> {
    if session.phase() != Phase::Active {
        debug!(phase = %session.phase(), "Session not active");
        return Err(MoveRejection::SessionNotActive);
    }

    if session.turn() != *participant {
        debug!(turn = %session.turn(), "Participant does not hold the turn");
        return Err(MoveRejection::NotYourTurn);
    }

    if cell >= CELL_COUNT {
        debug!("Cell out of range");
        return Err(MoveRejection::OutOfRange);
    }

    if !session.board().is_empty(cell) {
        debug!("Cell occupied");
        return Err(MoveRejection::CellOccupied);
    }

    Ok(())
}
