//! Top-level error for session operations.

use crate::session::{JoinRejection, MoveRejection, ParticipantId, SessionId};
use crate::store::StoreError;
use derive_more::{Display, Error, From};

/// Error returned by [`SessionService`](crate::SessionService) and
/// [`GameHub`](crate::GameHub) operations.
///
/// Rejections are final and never retried. `Contention` is transient:
/// the caller may try again.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum ArenaError {
    /// The move was refused.
    #[display("Move rejected: {_0}")]
    Move(MoveRejection),

    /// The join was refused.
    #[display("Join rejected: {_0}")]
    Join(JoinRejection),

    /// No session with this id.
    #[display("Session {_0} not found")]
    #[from(ignore)]
    SessionNotFound(#[error(not(source))] SessionId),

    /// No participant with this id.
    #[display("Participant {_0} not found")]
    #[from(ignore)]
    ParticipantNotFound(#[error(not(source))] ParticipantId),

    /// Every commit attempt lost to a concurrent writer.
    #[display("Session {session_id} still contended after {attempts} attempts")]
    #[from(ignore)]
    Contention {
        /// Contended session.
        session_id: SessionId,
        /// Attempts made.
        attempts: u32,
    },

    /// The store failed.
    #[display("Store error: {_0}")]
    Store(StoreError),
}

impl ArenaError {
    /// Returns the move rejection, if this is one.
    pub fn move_rejection(&self) -> Option<MoveRejection> {
        match self {
            ArenaError::Move(rejection) => Some(*rejection),
            _ => None,
        }
    }

    /// Returns the join rejection, if this is one.
    pub fn join_rejection(&self) -> Option<JoinRejection> {
        match self {
            ArenaError::Join(rejection) => Some(*rejection),
            _ => None,
        }
    }
}
