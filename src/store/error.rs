//! Storage error types.

use crate::session::SessionId;
use derive_more::{Display, Error};

/// Error raised by a [`SessionStore`](super::SessionStore) or
/// [`ParticipantRegistry`](super::ParticipantRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum StoreError {
    /// Another writer committed since the snapshot was read.
    #[display("Version conflict on session {session_id}: expected revision {expected}, found {found}")]
    VersionConflict {
        /// Session being written.
        session_id: SessionId,
        /// Revision the writer read.
        expected: u64,
        /// Revision currently stored.
        found: u64,
    },

    /// No session with this id.
    #[display("Session {_0} not found")]
    NotFound(#[error(not(source))] SessionId),

    /// A session with this id already exists.
    #[display("Session {_0} already exists")]
    DuplicateSession(#[error(not(source))] SessionId),
}
