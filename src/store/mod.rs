//! Storage ports for sessions and participants.
//!
//! The core only ever talks to these traits. Sessions are handed out by
//! value and written back with [`SessionStore::compare_and_swap`], so a
//! writer that read a stale snapshot loses instead of overwriting.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{InMemoryParticipantRegistry, InMemorySessionStore};

use crate::session::{Participant, ParticipantId, ParticipantKind, Phase, Session, SessionId};
use async_trait::async_trait;

/// Versioned record store for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session and returns its id.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateSession`] if a session with the same id exists.
    async fn create_session(&self, session: Session) -> Result<SessionId, StoreError>;

    /// Returns a snapshot of the session, `None` if it does not exist.
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Replaces the session only if its stored revision is still `expected`.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] if another writer committed first,
    /// [`StoreError::NotFound`] if the session does not exist.
    async fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: u64,
        next: Session,
    ) -> Result<(), StoreError>;

    /// Lists sessions, newest first, optionally filtered by phase.
    async fn list_sessions(&self, phase: Option<Phase>) -> Result<Vec<Session>, StoreError>;
}

/// Registry of participant identities. Records are never mutated.
#[async_trait]
pub trait ParticipantRegistry: Send + Sync {
    /// Registers a participant and returns its new id.
    async fn create_participant(
        &self,
        name: String,
        kind: ParticipantKind,
    ) -> Result<ParticipantId, StoreError>;

    /// Looks a participant up by id.
    async fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Returns the earliest registered participant with this display name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>, StoreError>;
}
