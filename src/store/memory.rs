//! In-memory adapters for the storage ports.

use super::{ParticipantRegistry, SessionStore, StoreError};
use crate::session::{Participant, ParticipantId, ParticipantKind, Phase, Session, SessionId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct StoredSession {
    session: Session,
    seq: u64,
}

#[derive(Debug, Default)]
struct SessionTable {
    sessions: HashMap<SessionId, StoredSession>,
    next_seq: u64,
}

/// Session store backed by a shared map.
///
/// Clones share the same sessions.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    table: Arc<RwLock<SessionTable>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory session store");
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    async fn create_session(&self, session: Session) -> Result<SessionId, StoreError> {
        let mut table = self.table.write().await;
        let id = session.id();

        if table.sessions.contains_key(&id) {
            warn!("Session already exists");
            return Err(StoreError::DuplicateSession(id));
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        table.sessions.insert(id, StoredSession { session, seq });

        debug!(seq, "Session stored");
        Ok(id)
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let table = self.table.read().await;
        let session = table.sessions.get(id).map(|s| s.session.clone());

        if session.is_none() {
            debug!("Session not found");
        }

        Ok(session)
    }

    #[instrument(skip(self, next), fields(session_id = %id))]
    async fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: u64,
        next: Session,
    ) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let stored = table
            .sessions
            .get_mut(id)
            .ok_or(StoreError::NotFound(*id))?;

        let found = stored.session.revision();
        if found != expected {
            debug!(found, "Revision moved on, rejecting write");
            return Err(StoreError::VersionConflict {
                session_id: *id,
                expected,
                found,
            });
        }

        stored.session = next;
        debug!(revision = stored.session.revision(), "Session committed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self, phase: Option<Phase>) -> Result<Vec<Session>, StoreError> {
        let table = self.table.read().await;
        let mut stored: Vec<&StoredSession> = table
            .sessions
            .values()
            .filter(|s| phase.is_none_or(|p| s.session.phase() == p))
            .collect();

        stored.sort_by(|a, b| {
            b.session
                .created_at()
                .cmp(&a.session.created_at())
                .then(b.seq.cmp(&a.seq))
        });

        let sessions: Vec<Session> = stored.into_iter().map(|s| s.session.clone()).collect();
        debug!(count = sessions.len(), "Listed sessions");
        Ok(sessions)
    }
}

#[derive(Debug, Default)]
struct ParticipantTable {
    participants: HashMap<ParticipantId, Participant>,
    order: Vec<ParticipantId>,
}

/// Participant registry backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipantRegistry {
    table: Arc<RwLock<ParticipantTable>>,
}

impl InMemoryParticipantRegistry {
    /// Creates an empty registry.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory participant registry");
        Self::default()
    }
}

#[async_trait]
impl ParticipantRegistry for InMemoryParticipantRegistry {
    #[instrument(skip(self))]
    async fn create_participant(
        &self,
        name: String,
        kind: ParticipantKind,
    ) -> Result<ParticipantId, StoreError> {
        let mut table = self.table.write().await;
        let id = ParticipantId::new();

        table
            .participants
            .insert(id, Participant::new(id, name, kind));
        table.order.push(id);

        info!(participant_id = %id, "Participant registered");
        Ok(id)
    }

    #[instrument(skip(self), fields(participant_id = %id))]
    async fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        let table = self.table.read().await;
        Ok(table.participants.get(id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Participant>, StoreError> {
        let table = self.table.read().await;
        let found = table
            .order
            .iter()
            .filter_map(|id| table.participants.get(id))
            .find(|p| p.name() == name)
            .cloned();

        debug!(found = found.is_some(), "Looked up participant by name");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::machine;

    #[tokio::test]
    async fn test_swap_requires_current_revision() {
        let store = InMemorySessionStore::new();
        let a = ParticipantId::new();
        let session = machine::create(a);
        let id = store.create_session(session.clone()).await.unwrap();

        let joined = machine::join(&session, ParticipantId::new()).unwrap();
        store.compare_and_swap(&id, 0, joined.clone()).await.unwrap();

        // Second writer still holds revision 0.
        let stale = machine::join(&session, ParticipantId::new()).unwrap();
        let err = store.compare_and_swap(&id, 0, stale).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                session_id: id,
                expected: 0,
                found: 1
            }
        );
        assert_eq!(store.get_session(&id).await.unwrap(), Some(joined));
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let store = InMemorySessionStore::new();
        let session = machine::create(ParticipantId::new());
        let id = store.create_session(session.clone()).await.unwrap();

        assert_eq!(
            store.create_session(session.clone()).await.unwrap_err(),
            StoreError::DuplicateSession(id)
        );

        let missing = SessionId::new();
        assert_eq!(store.get_session(&missing).await.unwrap(), None);
        assert_eq!(
            store.compare_and_swap(&missing, 0, session).await.unwrap_err(),
            StoreError::NotFound(missing)
        );
    }

    #[tokio::test]
    async fn test_find_by_name_returns_earliest() {
        let registry = InMemoryParticipantRegistry::new();
        let first = registry
            .create_participant("sam".to_string(), ParticipantKind::Human)
            .await
            .unwrap();
        registry
            .create_participant("sam".to_string(), ParticipantKind::Automated)
            .await
            .unwrap();

        let found = registry.find_by_name("sam").await.unwrap().unwrap();
        assert_eq!(*found.id(), first);
        assert_eq!(registry.find_by_name("nobody").await.unwrap(), None);
    }
}
