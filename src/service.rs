//! Session operations over the storage ports.
//!
//! Every mutation is read, compute, compare-and-swap. A writer that
//! loses the swap re-reads and recomputes from scratch, so a move is
//! never applied against a stale board: if the fresh state invalidates
//! the intent, the caller sees the fresh rejection instead.

use crate::error::ArenaError;
use crate::session::{
    MoveRejection, Outcome, Participant, ParticipantId, ParticipantKind, Phase, Session, SessionId,
    machine,
};
use crate::store::{ParticipantRegistry, SessionStore, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;

/// A committed change to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A session was created.
    Created {
        /// New session.
        session_id: SessionId,
    },
    /// The second participant joined and the session became active.
    Joined {
        /// Joined session.
        session_id: SessionId,
        /// Joining participant.
        participant: ParticipantId,
    },
    /// A move was applied.
    MoveApplied {
        /// Session moved in.
        session_id: SessionId,
        /// Mover.
        participant: ParticipantId,
        /// Cell written.
        cell: usize,
        /// Moves applied so far, this one included.
        plies: usize,
    },
    /// The session concluded.
    Concluded {
        /// Concluded session.
        session_id: SessionId,
        /// Final outcome.
        outcome: Outcome,
    },
}

/// Session lifecycle operations with optimistic concurrency.
///
/// Clones share the same store, registry and event channel.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    registry: Arc<dyn ParticipantRegistry>,
    events: broadcast::Sender<SessionEvent>,
    max_attempts: u32,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    /// Creates a service over the given ports.
    ///
    /// `max_attempts` is clamped to at least one.
    #[instrument(skip(store, registry))]
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<dyn ParticipantRegistry>,
        max_attempts: u32,
    ) -> Self {
        info!("Creating SessionService");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            registry,
            events,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Subscribes to committed session changes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Registers a participant.
    #[instrument(skip(self))]
    pub async fn create_participant(
        &self,
        name: String,
        kind: ParticipantKind,
    ) -> Result<ParticipantId, ArenaError> {
        Ok(self.registry.create_participant(name, kind).await?)
    }

    /// Looks a participant up by id.
    ///
    /// # Errors
    ///
    /// [`ArenaError::ParticipantNotFound`] if the registry has no such id.
    #[instrument(skip(self), fields(participant_id = %id))]
    pub async fn participant(&self, id: &ParticipantId) -> Result<Participant, ArenaError> {
        self.registry
            .get_participant(id)
            .await?
            .ok_or(ArenaError::ParticipantNotFound(*id))
    }

    /// Returns the earliest participant with this name and kind, creating one if none exists.
    #[instrument(skip(self))]
    pub async fn participant_named(
        &self,
        name: &str,
        kind: ParticipantKind,
    ) -> Result<Participant, ArenaError> {
        if let Some(existing) = self.registry.find_by_name(name).await?
            && *existing.kind() == kind
        {
            debug!(participant_id = %existing.id(), "Existing participant found");
            return Ok(existing);
        }

        let id = self.create_participant(name.to_string(), kind).await?;
        self.participant(&id).await
    }

    /// Creates a waiting session with `first` in the first seat.
    ///
    /// # Errors
    ///
    /// [`ArenaError::ParticipantNotFound`] for an unregistered participant.
    #[instrument(skip(self, first), fields(first = %first))]
    pub async fn create_session(&self, first: ParticipantId) -> Result<Session, ArenaError> {
        self.participant(&first).await?;

        let session = machine::create(first);
        self.store.create_session(session.clone()).await?;

        self.publish(SessionEvent::Created {
            session_id: session.id(),
        });
        Ok(session)
    }

    /// Seats `second` and activates the session.
    ///
    /// # Errors
    ///
    /// A [`JoinRejection`](crate::JoinRejection) from the state machine,
    /// [`ArenaError::SessionNotFound`], [`ArenaError::ParticipantNotFound`],
    /// or [`ArenaError::Contention`].
    #[instrument(skip(self, second), fields(session_id = %id, second = %second))]
    pub async fn join_session(
        &self,
        id: &SessionId,
        second: ParticipantId,
    ) -> Result<Session, ArenaError> {
        self.participant(&second).await?;

        let session = self
            .commit(id, |current| Ok(machine::join(current, second)?))
            .await?;

        self.publish(SessionEvent::Joined {
            session_id: *id,
            participant: second,
        });
        Ok(session)
    }

    /// Applies a move for `participant` at `cell`.
    ///
    /// # Errors
    ///
    /// A [`MoveRejection`](crate::MoveRejection) evaluated against the
    /// freshest committed state, [`ArenaError::SessionNotFound`], or
    /// [`ArenaError::Contention`].
    #[instrument(skip(self, participant), fields(session_id = %id, participant = %participant))]
    pub async fn apply_move(
        &self,
        id: &SessionId,
        participant: ParticipantId,
        cell: usize,
    ) -> Result<Session, ArenaError> {
        self.apply_move_if(id, participant, cell, |_| true).await
    }

    /// Applies a move only while `still_applies` holds for the freshest snapshot.
    ///
    /// A snapshot failing the guard is reported as
    /// [`MoveRejection::NotYourTurn`](crate::MoveRejection::NotYourTurn).
    pub(crate) async fn apply_move_if<G>(
        &self,
        id: &SessionId,
        participant: ParticipantId,
        cell: usize,
        still_applies: G,
    ) -> Result<Session, ArenaError>
    where
        G: Fn(&Session) -> bool + Send + Sync,
    {
        let result = self
            .commit(id, |current| {
                if !still_applies(current) {
                    return Err(MoveRejection::NotYourTurn.into());
                }
                Ok(machine::apply_move(current, &participant, cell)?)
            })
            .await;

        let session = match result {
            Ok(session) => session,
            Err(e) => {
                warn!(cell, error = %e, "Move not applied");
                return Err(e);
            }
        };

        self.publish(SessionEvent::MoveApplied {
            session_id: *id,
            participant,
            cell,
            plies: session.plies(),
        });
        if session.phase() == Phase::Concluded {
            self.publish(SessionEvent::Concluded {
                session_id: *id,
                outcome: session.outcome(),
            });
        }
        Ok(session)
    }

    /// Returns a snapshot of the session.
    ///
    /// # Errors
    ///
    /// [`ArenaError::SessionNotFound`] if there is no such session.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn session(&self, id: &SessionId) -> Result<Session, ArenaError> {
        self.store
            .get_session(id)
            .await?
            .ok_or(ArenaError::SessionNotFound(*id))
    }

    /// Lists sessions newest first, optionally filtered by phase.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self, phase: Option<Phase>) -> Result<Vec<Session>, ArenaError> {
        Ok(self.store.list_sessions(phase).await?)
    }

    /// Read-compute-commit loop with bounded retry on version conflicts.
    async fn commit<F>(&self, id: &SessionId, mut transition: F) -> Result<Session, ArenaError>
    where
        F: FnMut(&Session) -> Result<Session, ArenaError> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.session(id).await?;
            let next = transition(&current)?;

            match self
                .store
                .compare_and_swap(id, current.revision(), next.clone())
                .await
            {
                Ok(()) => {
                    debug!(attempt, revision = next.revision(), "Committed");
                    return Ok(next);
                }
                Err(StoreError::VersionConflict { found, .. }) => {
                    debug!(attempt, found, "Lost commit race, retrying");
                }
                Err(StoreError::NotFound(_)) => return Err(ArenaError::SessionNotFound(*id)),
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts = self.max_attempts, "Giving up on contended session");
        Err(ArenaError::Contention {
            session_id: *id,
            attempts: self.max_attempts,
        })
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
