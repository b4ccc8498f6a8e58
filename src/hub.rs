//! Front door for callers: session operations plus automated-turn scheduling.

use crate::config::ArenaConfig;
use crate::delay::{DelayedActions, TokioDelayedActions};
use crate::error::ArenaError;
use crate::scheduler::TurnScheduler;
use crate::service::{SessionEvent, SessionService};
use crate::session::{
    Participant, ParticipantId, ParticipantKind, Phase, Session, SessionId, machine,
};
use crate::store::{
    InMemoryParticipantRegistry, InMemorySessionStore, ParticipantRegistry, SessionStore,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

/// Wires [`SessionService`] to [`TurnScheduler`].
///
/// Every committed change is handed to the scheduler, so an automated
/// participant whose turn comes up gets its move armed without the
/// caller doing anything.
#[derive(Debug, Clone)]
pub struct GameHub {
    service: SessionService,
    scheduler: TurnScheduler,
    config: ArenaConfig,
}

impl GameHub {
    /// Creates a hub over the given ports.
    #[instrument(skip_all)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<dyn ParticipantRegistry>,
        delays: Arc<dyn DelayedActions>,
        config: ArenaConfig,
    ) -> Self {
        let service = SessionService::new(store, registry, *config.max_commit_attempts());
        let scheduler = TurnScheduler::new(service.clone(), delays, &config);
        info!("GameHub ready");
        Self {
            service,
            scheduler,
            config,
        }
    }

    /// Creates a hub backed by the in-memory adapters and tokio timers.
    ///
    /// No sweeper is started. An automated turn that gives up after
    /// contention or a store error stays stalled until
    /// [`spawn_sweeper`](Self::spawn_sweeper) runs or
    /// [`TurnScheduler::sweep`] is called.
    pub fn in_memory(config: ArenaConfig) -> Self {
        Self::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryParticipantRegistry::new()),
            Arc::new(TokioDelayedActions::new()),
            config,
        )
    }

    /// Underlying session service.
    pub fn service(&self) -> &SessionService {
        &self.service
    }

    /// Underlying scheduler.
    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Active configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Subscribes to committed session changes, automated moves included.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.service.subscribe()
    }

    /// Registers a participant.
    pub async fn create_participant(
        &self,
        name: impl Into<String> + Send,
        kind: ParticipantKind,
    ) -> Result<ParticipantId, ArenaError> {
        self.service.create_participant(name.into(), kind).await
    }

    /// Looks a participant up by id.
    pub async fn participant(&self, id: &ParticipantId) -> Result<Participant, ArenaError> {
        self.service.participant(id).await
    }

    /// Get-or-create by name and kind.
    pub async fn participant_named(
        &self,
        name: &str,
        kind: ParticipantKind,
    ) -> Result<Participant, ArenaError> {
        self.service.participant_named(name, kind).await
    }

    /// Creates a waiting session.
    pub async fn create_session(&self, first: ParticipantId) -> Result<Session, ArenaError> {
        let session = self.service.create_session(first).await?;
        self.scheduler.on_session_changed(&session).await;
        Ok(session)
    }

    /// Seats `second`; arms the first move if the first seat is automated.
    pub async fn join_session(
        &self,
        id: &SessionId,
        second: ParticipantId,
    ) -> Result<Session, ArenaError> {
        let session = self.service.join_session(id, second).await?;
        self.scheduler.on_session_changed(&session).await;
        Ok(session)
    }

    /// Seats a freshly registered automated participant named
    /// `config.ai_name` in the second seat.
    ///
    /// # Errors
    ///
    /// The join rejection for a session that cannot take a second seat.
    /// Checked before registering, so a refused session leaves no stray
    /// participant behind in the common case.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn add_automated_opponent(&self, id: &SessionId) -> Result<Session, ArenaError> {
        let current = self.service.session(id).await?;
        machine::join(&current, ParticipantId::new())?;

        let opponent = self
            .service
            .create_participant(self.config.ai_name().clone(), ParticipantKind::Automated)
            .await?;
        debug!(participant_id = %opponent, "Automated opponent registered");

        self.join_session(id, opponent).await
    }

    /// Applies a move; arms the reply if the opponent is automated.
    pub async fn apply_move(
        &self,
        id: &SessionId,
        participant: ParticipantId,
        cell: usize,
    ) -> Result<Session, ArenaError> {
        let session = self.service.apply_move(id, participant, cell).await?;
        self.scheduler.on_session_changed(&session).await;
        Ok(session)
    }

    /// Returns a snapshot of the session.
    pub async fn session(&self, id: &SessionId) -> Result<Session, ArenaError> {
        self.service.session(id).await
    }

    /// Lists sessions newest first, optionally filtered by phase.
    pub async fn list_sessions(&self, phase: Option<Phase>) -> Result<Vec<Session>, ArenaError> {
        self.service.list_sessions(phase).await
    }

    /// Starts the periodic sweep that re-arms stalled automated turns.
    ///
    /// The first sweep runs immediately, then every
    /// `config.sweep_interval_secs`. The task runs until aborted.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let scheduler = self.scheduler.clone();
        let period = self.config.sweep_interval();
        info!(period_secs = period.as_secs(), "Starting sweeper");

        tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if let Err(e) = scheduler.sweep().await {
                        warn!(error = %e, "Sweep failed");
                    }
                }
            }
            .instrument(info_span!("sweeper")),
        )
    }
}
