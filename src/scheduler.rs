//! Turn scheduling for automated participants.
//!
//! After every committed change the scheduler checks whether the
//! participant to move is automated. If so it arms exactly one delayed
//! action for the `(session, turn, plies)` key. The action re-reads the
//! session before moving and drops itself silently when the turn it was
//! armed for no longer applies.

use crate::config::ArenaConfig;
use crate::delay::{DelayedActions, ScheduleKey};
use crate::error::ArenaError;
use crate::games::tictactoe::choose_move;
use crate::service::SessionService;
use crate::session::{MoveRejection, Phase, Session};
use derive_more::Display;
use futures::future::BoxFuture;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Why a scheduled automated turn did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DropReason {
    /// The session no longer exists.
    #[display("session missing")]
    SessionMissing,
    /// Phase, turn or move count changed since the turn was armed.
    #[display("turn no longer current")]
    Stale,
    /// The participant to move is not automated.
    #[display("participant is not automated")]
    NotAutomated,
    /// The board has no empty cell.
    #[display("no open cell")]
    NoOpenCell,
    /// The fresh state rejected the chosen move.
    #[display("move rejected: {_0}")]
    Rejected(MoveRejection),
}

/// Result of running one automated turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomatedTurn {
    /// The automated move was committed.
    Applied(Session),
    /// The turn was stale or otherwise inapplicable; nothing changed.
    Dropped(DropReason),
}

/// Arms and runs automated moves.
///
/// Clones share the random source and the delayed-action facility.
#[derive(Clone)]
pub struct TurnScheduler {
    service: SessionService,
    delays: Arc<dyn DelayedActions>,
    rng: Arc<Mutex<ChaCha20Rng>>,
    delay: Duration,
}

impl std::fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl TurnScheduler {
    /// Creates a scheduler. The policy's random source is seeded from
    /// `config.ai_seed` when set, from entropy otherwise.
    #[instrument(skip_all)]
    pub fn new(
        service: SessionService,
        delays: Arc<dyn DelayedActions>,
        config: &ArenaConfig,
    ) -> Self {
        let rng = match config.ai_seed() {
            Some(seed) => ChaCha20Rng::seed_from_u64(*seed),
            None => ChaCha20Rng::from_entropy(),
        };
        info!(
            delay_ms = *config.ai_delay_ms(),
            seeded = config.ai_seed().is_some(),
            "Creating TurnScheduler"
        );
        Self {
            service,
            delays,
            rng: Arc::new(Mutex::new(rng)),
            delay: config.ai_delay(),
        }
    }

    /// Arms an automated move if the session is active and the
    /// participant to move is automated.
    ///
    /// Idempotent per `(session, turn, plies)`: repeated notifications for
    /// the same state arm nothing further. A concluded session is dropped
    /// from the facility's bookkeeping.
    pub fn on_session_changed<'a>(&'a self, session: &'a Session) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match session.phase() {
                Phase::Active => {}
                Phase::Concluded => {
                    self.delays.forget(&session.id()).await;
                    return;
                }
                Phase::Waiting => return,
            }

            let turn = session.turn();
            match self.service.participant(&turn).await {
                Ok(participant) if participant.is_automated() => {}
                Ok(_) => {
                    debug!(session_id = %session.id(), "Human to move, nothing to schedule");
                    return;
                }
                Err(e) => {
                    warn!(session_id = %session.id(), error = %e, "Cannot resolve participant to move");
                    return;
                }
            }

            let key = ScheduleKey::new(session.id(), turn, session.plies());
            let scheduler = self.clone();
            let action: BoxFuture<'static, ()> = Box::pin(async move {
                scheduler.run_scheduled(key).await;
            });

            if self.delays.schedule_after(self.delay, key, action).await {
                info!(key = %key, "Automated turn armed");
            }
        })
    }

    /// Runs the automated turn identified by `key` against fresh state.
    ///
    /// # Errors
    ///
    /// Only transient failures: [`ArenaError::Contention`] or a store error.
    /// Staleness is reported as [`AutomatedTurn::Dropped`].
    #[instrument(skip(self), fields(key = %key))]
    pub async fn run_automated_turn(&self, key: ScheduleKey) -> Result<AutomatedTurn, ArenaError> {
        let session_id = *key.session_id();
        let session = match self.service.session(&session_id).await {
            Ok(session) => session,
            Err(ArenaError::SessionNotFound(_)) => {
                return Ok(AutomatedTurn::Dropped(DropReason::SessionMissing));
            }
            Err(e) => return Err(e),
        };

        if !still_current(&session, &key) {
            return Ok(AutomatedTurn::Dropped(DropReason::Stale));
        }

        let turn = *key.turn();
        match self.service.participant(&turn).await {
            Ok(participant) if participant.is_automated() => {}
            Ok(_) | Err(ArenaError::ParticipantNotFound(_)) => {
                return Ok(AutomatedTurn::Dropped(DropReason::NotAutomated));
            }
            Err(e) => return Err(e),
        }

        let Some(mark) = session.mark_of(&turn) else {
            return Ok(AutomatedTurn::Dropped(DropReason::Stale));
        };
        let cell = {
            let mut rng = self.rng.lock().await;
            choose_move(session.board(), mark, &mut *rng)
        };
        let Some(cell) = cell else {
            return Ok(AutomatedTurn::Dropped(DropReason::NoOpenCell));
        };

        debug!(cell, mark = %mark, "Automated participant chose cell");
        match self
            .service
            .apply_move_if(&session_id, turn, cell, |fresh| still_current(fresh, &key))
            .await
        {
            Ok(session) => {
                info!(cell, plies = session.plies(), "Automated move applied");
                Ok(AutomatedTurn::Applied(session))
            }
            Err(ArenaError::Move(rejection)) => {
                Ok(AutomatedTurn::Dropped(DropReason::Rejected(rejection)))
            }
            Err(ArenaError::SessionNotFound(_)) => {
                Ok(AutomatedTurn::Dropped(DropReason::SessionMissing))
            }
            Err(e) => Err(e),
        }
    }

    /// Re-notifies every active session so that automated turns whose
    /// action gave up are armed again. Returns the number examined.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<usize, ArenaError> {
        let sessions = self.service.list_sessions(Some(Phase::Active)).await?;
        for session in &sessions {
            self.on_session_changed(session).await;
        }
        debug!(count = sessions.len(), "Sweep complete");
        Ok(sessions.len())
    }

    /// Delayed-action body: never propagates errors.
    async fn run_scheduled(&self, key: ScheduleKey) {
        match self.run_automated_turn(key).await {
            // Re-arming happens through the delayed-action facility, not
            // by looping here.
            Ok(AutomatedTurn::Applied(session)) => self.on_session_changed(&session).await,
            Ok(AutomatedTurn::Dropped(reason)) => {
                debug!(key = %key, %reason, "Automated turn dropped");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Automated turn failed, releasing for sweep");
                self.delays.release(&key).await;
            }
        }
    }
}

fn still_current(session: &Session, key: &ScheduleKey) -> bool {
    session.id() == *key.session_id()
        && session.phase() == Phase::Active
        && session.turn() == *key.turn()
        && session.plies() == *key.plies()
}
