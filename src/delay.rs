//! Delayed-action facility used to schedule automated moves.

use crate::session::{ParticipantId, SessionId};
use async_trait::async_trait;
use derive_getters::Getters;
use derive_new::new;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, instrument};

/// Identifies one automated turn: the session, who is to move, and how
/// many moves had been applied when the turn began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, new)]
pub struct ScheduleKey {
    session_id: SessionId,
    turn: ParticipantId,
    plies: usize,
}

impl std::fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.session_id, self.plies)
    }
}

/// Runs actions after a delay, deduplicated by [`ScheduleKey`].
#[async_trait]
pub trait DelayedActions: Send + Sync {
    /// Arranges for `action` to run once after `delay`.
    ///
    /// A request is a no-op when the same key, or a later turn of the
    /// same session, is already armed. Returns whether the action was
    /// scheduled.
    async fn schedule_after(
        &self,
        delay: Duration,
        key: ScheduleKey,
        action: BoxFuture<'static, ()>,
    ) -> bool;

    /// Disarms `key` so that a later request for it schedules again.
    ///
    /// Does nothing if a different key is armed for the session.
    async fn release(&self, key: &ScheduleKey);

    /// Drops whatever is remembered for a session that has concluded.
    async fn forget(&self, session_id: &SessionId);
}

/// [`DelayedActions`] on the tokio runtime.
///
/// Remembers the latest armed key per session; each scheduled action is
/// a spawned task that sleeps and then runs.
#[derive(Debug, Clone, Default)]
pub struct TokioDelayedActions {
    armed: Arc<Mutex<HashMap<SessionId, ScheduleKey>>>,
}

impl TokioDelayedActions {
    /// Creates a facility with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DelayedActions for TokioDelayedActions {
    #[instrument(skip(self, action), fields(key = %key))]
    async fn schedule_after(
        &self,
        delay: Duration,
        key: ScheduleKey,
        action: BoxFuture<'static, ()>,
    ) -> bool {
        {
            let mut armed = self.armed.lock().await;
            if let Some(existing) = armed.get(key.session_id())
                && existing.plies() >= key.plies()
            {
                debug!(armed = %existing, "Turn already armed, skipping");
                return false;
            }
            armed.insert(*key.session_id(), key);
        }

        debug!(delay_ms = delay.as_millis() as u64, "Arming delayed action");
        tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                action.await;
            }
            .in_current_span(),
        );
        true
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn release(&self, key: &ScheduleKey) {
        let mut armed = self.armed.lock().await;
        if armed.get(key.session_id()) == Some(key) {
            armed.remove(key.session_id());
            debug!("Released armed turn");
        }
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn forget(&self, session_id: &SessionId) {
        if self.armed.lock().await.remove(session_id).is_some() {
            debug!("Forgot concluded session");
        }
    }
}

impl TokioDelayedActions {
    /// Number of sessions with an armed key on record.
    pub async fn armed_sessions(&self) -> usize {
        self.armed.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_action(counter: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let counter = Arc::clone(counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_same_key_runs_once() {
        let delays = TokioDelayedActions::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = ScheduleKey::new(SessionId::new(), ParticipantId::new(), 1);

        assert!(delays.schedule_after(Duration::ZERO, key, counting_action(&counter)).await);
        assert!(!delays.schedule_after(Duration::ZERO, key, counting_action(&counter)).await);
        settle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_turn_is_ignored() {
        let delays = TokioDelayedActions::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let session_id = SessionId::new();
        let turn = ParticipantId::new();

        let later = ScheduleKey::new(session_id, turn, 3);
        let earlier = ScheduleKey::new(session_id, turn, 1);
        assert!(delays.schedule_after(Duration::ZERO, later, counting_action(&counter)).await);
        assert!(!delays.schedule_after(Duration::ZERO, earlier, counting_action(&counter)).await);
        settle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_allows_rearm() {
        let delays = TokioDelayedActions::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let key = ScheduleKey::new(SessionId::new(), ParticipantId::new(), 0);

        assert!(delays.schedule_after(Duration::ZERO, key, counting_action(&counter)).await);
        delays.release(&key).await;
        assert!(delays.schedule_after(Duration::ZERO, key, counting_action(&counter)).await);
        settle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_release_ignores_other_key() {
        let delays = TokioDelayedActions::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let session_id = SessionId::new();
        let turn = ParticipantId::new();
        let armed = ScheduleKey::new(session_id, turn, 2);

        assert!(delays.schedule_after(Duration::ZERO, armed, counting_action(&counter)).await);
        delays.release(&ScheduleKey::new(session_id, turn, 0)).await;
        assert!(!delays.schedule_after(Duration::ZERO, armed, counting_action(&counter)).await);
    }

    #[tokio::test]
    async fn test_forget_clears_session() {
        let delays = TokioDelayedActions::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let session_id = SessionId::new();
        let key = ScheduleKey::new(session_id, ParticipantId::new(), 4);

        assert!(delays.schedule_after(Duration::ZERO, key, counting_action(&counter)).await);
        assert_eq!(delays.armed_sessions().await, 1);

        delays.forget(&session_id).await;
        assert_eq!(delays.armed_sessions().await, 0);
        // Forgetting an unknown session is harmless.
        delays.forget(&SessionId::new()).await;
    }
}
