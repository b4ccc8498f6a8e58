//! Tests for automated turns scheduled through the hub.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strictly_arena::{
    ArenaConfig, AutomatedTurn, DropReason, GameHub, InMemoryParticipantRegistry,
    InMemorySessionStore, InvariantSet, JoinRejection, Outcome, ParticipantKind, Phase,
    ScheduleKey, Session, SessionEvent, SessionId, SessionInvariants, SessionStore, StoreError,
    TokioDelayedActions,
};
use tokio::sync::broadcast;

const WAIT: Duration = Duration::from_secs(5);

fn config() -> ArenaConfig {
    ArenaConfig::default().with_ai_delay_ms(0).with_ai_seed(1)
}

/// Receives events until `wanted` matches one, failing after [`WAIT`].
async fn wait_for<F>(events: &mut broadcast::Receiver<SessionEvent>, wanted: F) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.unwrap();
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn concluded(id: SessionId) -> impl Fn(&SessionEvent) -> bool {
    move |event| matches!(event, SessionEvent::Concluded { session_id, .. } if *session_id == id)
}

fn applied_at(id: SessionId, wanted: usize) -> impl Fn(&SessionEvent) -> bool {
    move |event| {
        matches!(event, SessionEvent::MoveApplied { session_id, plies, .. }
            if *session_id == id && *plies == wanted)
    }
}

#[tokio::test]
async fn test_automated_first_seat_opens_center() {
    let hub = GameHub::in_memory(config());
    let mut events = hub.subscribe();

    let ai = hub
        .create_participant("bot", ParticipantKind::Automated)
        .await
        .unwrap();
    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(ai).await.unwrap();
    hub.join_session(&session.id(), human).await.unwrap();

    let event = wait_for(&mut events, applied_at(session.id(), 1)).await;
    assert_eq!(
        event,
        SessionEvent::MoveApplied {
            session_id: session.id(),
            participant: ai,
            cell: 4,
            plies: 1
        }
    );
    assert_eq!(hub.session(&session.id()).await.unwrap().turn(), human);
}

#[tokio::test]
async fn test_automated_opponent_replies_and_blocks() {
    let hub = GameHub::in_memory(config());
    let mut events = hub.subscribe();

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let session = hub.add_automated_opponent(&session.id()).await.unwrap();
    let id = session.id();

    let opponent = hub.participant(session.seats()[1].participant()).await.unwrap();
    assert!(opponent.is_automated());
    assert_eq!(opponent.name(), "AI Player");

    hub.apply_move(&id, human, 0).await.unwrap();
    wait_for(&mut events, applied_at(id, 2)).await;
    // Opponent takes the center.
    assert!(!hub.session(&id).await.unwrap().board().is_empty(4));

    hub.apply_move(&id, human, 1).await.unwrap();
    wait_for(&mut events, applied_at(id, 4)).await;
    // Opponent blocks the top row.
    assert!(!hub.session(&id).await.unwrap().board().is_empty(2));
}

#[tokio::test]
async fn test_human_against_automated_concludes() {
    let hub = GameHub::in_memory(config());
    let mut events = hub.subscribe();

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let id = hub.add_automated_opponent(&session.id()).await.unwrap().id();

    loop {
        let session = hub.session(&id).await.unwrap();
        if session.phase() == Phase::Concluded {
            assert!(SessionInvariants::check_all(&session).is_ok());
            break;
        }
        if session.turn() == human {
            let cell = session.board().available_cells().next().unwrap();
            hub.apply_move(&id, human, cell).await.unwrap();
        } else {
            wait_for(&mut events, |e| {
                matches!(e, SessionEvent::MoveApplied { session_id, .. } if *session_id == id)
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_two_automated_participants_play_to_the_end() {
    let hub = GameHub::in_memory(config());
    let mut events = hub.subscribe();

    let x = hub
        .create_participant("bot x", ParticipantKind::Automated)
        .await
        .unwrap();
    let o = hub
        .create_participant("bot o", ParticipantKind::Automated)
        .await
        .unwrap();
    let session = hub.create_session(x).await.unwrap();
    hub.join_session(&session.id(), o).await.unwrap();

    wait_for(&mut events, concluded(session.id())).await;

    let session = hub.session(&session.id()).await.unwrap();
    assert_eq!(session.phase(), Phase::Concluded);
    assert!(SessionInvariants::check_all(&session).is_ok());
    // From a center opening these tiers always hold at least a draw for X.
    assert_ne!(session.outcome(), Outcome::Won(o));
}

#[tokio::test]
async fn test_repeated_notification_moves_once() {
    let hub = GameHub::in_memory(config().with_ai_delay_ms(100));

    let ai = hub
        .create_participant("bot", ParticipantKind::Automated)
        .await
        .unwrap();
    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(ai).await.unwrap();
    let session = hub.join_session(&session.id(), human).await.unwrap();

    hub.scheduler().on_session_changed(&session).await;
    hub.scheduler().on_session_changed(&session).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let session = hub.session(&session.id()).await.unwrap();
    assert_eq!(session.plies(), 1);
    assert_eq!(session.turn(), human);
}

#[tokio::test]
async fn test_stale_key_is_dropped() {
    // Long delay: the armed action never fires during the test.
    let hub = GameHub::in_memory(config().with_ai_delay_ms(60_000));

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let session = hub.add_automated_opponent(&session.id()).await.unwrap();
    let id = session.id();
    let ai = *session.seats()[1].participant();

    hub.apply_move(&id, human, 0).await.unwrap();

    let early = ScheduleKey::new(id, ai, 0);
    assert_eq!(
        hub.scheduler().run_automated_turn(early).await.unwrap(),
        AutomatedTurn::Dropped(DropReason::Stale)
    );

    let current = ScheduleKey::new(id, ai, 1);
    let applied = hub.scheduler().run_automated_turn(current).await.unwrap();
    assert!(matches!(applied, AutomatedTurn::Applied(ref s) if s.plies() == 2));

    // The same key again finds the turn already taken.
    assert_eq!(
        hub.scheduler().run_automated_turn(current).await.unwrap(),
        AutomatedTurn::Dropped(DropReason::Stale)
    );
    assert_eq!(hub.session(&id).await.unwrap().plies(), 2);
}

#[tokio::test]
async fn test_human_turn_key_is_dropped() {
    let hub = GameHub::in_memory(config().with_ai_delay_ms(60_000));

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let id = hub.add_automated_opponent(&session.id()).await.unwrap().id();

    let key = ScheduleKey::new(id, human, 0);
    assert_eq!(
        hub.scheduler().run_automated_turn(key).await.unwrap(),
        AutomatedTurn::Dropped(DropReason::NotAutomated)
    );

    let missing = ScheduleKey::new(SessionId::new(), human, 0);
    assert_eq!(
        hub.scheduler().run_automated_turn(missing).await.unwrap(),
        AutomatedTurn::Dropped(DropReason::SessionMissing)
    );
}

#[tokio::test]
async fn test_add_automated_opponent_to_full_session_rejected() {
    let hub = GameHub::in_memory(config());

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    hub.add_automated_opponent(&session.id()).await.unwrap();

    let err = hub.add_automated_opponent(&session.id()).await.unwrap_err();
    assert_eq!(err.join_rejection(), Some(JoinRejection::SessionFull));
}

/// Refuses every swap that would produce `failing_at` moves.
struct FlakyStore {
    inner: InMemorySessionStore,
    failing_at: AtomicUsize,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create_session(&self, session: Session) -> Result<SessionId, StoreError> {
        self.inner.create_session(session).await
    }

    async fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.inner.get_session(id).await
    }

    async fn compare_and_swap(
        &self,
        id: &SessionId,
        expected: u64,
        next: Session,
    ) -> Result<(), StoreError> {
        if next.plies() == self.failing_at.load(Ordering::SeqCst) {
            return Err(StoreError::VersionConflict {
                session_id: *id,
                expected,
                found: expected + 1,
            });
        }
        self.inner.compare_and_swap(id, expected, next).await
    }

    async fn list_sessions(&self, phase: Option<Phase>) -> Result<Vec<Session>, StoreError> {
        self.inner.list_sessions(phase).await
    }
}

#[tokio::test]
async fn test_sweep_recovers_failed_turn() {
    let store = Arc::new(FlakyStore {
        inner: InMemorySessionStore::new(),
        failing_at: AtomicUsize::new(2),
    });
    let hub = GameHub::new(
        store.clone(),
        Arc::new(InMemoryParticipantRegistry::new()),
        Arc::new(TokioDelayedActions::new()),
        config().with_max_commit_attempts(2),
    );
    let mut events = hub.subscribe();

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let id = hub.add_automated_opponent(&session.id()).await.unwrap().id();

    hub.apply_move(&id, human, 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    // The automated reply gave up after contention.
    assert_eq!(hub.session(&id).await.unwrap().plies(), 1);

    store.failing_at.store(usize::MAX, Ordering::SeqCst);
    assert_eq!(hub.scheduler().sweep().await.unwrap(), 1);

    wait_for(&mut events, applied_at(id, 2)).await;
    assert_eq!(hub.session(&id).await.unwrap().plies(), 2);
}

#[tokio::test]
async fn test_sweep_ignores_waiting_and_human_turns() {
    let hub = GameHub::in_memory(config());

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let waiting = hub.create_session(human).await.unwrap();
    let other = hub.create_session(human).await.unwrap();
    hub.add_automated_opponent(&other.id()).await.unwrap();

    assert_eq!(hub.scheduler().sweep().await.unwrap(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(hub.session(&waiting.id()).await.unwrap().plies(), 0);
    assert_eq!(hub.session(&other.id()).await.unwrap().plies(), 0);
}

#[tokio::test]
async fn test_concluded_session_leaves_nothing_armed() {
    let delays = TokioDelayedActions::new();
    let hub = GameHub::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryParticipantRegistry::new()),
        Arc::new(delays.clone()),
        config(),
    );
    let mut events = hub.subscribe();

    let x = hub
        .create_participant("bot x", ParticipantKind::Automated)
        .await
        .unwrap();
    let o = hub
        .create_participant("bot o", ParticipantKind::Automated)
        .await
        .unwrap();
    let session = hub.create_session(x).await.unwrap();
    hub.join_session(&session.id(), o).await.unwrap();

    wait_for(&mut events, concluded(session.id())).await;

    // The final action forgets the session after publishing the conclusion.
    tokio::time::timeout(WAIT, async {
        while delays.armed_sessions().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("concluded session still armed");
}

#[tokio::test]
async fn test_spawned_sweeper_recovers_failed_turn() {
    let store = Arc::new(FlakyStore {
        inner: InMemorySessionStore::new(),
        failing_at: AtomicUsize::new(2),
    });
    let hub = GameHub::new(
        store.clone(),
        Arc::new(InMemoryParticipantRegistry::new()),
        Arc::new(TokioDelayedActions::new()),
        config()
            .with_max_commit_attempts(2)
            .with_sweep_interval_secs(1),
    );
    let mut events = hub.subscribe();

    let human = hub
        .create_participant("alice", ParticipantKind::Human)
        .await
        .unwrap();
    let session = hub.create_session(human).await.unwrap();
    let id = hub.add_automated_opponent(&session.id()).await.unwrap().id();

    hub.apply_move(&id, human, 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(hub.session(&id).await.unwrap().plies(), 1);

    store.failing_at.store(usize::MAX, Ordering::SeqCst);
    let sweeper = hub.spawn_sweeper();

    wait_for(&mut events, applied_at(id, 2)).await;
    sweeper.abort();
    assert_eq!(hub.session(&id).await.unwrap().plies(), 2);
}
