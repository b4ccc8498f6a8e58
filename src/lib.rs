//! Strictly Arena - two-party tic-tac-toe sessions with automated opponents
//!
//! Sessions move through a strict lifecycle (waiting, active, concluded).
//! Every move is validated against the freshest committed state and
//! written back with compare-and-swap, so concurrent callers can never
//! apply two moves for the same turn.
//!
//! # Architecture
//!
//! - **Games**: board model, win/draw rules, automated move policy
//! - **Session**: pure state machine over immutable snapshots
//! - **Store**: participant registry and versioned session store ports
//! - **Service**: read-compute-swap commit loop with bounded retry
//! - **Scheduler**: exactly-once automated turns over a delayed-action port
//! - **Hub**: wires the service to the scheduler
//!
//! # Example
//!
//! ```no_run
//! use strictly_arena::{ArenaConfig, GameHub, ParticipantKind};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let hub = GameHub::in_memory(ArenaConfig::default());
//! // Re-arms automated turns that gave up after contention.
//! let _sweeper = hub.spawn_sweeper();
//!
//! let alice = hub.create_participant("alice", ParticipantKind::Human).await?;
//! let session = hub.create_session(alice).await?;
//!
//! // Seat an automated opponent; its replies are scheduled automatically.
//! let session = hub.add_automated_opponent(&session.id()).await?;
//! hub.apply_move(&session.id(), alice, 4).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod delay;
mod error;
mod games;
mod hub;
mod scheduler;
mod service;
mod session;
mod store;

// Crate-level exports - Configuration
pub use config::{ArenaConfig, ConfigError};

// Crate-level exports - Errors
pub use error::ArenaError;

// Crate-level exports - Orchestration
pub use hub::GameHub;
pub use scheduler::{AutomatedTurn, DropReason, TurnScheduler};
pub use service::{SessionEvent, SessionService};

// Crate-level exports - Delayed actions
pub use delay::{DelayedActions, ScheduleKey, TokioDelayedActions};

// Crate-level exports - Storage ports
pub use store::{
    InMemoryParticipantRegistry, InMemorySessionStore, ParticipantRegistry, SessionStore,
    StoreError,
};

// Crate-level exports - Session model
pub use session::{
    HistoryReplaysToBoard, Invariant, InvariantSet, InvariantViolation, JoinRejection, Move,
    MoveRejection, OutcomeMatchesBoard, Outcome, Participant, ParticipantId, ParticipantKind,
    Phase, Seat, SeatingConsistent, Session, SessionId, SessionInvariants, TurnSeated, machine,
    validate,
};

// Crate-level exports - Game types (tic-tac-toe)
pub use games::tictactoe::{
    Board, CELL_COUNT, Cell, Evaluation, Mark, Position, WIN_LINES, check_winner, choose_move,
    completes_line, completing_cell, evaluate, is_full,
};
