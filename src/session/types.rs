//! Session aggregate and participant references.

use crate::games::tictactoe::{Board, Mark};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque identifier for a participant, issued by the registry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Generates a fresh random participant id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who is behind a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    /// Moves arrive from an external caller.
    Human,
    /// Moves are chosen by the automated policy and applied by the scheduler.
    Automated,
}

/// A registered participant. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    kind: ParticipantKind,
}

impl Participant {
    /// Returns true for automated participants.
    pub fn is_automated(&self) -> bool {
        self.kind == ParticipantKind::Automated
    }
}

/// A seat at the board: participant reference plus assigned mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Seat {
    participant: ParticipantId,
    mark: Mark,
}

/// An applied move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Move {
    participant: ParticipantId,
    cell: usize,
    mark: Mark,
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Awaiting the second participant.
    Waiting,
    /// Moves may be made.
    Active,
    /// Terminal: won or drawn.
    Concluded,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Waiting => write!(f, "waiting"),
            Phase::Active => write!(f, "active"),
            Phase::Concluded => write!(f, "concluded"),
        }
    }
}

/// Result of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// No result yet.
    Undecided,
    /// The participant completed a line.
    Won(ParticipantId),
    /// Board filled with no completed line.
    Drawn,
}

impl Outcome {
    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<ParticipantId> {
        match self {
            Outcome::Won(id) => Some(*id),
            Outcome::Undecided | Outcome::Drawn => None,
        }
    }
}

/// A tic-tac-toe session, the aggregate root owned by the state machine.
///
/// Sessions are values: callers read a snapshot, compute the next
/// session through the [`machine`](super::machine) transitions and commit it against
/// the snapshot's [`revision`](Session::revision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub(super) id: SessionId,
    pub(super) board: Board,
    pub(super) seats: Vec<Seat>,
    pub(super) turn: ParticipantId,
    pub(super) phase: Phase,
    pub(super) outcome: Outcome,
    pub(super) history: Vec<Move>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) revision: u64,
}

impl Session {
    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seats in seating order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Participant ids in seating order.
    pub fn participants(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.seats.iter().map(|s| *s.participant())
    }

    /// Participant whose move is currently legal.
    pub fn turn(&self) -> ParticipantId {
        self.turn
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Outcome, `Undecided` until concluded.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Applied moves, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    /// Number of applied moves.
    pub fn plies(&self) -> usize {
        self.history.len()
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of committed transitions; the optimistic concurrency version.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mark assigned to a participant, if seated.
    pub fn mark_of(&self, participant: &ParticipantId) -> Option<Mark> {
        self.seats
            .iter()
            .find(|s| s.participant() == participant)
            .map(|s| *s.mark())
    }

    /// The seated participant other than `participant`.
    pub fn opponent_of(&self, participant: &ParticipantId) -> Option<ParticipantId> {
        self.seats
            .iter()
            .map(|s| *s.participant())
            .find(|p| p != participant)
    }

    /// Returns true if the participant holds a seat.
    pub fn is_seated(&self, participant: &ParticipantId) -> bool {
        self.mark_of(participant).is_some()
    }
}
