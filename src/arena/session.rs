//! Game Session Management
//!
//! Owns every live and recently-ended session. A session holds exactly two
//! sides, the pending moves for the current round, the round counter and a
//! monotonic status (active, then ended).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::arena::registry::ConnectionId;
use crate::error::ArenaError;
use crate::game::ai::AI_DISPLAY_NAME;
use crate::game::resolver::RoundResolution;
use crate::game::types::{GameType, Move, Side};
use crate::network::protocol::SideView;

/// Unique session identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Allocate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a raw integer (tests and tooling).
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting moves.
    Active,
    /// Terminal.
    Ended,
}

/// Who occupies a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    /// A connected player.
    Human(ConnectionId),
    /// The built-in AI opponent.
    Ai,
}

/// Opponent requested when creating a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opponent {
    /// Second human player and their display name.
    Human(ConnectionId, String),
    /// AI opponent on side B.
    Ai,
}

/// State of one side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideState {
    /// Occupant.
    pub seat: Seat,
    /// Name shown to the opponent.
    pub display_name: String,
    /// Cumulative session score.
    pub score: u32,
    /// Move for the current round, if submitted.
    pub pending_move: Option<Move>,
}

impl SideState {
    fn new(seat: Seat, display_name: String) -> Self {
        Self {
            seat,
            display_name,
            score: 0,
            pending_move: None,
        }
    }

    /// Whether the AI plays this side.
    pub fn is_ai(&self) -> bool {
        self.seat == Seat::Ai
    }

    /// Connection of a human side.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        match self.seat {
            Seat::Human(id) => Some(id),
            Seat::Ai => None,
        }
    }

    /// Whether a move is pending for the current round.
    pub fn has_moved(&self) -> bool {
        self.pending_move.is_some()
    }

    /// Client-facing view of this side.
    pub fn view(&self) -> SideView {
        SideView {
            name: self.display_name.clone(),
            score: self.score,
            is_ai: self.is_ai(),
        }
    }
}

/// A two-sided game session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Game being played.
    pub game_type: GameType,
    sides: [SideState; 2],
    status: SessionStatus,
    round: u32,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    fn new(id: SessionId, game_type: GameType, side_a: SideState, side_b: SideState, now: DateTime<Utc>) -> Self {
        Self {
            id,
            game_type,
            sides: [side_a, side_b],
            status: SessionStatus::Active,
            round: 1,
            created_at: now,
            ended_at: None,
        }
    }

    /// State of one side.
    pub fn side(&self, side: Side) -> &SideState {
        &self.sides[side.index()]
    }

    /// Side occupied by a connection.
    pub fn side_of(&self, connection_id: &ConnectionId) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.side(*side).seat == Seat::Human(*connection_id))
    }

    /// Human sides and their connections.
    pub fn humans(&self) -> Vec<(Side, ConnectionId)> {
        Side::BOTH
            .into_iter()
            .filter_map(|side| self.side(side).connection_id().map(|id| (side, id)))
            .collect()
    }

    /// Whether one side is played by the AI.
    pub fn has_ai(&self) -> bool {
        self.sides.iter().any(SideState::is_ai)
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether the session still accepts moves.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Current round number (starts at 1).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session ended, if it has.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Lock in a move for one side of the current round.
    pub fn record_move(&mut self, side: Side, mv: Move) {
        self.sides[side.index()].pending_move = Some(mv);
    }

    /// Apply a resolved round: add score deltas, clear pending moves and
    /// advance the round counter.
    ///
    /// Returns the number of the round that was resolved.
    pub fn apply_round(&mut self, resolution: &RoundResolution) -> u32 {
        for side in Side::BOTH {
            let state = &mut self.sides[side.index()];
            state.score += resolution.side(side).score_delta;
            state.pending_move = None;
        }
        let resolved = self.round;
        self.round += 1;
        resolved
    }

    /// End the session. Returns false if it had already ended.
    pub fn end(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == SessionStatus::Ended {
            return false;
        }
        self.status = SessionStatus::Ended;
        self.ended_at = Some(now);
        for state in self.sides.iter_mut() {
            state.pending_move = None;
        }
        true
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// Owns all sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: BTreeMap<SessionId, Session>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a new active session.
    ///
    /// Side A is always human; side B is either a second human or the AI.
    /// A connection cannot be paired with itself.
    pub fn create(
        &mut self,
        game_type: GameType,
        side_a: (ConnectionId, String),
        side_b: Opponent,
        now: DateTime<Utc>,
    ) -> Result<&Session, ArenaError> {
        let (a_id, a_name) = side_a;
        let side_b = match side_b {
            Opponent::Human(b_id, _) if b_id == a_id => return Err(ArenaError::SelfPairing(a_id)),
            Opponent::Human(b_id, b_name) => SideState::new(Seat::Human(b_id), b_name),
            Opponent::Ai => SideState::new(Seat::Ai, AI_DISPLAY_NAME.to_string()),
        };

        let id = SessionId::generate();
        let session = Session::new(id, game_type, SideState::new(Seat::Human(a_id), a_name), side_b, now);
        Ok(self.sessions.entry(id).or_insert(session))
    }

    /// Get a session by id.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Get a mutable session by id.
    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Number of active sessions.
    pub fn live_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }

    /// Number of stored sessions, ended ones included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions that ended before `cutoff`. Returns how many were removed.
    pub fn prune_ended(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !matches!(s.ended_at, Some(ended) if ended < cutoff));
        before - self.sessions.len()
    }
}
