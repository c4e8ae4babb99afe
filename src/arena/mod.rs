//! Arena Command Handler
//!
//! Owns the four shared tables (registry, queues, sessions, leaderboard) and
//! runs every inbound command as one atomic read-check-mutate-emit step.
//! Nothing in here blocks or awaits: notifications are pushed to an outbox
//! that the transport drains and delivers after the command completes.
//!
//! Each command validates fully before it mutates, so an error never leaves
//! a table half-updated.

pub mod leaderboard;
pub mod matchmaking;
pub mod registry;
pub mod session;

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::error::ArenaError;
use crate::game::ai;
use crate::game::resolver::rule_for;
use crate::game::types::{GameType, Side};
use crate::network::protocol::{
    ServerMessage, SessionStartInfo, RoundResultInfo, LeaveReason, LeaderboardRow,
};
use crate::LEADERBOARD_SIZE;

pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use matchmaking::MatchmakingQueues;
pub use registry::{ConnectionId, PlayerRecord, Registry};
pub use session::{Opponent, Seat, Session, SessionId, SessionStatus, SessionStore, SideState};

/// A game command the arena executes.
///
/// Transport queries (ping, stats) never reach the arena; see
/// [`ClientMessage::route`](crate::network::protocol::ClientMessage::route).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaCommand {
    /// Register the connection.
    Register {
        /// Requested display name.
        name: Option<String>,
    },
    /// Join a game's queue.
    JoinQueue {
        /// Raw game type.
        game_type: String,
    },
    /// Leave a game's queue.
    LeaveQueue {
        /// Raw game type.
        game_type: String,
    },
    /// Start a session against the AI.
    PlayAi {
        /// Raw game type.
        game_type: String,
    },
    /// Submit a move.
    SubmitMove {
        /// Target session.
        session_id: SessionId,
        /// Raw move.
        choice: String,
    },
    /// Leave the current session.
    LeaveSession,
    /// Send the leaderboard to the caller.
    GetLeaderboard,
}

/// A notification addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Recipient.
    pub to: ConnectionId,
    /// Message to deliver.
    pub message: ServerMessage,
}

/// Counts projected straight from the core tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    /// Registered players.
    pub registered_players: usize,
    /// Active sessions.
    pub live_sessions: usize,
    /// Waiting connections per game.
    pub queue_depths: BTreeMap<GameType, usize>,
}

/// Cutoff instant for an age limit, or None if it cannot be represented.
fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
}

/// The matchmaking and session core.
#[derive(Debug)]
pub struct Arena {
    registry: Registry,
    queues: MatchmakingQueues,
    sessions: SessionStore,
    leaderboard: Leaderboard,
    rng: DeterministicRng,
    outbox: Vec<Outbound>,
}

impl Arena {
    /// Create an arena drawing dice rolls and AI moves from `rng`.
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            registry: Registry::new(),
            queues: MatchmakingQueues::new(),
            sessions: SessionStore::new(),
            leaderboard: Leaderboard::new(),
            rng,
            outbox: Vec::new(),
        }
    }

    /// Create an arena with a fixed RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(DeterministicRng::new(seed))
    }

    // =========================================================================
    // COMMAND BOUNDARY
    // =========================================================================

    /// Run one inbound command and return the notifications it produced.
    ///
    /// Errors become an error notice to the caller; commands from unknown
    /// connections are dropped without a reply.
    pub fn handle(&mut self, from: ConnectionId, command: ArenaCommand) -> Vec<Outbound> {
        let result = match command {
            ArenaCommand::Register { name } => self.register(from, name.as_deref()).map(drop),
            ArenaCommand::JoinQueue { game_type } => self.join_queue(from, &game_type).map(drop),
            ArenaCommand::LeaveQueue { game_type } => self.leave_queue(from, &game_type),
            ArenaCommand::PlayAi { game_type } => self.play_ai(from, &game_type).map(drop),
            ArenaCommand::SubmitMove { session_id, choice } => self.submit_move(from, session_id, &choice),
            ArenaCommand::LeaveSession => self.leave_session(from),
            ArenaCommand::GetLeaderboard => self.send_leaderboard(from),
        };

        match result {
            Ok(()) => {}
            Err(ArenaError::UnknownPlayer(id)) => {
                debug!("Dropping command from unregistered connection {}", id);
            }
            Err(e) => {
                debug!("Command from {} rejected: {}", from, e);
                self.emit(from, ServerMessage::error(e.kind(), e.to_string()));
            }
        }

        self.take_outbox()
    }

    /// Drain pending notifications.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, to: ConnectionId, message: ServerMessage) {
        self.outbox.push(Outbound { to, message });
    }

    fn require_player(&self, connection_id: &ConnectionId) -> Result<&PlayerRecord, ArenaError> {
        self.registry
            .lookup(connection_id)
            .ok_or(ArenaError::UnknownPlayer(*connection_id))
    }

    /// Fail if the caller is playing in an active session.
    fn require_idle(&self, connection_id: &ConnectionId) -> Result<(), ArenaError> {
        match self.registry.session_of(connection_id) {
            Some(session_id) if self.sessions.get(&session_id).is_some_and(Session::is_active) => {
                Err(ArenaError::AlreadyInSession(session_id))
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a connection (idempotent) and reply with the leaderboard.
    pub fn register(&mut self, connection_id: ConnectionId, name: Option<&str>) -> Result<PlayerRecord, ArenaError> {
        let record = self.registry.register(connection_id, name).clone();
        if self.leaderboard.ensure_entry(connection_id, &record.display_name) {
            info!("Registered {} as {:?}", connection_id, record.display_name);
        } else {
            debug!("Re-registration of {} keeps name {:?}", connection_id, record.display_name);
        }

        let leaderboard = self.leaderboard_rows();
        self.emit(connection_id, ServerMessage::Registered {
            display_name: record.display_name.clone(),
            leaderboard,
        });
        Ok(record)
    }

    // =========================================================================
    // MATCHMAKING
    // =========================================================================

    /// Join a game's queue; pairs immediately if an opponent is waiting.
    ///
    /// Returns the 1-based queue position at the time of joining.
    pub fn join_queue(&mut self, connection_id: ConnectionId, game_type: &str) -> Result<usize, ArenaError> {
        self.require_player(&connection_id)?;
        let game_type: GameType = game_type.parse()?;
        self.require_idle(&connection_id)?;

        let position = self.queues.enqueue(connection_id, game_type, Utc::now())?;
        debug!("{} queued for {} at position {}", connection_id, game_type, position);
        self.emit(connection_id, ServerMessage::Queued { game_type, position });

        if let Some((a, b)) = self.queues.dequeue_pair_if_ready(game_type) {
            // A paired player stops waiting for any other game
            self.queues.purge_all(&a);
            self.queues.purge_all(&b);
            self.start_session(game_type, a, Some(b))?;
        }

        Ok(position)
    }

    /// Leave a game's queue. Succeeds whether or not the caller was queued.
    pub fn leave_queue(&mut self, connection_id: ConnectionId, game_type: &str) -> Result<(), ArenaError> {
        self.require_player(&connection_id)?;
        let game_type: GameType = game_type.parse()?;

        if self.queues.leave(&connection_id, game_type) {
            debug!("{} left the {} queue", connection_id, game_type);
        }
        self.emit(connection_id, ServerMessage::LeftQueue { game_type, reason: None });
        Ok(())
    }

    /// Start a session against the AI.
    pub fn play_ai(&mut self, connection_id: ConnectionId, game_type: &str) -> Result<SessionId, ArenaError> {
        self.require_player(&connection_id)?;
        let game_type: GameType = game_type.parse()?;
        self.require_idle(&connection_id)?;

        for left in self.queues.purge_all(&connection_id) {
            self.emit(connection_id, ServerMessage::LeftQueue { game_type: left, reason: None });
        }
        self.start_session(game_type, connection_id, None)
    }

    /// Expire queue entries older than `max_wait`, notifying each one.
    pub fn expire_queue_entries(&mut self, now: DateTime<Utc>, max_wait: Duration) -> usize {
        let Some(cutoff) = cutoff(now, max_wait) else {
            return 0;
        };

        let expired = self.queues.expire(cutoff);
        for (connection_id, game_type) in &expired {
            info!("{} timed out in the {} queue", connection_id, game_type);
            self.emit(*connection_id, ServerMessage::LeftQueue {
                game_type: *game_type,
                reason: Some("timeout".to_string()),
            });
        }
        expired.len()
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Create a session, bind its human players and announce it to them.
    fn start_session(
        &mut self,
        game_type: GameType,
        side_a: ConnectionId,
        side_b: Option<ConnectionId>,
    ) -> Result<SessionId, ArenaError> {
        let name_of = |registry: &Registry, id: ConnectionId| {
            registry
                .lookup(&id)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| id.default_display_name())
        };

        let opponent = match side_b {
            Some(b) => Opponent::Human(b, name_of(&self.registry, b)),
            None => Opponent::Ai,
        };
        let a_name = name_of(&self.registry, side_a);
        let session = self.sessions.create(game_type, (side_a, a_name), opponent, Utc::now())?;

        let session_id = session.id;
        let round = session.round();
        let announcements: Vec<_> = session
            .humans()
            .into_iter()
            .map(|(side, id)| {
                (id, SessionStartInfo {
                    session_id,
                    game_type,
                    round,
                    you: session.side(side).view(),
                    opponent: session.side(side.other()).view(),
                })
            })
            .collect();

        for (id, info) in announcements {
            self.registry.bind_session(&id, session_id);
            self.emit(id, ServerMessage::SessionStarted(info));
        }

        info!(
            "Created {} session {} ({} vs {})",
            game_type,
            session_id,
            side_a,
            side_b.map_or_else(|| "AI".to_string(), |b| b.to_string()),
        );
        Ok(session_id)
    }

    /// Submit a move for the caller's side of a session.
    ///
    /// Resolves the round in the same call once both sides have moved; an AI
    /// opponent moves immediately, so AI rounds always resolve here.
    pub fn submit_move(&mut self, connection_id: ConnectionId, session_id: SessionId, raw_move: &str) -> Result<(), ArenaError> {
        self.require_player(&connection_id)?;

        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(ArenaError::SessionNotFound(session_id))?;
        if !session.is_active() {
            return Err(ArenaError::SessionNotActive(session_id));
        }
        let side = session
            .side_of(&connection_id)
            .ok_or(ArenaError::NotAParticipant(session_id))?;
        let mv = session.game_type.parse_move(raw_move)?;
        if session.side(side).has_moved() {
            return Err(ArenaError::MoveAlreadySubmitted(session.round()));
        }

        let opponent = session.side(side.other());
        let opponent_move = match opponent.pending_move {
            Some(pending) => Some(pending),
            None if opponent.is_ai() => Some(ai::generate_move(session.game_type, &mut self.rng)),
            None => None,
        };

        let Some(opponent_move) = opponent_move else {
            // Human opponent has not moved yet
            session.record_move(side, mv);
            let round = session.round();
            let opponent_id = session.side(side.other()).connection_id();

            self.emit(connection_id, ServerMessage::Waiting { session_id, round });
            if let Some(opponent_id) = opponent_id {
                self.emit(opponent_id, ServerMessage::OpponentMoved { session_id, round });
            }
            return Ok(());
        };

        let (move_a, move_b) = match side {
            Side::A => (mv, opponent_move),
            Side::B => (opponent_move, mv),
        };
        let resolution = rule_for(session.game_type).resolve(move_a, move_b, &mut self.rng)?;
        let round = session.apply_round(&resolution);

        let results: Vec<_> = session
            .humans()
            .into_iter()
            .map(|(side, id)| {
                let mine = resolution.side(side);
                let theirs = resolution.side(side.other());
                (id, RoundResultInfo {
                    session_id,
                    round,
                    your_move: mine.display,
                    opponent_move: theirs.display,
                    outcome: mine.outcome,
                    your_score: session.side(side).score,
                    opponent_score: session.side(side.other()).score,
                })
            })
            .collect();

        let standings = match resolution.winner() {
            Some(winner) if !session.has_ai() => session
                .side(winner)
                .connection_id()
                .zip(session.side(winner.other()).connection_id()),
            _ => None,
        };

        debug!(
            "Session {} round {} resolved: winner {:?}",
            session_id,
            round,
            resolution.winner(),
        );

        for (id, info) in results {
            self.emit(id, ServerMessage::RoundResult(info));
        }

        // Only decisive human-vs-human rounds count toward the leaderboard
        if let Some((winner, loser)) = standings {
            self.leaderboard.record_outcome(&winner, true);
            self.leaderboard.record_outcome(&loser, false);
            self.broadcast_leaderboard();
        }

        Ok(())
    }

    /// Leave the caller's active session.
    ///
    /// Against a human this is a forfeit: the opponent is credited a win and
    /// the leaver a loss, whatever the session score.
    pub fn leave_session(&mut self, connection_id: ConnectionId) -> Result<(), ArenaError> {
        self.require_player(&connection_id)?;
        if let Some(session_id) = self.registry.session_of(&connection_id) {
            self.registry.clear_session(&connection_id);
            self.end_session(session_id, connection_id, LeaveReason::Left);
        }
        Ok(())
    }

    /// Tear down a dropped connection.
    ///
    /// Purges it from every queue, removes its player record and forfeits
    /// its session if still active. The leaderboard entry is kept.
    pub fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        // Removed before the forfeit so the standings broadcast skips it
        let Some(record) = self.registry.remove(&connection_id) else {
            return;
        };

        self.queues.purge_all(&connection_id);
        if let Some(session_id) = record.session_id {
            self.end_session(session_id, connection_id, LeaveReason::Disconnected);
        }
        info!("Player {} ({}) disconnected", connection_id, record.display_name);
    }

    /// End a session the leaver was playing in and settle the forfeit.
    fn end_session(&mut self, session_id: SessionId, leaver: ConnectionId, reason: LeaveReason) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        // An ended session was already settled
        if !session.is_active() {
            return;
        }
        let Some(side) = session.side_of(&leaver) else {
            return;
        };

        session.end(Utc::now());
        let opponent = session.side(side.other()).connection_id();
        info!("Session {} ended: {} {:?}", session_id, leaver, reason);

        if let Some(opponent) = opponent {
            self.registry.clear_session(&opponent);
            self.emit(opponent, ServerMessage::OpponentLeft { session_id, reason });
            self.emit(opponent, ServerMessage::SessionEnded { session_id, reason });

            self.leaderboard.record_outcome(&opponent, true);
            self.leaderboard.record_outcome(&leaver, false);
        }

        if reason == LeaveReason::Left {
            self.emit(leaver, ServerMessage::SessionEnded { session_id, reason });
        }

        if opponent.is_some() {
            self.broadcast_leaderboard();
        }
    }

    /// Drop sessions that ended more than `retention` ago.
    pub fn prune_ended_sessions(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        match cutoff(now, retention) {
            Some(cutoff) => self.sessions.prune_ended(cutoff),
            None => 0,
        }
    }

    // =========================================================================
    // LEADERBOARD & QUERIES
    // =========================================================================

    fn leaderboard_rows(&self) -> Vec<LeaderboardRow> {
        LeaderboardRow::from_entries(&self.leaderboard.top_n(LEADERBOARD_SIZE))
    }

    fn send_leaderboard(&mut self, connection_id: ConnectionId) -> Result<(), ArenaError> {
        self.require_player(&connection_id)?;
        let entries = self.leaderboard_rows();
        self.emit(connection_id, ServerMessage::Leaderboard { entries });
        Ok(())
    }

    /// Push the current standings to every registered connection.
    fn broadcast_leaderboard(&mut self) {
        let entries = self.leaderboard_rows();
        let recipients: Vec<_> = self.registry.connection_ids().collect();
        for id in recipients {
            self.emit(id, ServerMessage::Leaderboard { entries: entries.clone() });
        }
    }

    /// Top `n` leaderboard entries.
    pub fn top_n(&self, n: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard.top_n(n)
    }

    /// Leaderboard entry for a connection.
    pub fn leaderboard_entry(&self, connection_id: &ConnectionId) -> Option<&LeaderboardEntry> {
        self.leaderboard.get(connection_id)
    }

    /// Whether a player has moved this round and waits on a human opponent.
    pub fn awaiting_opponent(&self, connection_id: &ConnectionId) -> bool {
        let Some(session) = self
            .registry
            .session_of(connection_id)
            .and_then(|id| self.sessions.get(&id))
            .filter(|s| s.is_active())
        else {
            return false;
        };
        let Some(side) = session.side_of(connection_id) else {
            return false;
        };

        let opponent = session.side(side.other());
        session.side(side).has_moved() && !opponent.is_ai() && !opponent.has_moved()
    }

    /// Registered player, if any.
    pub fn player(&self, connection_id: &ConnectionId) -> Option<&PlayerRecord> {
        self.registry.lookup(connection_id)
    }

    /// Session by id, active or ended.
    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Whether a connection waits in a game's queue.
    pub fn is_queued(&self, connection_id: &ConnectionId, game_type: GameType) -> bool {
        self.queues.is_queued(connection_id, game_type)
    }

    /// Core counts for the stats query.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            registered_players: self.registry.len(),
            live_sessions: self.sessions.live_count(),
            queue_depths: self.queues.depths(),
        }
    }
}
