//! Arena Errors
//!
//! Every failure a command can hit inside the arena. None of these are fatal:
//! the command boundary turns them into an error notice for the caller (or
//! drops the command silently, for unknown callers).

use thiserror::Error;

use crate::arena::registry::ConnectionId;
use crate::arena::session::SessionId;
use crate::game::types::GameType;
use crate::network::protocol::ErrorKind;

/// Errors raised by arena operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// Command from a connection that never registered.
    #[error("unknown player {0}")]
    UnknownPlayer(ConnectionId),

    /// Connection is already waiting in this game's queue.
    #[error("already queued for {0}")]
    AlreadyQueued(GameType),

    /// Game type string is not one of the supported games.
    #[error("invalid game type: {0:?}")]
    InvalidGameType(String),

    /// No session with this id exists.
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// Session exists but has already ended.
    #[error("session {0} is not active")]
    SessionNotActive(SessionId),

    /// Caller does not occupy either side of the session.
    #[error("not a participant in session {0}")]
    NotAParticipant(SessionId),

    /// Move value is not valid for the session's game.
    #[error("invalid move {value:?} for {game_type}")]
    InvalidMove {
        /// Game the move was submitted for.
        game_type: GameType,
        /// Raw submitted value.
        value: String,
    },

    /// Caller already locked in a move for the current round.
    #[error("move already submitted for round {0}")]
    MoveAlreadySubmitted(u32),

    /// Caller is already playing in an active session.
    #[error("already in session {0}")]
    AlreadyInSession(SessionId),

    /// Both sides of a new session would be the same connection.
    #[error("connection {0} cannot play itself")]
    SelfPairing(ConnectionId),
}

impl ArenaError {
    /// Error kind reported to the client.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArenaError::AlreadyQueued(_) => ErrorKind::AlreadyQueued,
            ArenaError::InvalidGameType(_) => ErrorKind::InvalidGameType,
            ArenaError::UnknownPlayer(_)
            | ArenaError::SessionNotFound(_)
            | ArenaError::SessionNotActive(_)
            | ArenaError::NotAParticipant(_)
            | ArenaError::InvalidMove { .. }
            | ArenaError::MoveAlreadySubmitted(_)
            | ArenaError::AlreadyInSession(_)
            | ArenaError::SelfPairing(_) => ErrorKind::InvalidState,
        }
    }
}
