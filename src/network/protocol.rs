//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON text frames tagged by `type`.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::arena::leaderboard::LeaderboardEntry;
use crate::arena::ArenaCommand;
use crate::arena::session::SessionId;
use crate::game::resolver::{MoveDisplay, Outcome};
use crate::game::types::GameType;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register this connection, optionally with a display name.
    Register {
        /// Requested display name; a default is generated when absent.
        #[serde(default)]
        name: Option<String>,
    },

    /// Join a game's matchmaking queue.
    JoinQueue {
        /// Game to queue for (`dice` or `rps`).
        game_type: String,
    },

    /// Leave a game's matchmaking queue.
    LeaveQueue {
        /// Game whose queue to leave.
        game_type: String,
    },

    /// Start a session against the AI.
    PlayAi {
        /// Game to play.
        game_type: String,
    },

    /// Submit a move for the current round.
    SubmitMove {
        /// Session the move belongs to.
        session_id: SessionId,
        /// Raw move (`rock`, `paper`, `scissors`; anything for dice).
        #[serde(rename = "move")]
        choice: String,
    },

    /// Leave the current session (forfeits against a human).
    LeaveSession,

    /// Request the top-10 leaderboard.
    GetLeaderboard,

    /// Request server statistics.
    GetStats,

    /// Liveness check.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Where an inbound message is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Game command for the arena.
    Arena(ArenaCommand),
    /// Liveness check, answered by the transport.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
    /// Statistics query, answered by the transport.
    GetStats,
}

impl ClientMessage {
    /// Split transport queries from arena commands.
    pub fn route(self) -> Routed {
        match self {
            ClientMessage::Register { name } => Routed::Arena(ArenaCommand::Register { name }),
            ClientMessage::JoinQueue { game_type } => Routed::Arena(ArenaCommand::JoinQueue { game_type }),
            ClientMessage::LeaveQueue { game_type } => Routed::Arena(ArenaCommand::LeaveQueue { game_type }),
            ClientMessage::PlayAi { game_type } => Routed::Arena(ArenaCommand::PlayAi { game_type }),
            ClientMessage::SubmitMove { session_id, choice } => {
                Routed::Arena(ArenaCommand::SubmitMove { session_id, choice })
            }
            ClientMessage::LeaveSession => Routed::Arena(ArenaCommand::LeaveSession),
            ClientMessage::GetLeaderboard => Routed::Arena(ArenaCommand::GetLeaderboard),
            ClientMessage::GetStats => Routed::GetStats,
            ClientMessage::Ping { timestamp } => Routed::Ping { timestamp },
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registration accepted.
    Registered {
        /// Name the player is known by.
        display_name: String,
        /// Current top-10 standings.
        leaderboard: Vec<LeaderboardRow>,
    },

    /// Added to a matchmaking queue.
    Queued {
        /// Game queued for.
        game_type: GameType,
        /// 1-based position in the queue.
        position: usize,
    },

    /// Removed from a matchmaking queue.
    LeftQueue {
        /// Game whose queue was left.
        game_type: GameType,
        /// Set when the server removed the entry (`timeout`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A session started.
    SessionStarted(SessionStartInfo),

    /// Move recorded; waiting for the opponent.
    Waiting {
        /// Session identifier.
        session_id: SessionId,
        /// Round the move was recorded for.
        round: u32,
    },

    /// Opponent locked in a move.
    OpponentMoved {
        /// Session identifier.
        session_id: SessionId,
        /// Round the opponent moved in.
        round: u32,
    },

    /// A round was resolved.
    RoundResult(RoundResultInfo),

    /// Opponent left the session.
    OpponentLeft {
        /// Session identifier.
        session_id: SessionId,
        /// How the opponent left.
        reason: LeaveReason,
    },

    /// Session is over.
    SessionEnded {
        /// Session identifier.
        session_id: SessionId,
        /// Why the session ended.
        reason: LeaveReason,
    },

    /// Leaderboard snapshot.
    Leaderboard {
        /// Ranked rows, best first.
        entries: Vec<LeaderboardRow>,
    },

    /// Server statistics.
    Stats(ServerStats),

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server wall clock, Unix milliseconds.
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Human-readable reason.
        reason: String,
    },
}

/// One side of a session as seen by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideView {
    /// Display name.
    pub name: String,
    /// Session score.
    pub score: u32,
    /// Whether the AI plays this side.
    pub is_ai: bool,
}

/// Session start information, framed for the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartInfo {
    /// Session identifier.
    pub session_id: SessionId,
    /// Game being played.
    pub game_type: GameType,
    /// First round number.
    pub round: u32,
    /// The recipient's side.
    pub you: SideView,
    /// The other side.
    pub opponent: SideView,
}

/// Round result, framed for the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResultInfo {
    /// Session identifier.
    pub session_id: SessionId,
    /// Round that was resolved.
    pub round: u32,
    /// Recipient's move (roll or choice).
    pub your_move: MoveDisplay,
    /// Opponent's move.
    pub opponent_move: MoveDisplay,
    /// Outcome for the recipient.
    pub outcome: Outcome,
    /// Recipient's session score after the round.
    pub your_score: u32,
    /// Opponent's session score after the round.
    pub opponent_score: u32,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    /// Player left explicitly.
    Left,
    /// Player's connection dropped.
    Disconnected,
}

/// Leaderboard row as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based rank.
    pub rank: usize,
    /// Display name.
    pub name: String,
    /// Wins.
    pub wins: u32,
    /// Losses.
    pub losses: u32,
    /// Score.
    pub score: u32,
}

impl LeaderboardRow {
    /// Rank an already-sorted list of entries.
    pub fn from_entries(entries: &[LeaderboardEntry]) -> Vec<LeaderboardRow> {
        entries
            .iter()
            .enumerate()
            .map(|(i, e)| LeaderboardRow {
                rank: i + 1,
                name: e.display_name.clone(),
                wins: e.wins,
                losses: e.losses,
                score: e.score,
            })
            .collect()
    }
}

/// Aggregate server statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    /// Open WebSocket connections.
    pub open_connections: usize,
    /// Registered players.
    pub registered_players: usize,
    /// Active sessions.
    pub live_sessions: usize,
    /// Waiting connections per game.
    pub queue_depths: BTreeMap<GameType, usize>,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Already waiting in that queue.
    AlreadyQueued,
    /// Unknown game type.
    InvalidGameType,
    /// Command does not fit the current session state.
    InvalidState,
    /// Frame could not be parsed.
    InvalidMessage,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build an error message.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError { kind, message: message.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::RpsChoice;

    #[test]
    fn test_client_message_parsing() {
        let msg = ClientMessage::from_json(r#"{"type":"register","name":"alice"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Register { name: Some("alice".into()) });

        let msg = ClientMessage::from_json(r#"{"type":"register"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Register { name: None });

        let msg = ClientMessage::from_json(r#"{"type":"join_queue","game_type":"rps"}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinQueue { game_type: "rps".into() });

        let msg = ClientMessage::from_json(r#"{"type":"leave_session"}"#).unwrap();
        assert_eq!(msg, ClientMessage::LeaveSession);
    }

    #[test]
    fn test_submit_move_uses_move_field() {
        let session_id = SessionId::from_u128(42);
        let json = format!(r#"{{"type":"submit_move","session_id":"{}","move":"rock"}}"#, session_id);
        let msg = ClientMessage::from_json(&json).unwrap();
        assert_eq!(msg, ClientMessage::SubmitMove { session_id, choice: "rock".into() });

        let back = msg.to_json().unwrap();
        assert!(back.contains(r#""move":"rock""#));
    }

    #[test]
    fn test_route_splits_queries_from_commands() {
        assert_eq!(ClientMessage::Ping { timestamp: 5 }.route(), Routed::Ping { timestamp: 5 });
        assert_eq!(ClientMessage::GetStats.route(), Routed::GetStats);
        assert_eq!(
            ClientMessage::JoinQueue { game_type: "dice".into() }.route(),
            Routed::Arena(ArenaCommand::JoinQueue { game_type: "dice".into() }),
        );
        assert_eq!(ClientMessage::LeaveSession.route(), Routed::Arena(ArenaCommand::LeaveSession));
    }

    #[test]
    fn test_malformed_frames_rejected() {
        assert!(ClientMessage::from_json("not json").is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json(
            r#"{"type":"submit_move","session_id":"nope","move":"rock"}"#
        ).is_err());
    }

    #[test]
    fn test_round_result_json() {
        let msg = ServerMessage::RoundResult(RoundResultInfo {
            session_id: SessionId::from_u128(1),
            round: 3,
            your_move: MoveDisplay::Choice(RpsChoice::Rock),
            opponent_move: MoveDisplay::Choice(RpsChoice::Scissors),
            outcome: Outcome::Win,
            your_score: 15,
            opponent_score: 0,
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"round_result""#));
        assert!(json.contains(r#""outcome":"win""#));
        assert!(json.contains(r#""your_move":"rock""#));

        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_dice_result_shows_rolls() {
        let msg = ServerMessage::RoundResult(RoundResultInfo {
            session_id: SessionId::from_u128(1),
            round: 1,
            your_move: MoveDisplay::Roll(6),
            opponent_move: MoveDisplay::Roll(2),
            outcome: Outcome::Win,
            your_score: 10,
            opponent_score: 0,
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""your_move":6"#));
        assert!(json.contains(r#""opponent_move":2"#));
    }

    #[test]
    fn test_left_queue_omits_empty_reason() {
        let json = ServerMessage::LeftQueue { game_type: GameType::Dice, reason: None }
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"type":"left_queue","game_type":"dice"}"#);
    }

    #[test]
    fn test_error_codes() {
        let json = ServerMessage::error(ErrorKind::AlreadyQueued, "already queued for rps")
            .to_json()
            .unwrap();
        assert!(json.contains("already_queued"));
    }

    #[test]
    fn test_leaderboard_rows_are_ranked() {
        let entries = vec![
            LeaderboardEntry {
                connection_id: crate::arena::registry::ConnectionId::from_u128(1),
                display_name: "alice".into(),
                wins: 2,
                losses: 0,
                score: 20,
            },
            LeaderboardEntry {
                connection_id: crate::arena::registry::ConnectionId::from_u128(2),
                display_name: "bob".into(),
                wins: 0,
                losses: 2,
                score: 0,
            },
        ];
        let rows = LeaderboardRow::from_entries(&entries);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].name, "bob");
    }
}
