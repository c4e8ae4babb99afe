//! Network Layer
//!
//! WebSocket transport and wire protocol. All game state lives in `arena/`;
//! this layer only parses frames, serializes commands into the arena and
//! delivers the notifications it produces.

pub mod protocol;
pub mod server;

pub use protocol::{
    ClientMessage, ServerMessage, ErrorKind, LeaveReason, LeaderboardRow, Routed, ServerStats,
};
pub use server::{GameServer, ServerConfig, GameServerError};
