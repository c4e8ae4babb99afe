//! # Duel Arena Server
//!
//! Matchmaking and round resolution for short two-player duels: dice rolls
//! and rock-paper-scissors, against another player or a built-in AI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DUEL ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── rng.rs      - Seedable Xorshift128+ PRNG                │
//! │                                                              │
//! │  game/           - Rules (pure, no shared state)             │
//! │  ├── types.rs    - Game types, moves, sides                  │
//! │  ├── resolver.rs - Round resolution per game                 │
//! │  └── ai.rs       - AI move generation                        │
//! │                                                              │
//! │  arena/          - Shared tables and the command handler     │
//! │  ├── registry.rs - Connection → player record                │
//! │  ├── matchmaking.rs - Per-game FIFO queues                   │
//! │  ├── session.rs  - Live and ended sessions                   │
//! │  └── leaderboard.rs - Win/loss standings                     │
//! │                                                              │
//! │  network/        - Transport                                 │
//! │  ├── server.rs   - WebSocket server, cleanup loop            │
//! │  └── protocol.rs - Message types                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! The arena is a plain synchronous state machine. The server runs every
//! command under one mutex and forwards the resulting notifications, so
//! each command observes and leaves behind a consistent set of tables.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod arena;
pub mod core;
pub mod error;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use arena::{Arena, ArenaCommand, ConnectionId, Outbound, SessionId};
pub use core::rng::DeterministicRng;
pub use error::ArenaError;
pub use game::types::{GameType, Move, RpsChoice, Side};
pub use network::{ClientMessage, GameServer, ServerConfig, ServerMessage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session points for winning a dice round.
pub const DICE_WIN_POINTS: u32 = 10;

/// Session points for winning a rock-paper-scissors round.
pub const RPS_WIN_POINTS: u32 = 15;

/// Leaderboard points per win, regardless of game.
pub const LEADERBOARD_WIN_POINTS: u32 = 10;

/// Number of leaderboard rows sent to clients.
pub const LEADERBOARD_SIZE: usize = 10;
