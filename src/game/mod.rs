//! Game Rules Module
//!
//! Everything that decides a round. Pure apart from the RNG the caller passes in.
//!
//! ## Module Structure
//!
//! - `types`: Game types, moves, sides
//! - `resolver`: Pluggable round resolution (dice, rock-paper-scissors)
//! - `ai`: Stateless AI opponent

pub mod types;
pub mod resolver;
pub mod ai;

// Re-export key types
pub use types::{GameType, Move, RpsChoice, Side};
pub use resolver::{Outcome, MoveDisplay, RoundResolution, RoundRule, rule_for};
