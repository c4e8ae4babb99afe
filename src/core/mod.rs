//! Core primitives.
//!
//! Seedable randomness shared by the dice rule and the AI opponent.

pub mod rng;

// Re-export core types
pub use rng::DeterministicRng;
