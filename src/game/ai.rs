//! AI Opponent
//!
//! Stateless move generator for the AI side of a session. The AI answers in
//! the same step the human moves, so AI sessions never wait.

use crate::core::rng::DeterministicRng;
use crate::game::types::{GameType, Move, RpsChoice};

/// Display name of the AI side.
pub const AI_DISPLAY_NAME: &str = "AI Opponent";

/// Generate the AI's move for one round.
///
/// Dice only needs the ready signal (the roll happens at resolution).
/// Rock-paper-scissors picks uniformly at random.
pub fn generate_move(game_type: GameType, rng: &mut DeterministicRng) -> Move {
    match game_type {
        GameType::Dice => Move::Ready,
        GameType::Rps => {
            let choice = rng
                .choose(&RpsChoice::ALL)
                .copied()
                .unwrap_or(RpsChoice::Rock);
            Move::Rps(choice)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dice_ai_is_ready() {
        let mut rng = DeterministicRng::new(1);
        assert_eq!(generate_move(GameType::Dice, &mut rng), Move::Ready);
    }

    #[test]
    fn test_rps_ai_uses_every_choice() {
        let mut rng = DeterministicRng::new(99);
        let mut seen = Vec::new();
        for _ in 0..300 {
            match generate_move(GameType::Rps, &mut rng) {
                Move::Rps(choice) => {
                    if !seen.contains(&choice) {
                        seen.push(choice);
                    }
                }
                Move::Ready => panic!("rps AI produced a ready signal"),
            }
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_ai_is_reproducible() {
        let mut rng1 = DeterministicRng::new(2024);
        let mut rng2 = DeterministicRng::new(2024);
        for _ in 0..50 {
            assert_eq!(
                generate_move(GameType::Rps, &mut rng1),
                generate_move(GameType::Rps, &mut rng2),
            );
        }
    }
}
