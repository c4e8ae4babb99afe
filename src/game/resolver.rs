//! Round Resolution
//!
//! Turns a pair of submitted moves into a round outcome. Each game plugs in
//! through [`RoundRule`]; the rules are pure apart from the dice draw, which
//! comes from the caller's RNG.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::error::ArenaError;
use crate::game::types::{GameType, Move, RpsChoice, Side};

/// Round outcome from one side's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// This side won the round.
    Win,
    /// This side lost the round.
    Lose,
    /// Neither side won.
    Tie,
}

impl Outcome {
    /// The same result seen from the other side.
    pub fn flip(self) -> Outcome {
        match self {
            Outcome::Win => Outcome::Lose,
            Outcome::Lose => Outcome::Win,
            Outcome::Tie => Outcome::Tie,
        }
    }
}

/// What a client is shown for a move: the die roll or the RPS choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveDisplay {
    /// Rolled die face.
    Roll(u8),
    /// Rock-paper-scissors choice.
    Choice(RpsChoice),
}

/// One side's share of a resolved round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SideResult {
    /// Outcome for this side.
    pub outcome: Outcome,
    /// Points added to this side's session score.
    pub score_delta: u32,
    /// Move shown to clients.
    pub display: MoveDisplay,
}

/// Result of resolving one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundResolution {
    sides: [SideResult; 2],
}

impl RoundResolution {
    /// Build from side A's outcome; side B gets the mirror image.
    fn from_outcome(
        outcome_a: Outcome,
        win_points: u32,
        display_a: MoveDisplay,
        display_b: MoveDisplay,
    ) -> Self {
        let delta = |outcome: Outcome| if outcome == Outcome::Win { win_points } else { 0 };
        let outcome_b = outcome_a.flip();
        Self {
            sides: [
                SideResult { outcome: outcome_a, score_delta: delta(outcome_a), display: display_a },
                SideResult { outcome: outcome_b, score_delta: delta(outcome_b), display: display_b },
            ],
        }
    }

    /// Result for one side.
    pub fn side(&self, side: Side) -> &SideResult {
        &self.sides[side.index()]
    }

    /// Winning side, or None on a tie.
    pub fn winner(&self) -> Option<Side> {
        Side::BOTH
            .into_iter()
            .find(|side| self.side(*side).outcome == Outcome::Win)
    }

    /// Whether the round was a tie.
    pub fn is_tie(&self) -> bool {
        self.winner().is_none()
    }
}

/// A pluggable move-resolution rule.
pub trait RoundRule: Send + Sync {
    /// Game this rule resolves.
    fn game_type(&self) -> GameType;

    /// Resolve a round from side A's and side B's moves.
    fn resolve(
        &self,
        move_a: Move,
        move_b: Move,
        rng: &mut DeterministicRng,
    ) -> Result<RoundResolution, ArenaError>;
}

/// Dice duel: submitted moves are ignored, two dice are rolled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiceRule;

impl RoundRule for DiceRule {
    fn game_type(&self) -> GameType {
        GameType::Dice
    }

    fn resolve(
        &self,
        _move_a: Move,
        _move_b: Move,
        rng: &mut DeterministicRng,
    ) -> Result<RoundResolution, ArenaError> {
        let roll_a = rng.roll_die();
        let roll_b = rng.roll_die();
        Ok(resolve_rolls(roll_a, roll_b))
    }
}

/// Rock-paper-scissors with the standard cyclic dominance.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpsRule;

impl RoundRule for RpsRule {
    fn game_type(&self) -> GameType {
        GameType::Rps
    }

    fn resolve(
        &self,
        move_a: Move,
        move_b: Move,
        _rng: &mut DeterministicRng,
    ) -> Result<RoundResolution, ArenaError> {
        match (move_a, move_b) {
            (Move::Rps(a), Move::Rps(b)) => Ok(resolve_choices(a, b)),
            (Move::Rps(_), other) | (other, _) => Err(ArenaError::InvalidMove {
                game_type: GameType::Rps,
                value: format!("{:?}", other),
            }),
        }
    }
}

/// Rule for a game type.
pub fn rule_for(game_type: GameType) -> &'static dyn RoundRule {
    match game_type {
        GameType::Dice => &DiceRule,
        GameType::Rps => &RpsRule,
    }
}

/// Resolve a dice round from two rolled faces.
pub fn resolve_rolls(roll_a: u8, roll_b: u8) -> RoundResolution {
    let outcome = match roll_a.cmp(&roll_b) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Less => Outcome::Lose,
        std::cmp::Ordering::Equal => Outcome::Tie,
    };
    RoundResolution::from_outcome(
        outcome,
        GameType::Dice.win_points(),
        MoveDisplay::Roll(roll_a),
        MoveDisplay::Roll(roll_b),
    )
}

/// Resolve a rock-paper-scissors round.
pub fn resolve_choices(a: RpsChoice, b: RpsChoice) -> RoundResolution {
    let outcome = if a == b {
        Outcome::Tie
    } else if a.beats(b) {
        Outcome::Win
    } else {
        Outcome::Lose
    };
    RoundResolution::from_outcome(
        outcome,
        GameType::Rps.win_points(),
        MoveDisplay::Choice(a),
        MoveDisplay::Choice(b),
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_choice() -> impl Strategy<Value = RpsChoice> {
        prop_oneof![
            Just(RpsChoice::Rock),
            Just(RpsChoice::Paper),
            Just(RpsChoice::Scissors),
        ]
    }

    #[test]
    fn test_rock_beats_scissors() {
        let result = resolve_choices(RpsChoice::Rock, RpsChoice::Scissors);
        assert_eq!(result.winner(), Some(Side::A));
        assert_eq!(result.side(Side::A).outcome, Outcome::Win);
        assert_eq!(result.side(Side::A).score_delta, 15);
        assert_eq!(result.side(Side::B).outcome, Outcome::Lose);
        assert_eq!(result.side(Side::B).score_delta, 0);
        assert_eq!(result.side(Side::B).display, MoveDisplay::Choice(RpsChoice::Scissors));
    }

    #[test]
    fn test_rps_grid_has_three_ties() {
        let ties = RpsChoice::ALL
            .iter()
            .flat_map(|a| RpsChoice::ALL.iter().map(move |b| resolve_choices(*a, *b)))
            .filter(|r| r.is_tie())
            .count();
        assert_eq!(ties, 3);
    }

    #[test]
    fn test_dice_rolls() {
        let result = resolve_rolls(5, 2);
        assert_eq!(result.winner(), Some(Side::A));
        assert_eq!(result.side(Side::A).score_delta, 10);

        let result = resolve_rolls(1, 6);
        assert_eq!(result.winner(), Some(Side::B));
        assert_eq!(result.side(Side::B).score_delta, 10);
        assert_eq!(result.side(Side::A).display, MoveDisplay::Roll(1));

        let result = resolve_rolls(4, 4);
        assert!(result.is_tie());
        assert_eq!(result.side(Side::A).score_delta, 0);
        assert_eq!(result.side(Side::B).score_delta, 0);
    }

    #[test]
    fn test_dice_rule_rolls_in_range() {
        let mut rng = DeterministicRng::new(7);
        for _ in 0..200 {
            let result = DiceRule.resolve(Move::Ready, Move::Ready, &mut rng).unwrap();
            for side in Side::BOTH {
                match result.side(side).display {
                    MoveDisplay::Roll(face) => assert!((1..=6).contains(&face)),
                    other => panic!("unexpected display {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_rps_rule_rejects_ready_signal() {
        let mut rng = DeterministicRng::new(7);
        let result = RpsRule.resolve(Move::Ready, Move::Rps(RpsChoice::Rock), &mut rng);
        assert!(matches!(result, Err(ArenaError::InvalidMove { .. })));
    }

    #[test]
    fn test_rule_lookup() {
        for game_type in GameType::ALL {
            assert_eq!(rule_for(game_type).game_type(), game_type);
        }
    }

    #[test]
    fn test_move_display_wire_format() {
        assert_eq!(serde_json::to_string(&MoveDisplay::Roll(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&MoveDisplay::Choice(RpsChoice::Paper)).unwrap(),
            "\"paper\"",
        );
    }

    proptest! {
        #[test]
        fn prop_rps_is_antisymmetric(a in any_choice(), b in any_choice()) {
            let forward = resolve_choices(a, b);
            let reverse = resolve_choices(b, a);
            prop_assert_eq!(forward.side(Side::A).outcome, reverse.side(Side::B).outcome);
            prop_assert_eq!(forward.side(Side::B).outcome, reverse.side(Side::A).outcome);
            prop_assert_eq!(forward.is_tie(), a == b);
        }

        #[test]
        fn prop_only_winner_scores(a in any_choice(), b in any_choice()) {
            let result = resolve_choices(a, b);
            for side in Side::BOTH {
                let expected = if result.winner() == Some(side) { 15 } else { 0 };
                prop_assert_eq!(result.side(side).score_delta, expected);
            }
        }

        #[test]
        fn prop_dice_scores_track_wins(rolls in proptest::collection::vec((1u8..=6, 1u8..=6), 0..50)) {
            let mut scores = [0u32; 2];
            let mut wins = [0u32; 2];
            for (a, b) in rolls {
                let result = resolve_rolls(a, b);
                for side in Side::BOTH {
                    scores[side.index()] += result.side(side).score_delta;
                }
                if let Some(winner) = result.winner() {
                    wins[winner.index()] += 1;
                }
                prop_assert_eq!(result.is_tie(), a == b);
            }
            prop_assert_eq!(scores[0], 10 * wins[0]);
            prop_assert_eq!(scores[1], 10 * wins[1]);
        }
    }
}
