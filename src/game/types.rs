//! Game Definitions
//!
//! The closed set of supported games and the moves each one accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::ArenaError;
use crate::{DICE_WIN_POINTS, RPS_WIN_POINTS};

// =============================================================================
// GAME TYPE
// =============================================================================

/// Supported game types.
///
/// Implements Ord so queues can live in a BTreeMap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Dice duel: both sides roll, higher roll wins.
    Dice,
    /// Rock-paper-scissors.
    Rps,
}

impl GameType {
    /// Every supported game, in queue order.
    pub const ALL: [GameType; 2] = [GameType::Dice, GameType::Rps];

    /// Wire name of the game.
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::Dice => "dice",
            GameType::Rps => "rps",
        }
    }

    /// Session points awarded to the winner of a round.
    pub fn win_points(self) -> u32 {
        match self {
            GameType::Dice => DICE_WIN_POINTS,
            GameType::Rps => RPS_WIN_POINTS,
        }
    }

    /// Parse a raw move submission for this game.
    ///
    /// Dice accepts anything: the submission is only a ready signal.
    pub fn parse_move(self, raw: &str) -> Result<Move, ArenaError> {
        match self {
            GameType::Dice => Ok(Move::Ready),
            GameType::Rps => raw
                .parse::<RpsChoice>()
                .map(Move::Rps)
                .map_err(|_| ArenaError::InvalidMove {
                    game_type: self,
                    value: raw.to_string(),
                }),
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dice" => Ok(GameType::Dice),
            "rps" => Ok(GameType::Rps),
            _ => Err(ArenaError::InvalidGameType(s.to_string())),
        }
    }
}

// =============================================================================
// MOVES
// =============================================================================

/// Rock-paper-scissors choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpsChoice {
    /// Beats scissors.
    Rock,
    /// Beats rock.
    Paper,
    /// Beats paper.
    Scissors,
}

impl RpsChoice {
    /// All three choices.
    pub const ALL: [RpsChoice; 3] = [RpsChoice::Rock, RpsChoice::Paper, RpsChoice::Scissors];

    /// Whether this choice beats `other`.
    #[inline]
    pub fn beats(self, other: RpsChoice) -> bool {
        matches!(
            (self, other),
            (RpsChoice::Rock, RpsChoice::Scissors)
                | (RpsChoice::Scissors, RpsChoice::Paper)
                | (RpsChoice::Paper, RpsChoice::Rock)
        )
    }
}

impl FromStr for RpsChoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Ok(RpsChoice::Rock),
            "paper" => Ok(RpsChoice::Paper),
            "scissors" => Ok(RpsChoice::Scissors),
            _ => Err(()),
        }
    }
}

/// A validated move, pending until the round resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    /// Dice ready signal.
    Ready,
    /// Rock-paper-scissors choice.
    Rps(RpsChoice),
}

// =============================================================================
// SIDES
// =============================================================================

/// One of the two seats in a session.
///
/// Order only reflects who queued first; it never reaches the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// First seat.
    A,
    /// Second seat.
    B,
}

impl Side {
    /// Both sides, A first.
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// The opposing side.
    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Index into a two-element side array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_parse() {
        assert_eq!("dice".parse::<GameType>(), Ok(GameType::Dice));
        assert_eq!(" RPS ".parse::<GameType>(), Ok(GameType::Rps));
        assert_eq!(
            "chess".parse::<GameType>(),
            Err(ArenaError::InvalidGameType("chess".into())),
        );
    }

    #[test]
    fn test_game_type_wire_name() {
        for game_type in GameType::ALL {
            let json = serde_json::to_string(&game_type).unwrap();
            assert_eq!(json, format!("\"{}\"", game_type.as_str()));
            assert_eq!(game_type.as_str().parse::<GameType>(), Ok(game_type));
        }
    }

    #[test]
    fn test_dice_accepts_any_move() {
        assert_eq!(GameType::Dice.parse_move("roll"), Ok(Move::Ready));
        assert_eq!(GameType::Dice.parse_move(""), Ok(Move::Ready));
    }

    #[test]
    fn test_rps_move_validation() {
        assert_eq!(GameType::Rps.parse_move("rock"), Ok(Move::Rps(RpsChoice::Rock)));
        assert_eq!(GameType::Rps.parse_move("Paper"), Ok(Move::Rps(RpsChoice::Paper)));
        assert!(matches!(
            GameType::Rps.parse_move("lizard"),
            Err(ArenaError::InvalidMove { game_type: GameType::Rps, .. })
        ));
    }

    #[test]
    fn test_rps_dominance_cycle() {
        assert!(RpsChoice::Rock.beats(RpsChoice::Scissors));
        assert!(RpsChoice::Scissors.beats(RpsChoice::Paper));
        assert!(RpsChoice::Paper.beats(RpsChoice::Rock));
        for choice in RpsChoice::ALL {
            assert!(!choice.beats(choice));
        }
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::A.other(), Side::B);
        assert_eq!(Side::B.other(), Side::A);
        assert_eq!(Side::B.index(), 1);
    }
}
