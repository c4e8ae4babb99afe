//! Leaderboard Aggregator
//!
//! Win/loss/score standings per connection. Entries are created at
//! registration and survive disconnects for the life of the process.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::arena::registry::ConnectionId;
use crate::LEADERBOARD_WIN_POINTS;

/// Standings for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Connection the entry belongs to.
    pub connection_id: ConnectionId,
    /// Display name at registration time.
    pub display_name: String,
    /// Rounds and forfeits won.
    pub wins: u32,
    /// Rounds and forfeits lost.
    pub losses: u32,
    /// Leaderboard score (fixed points per win).
    pub score: u32,
}

/// Standings table, kept in insertion order.
#[derive(Debug, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
    index: BTreeMap<ConnectionId, usize>,
}

impl Leaderboard {
    /// Create an empty leaderboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zeroed entry if none exists. Returns whether one was created.
    pub fn ensure_entry(&mut self, connection_id: ConnectionId, display_name: &str) -> bool {
        if self.index.contains_key(&connection_id) {
            return false;
        }
        self.index.insert(connection_id, self.entries.len());
        self.entries.push(LeaderboardEntry {
            connection_id,
            display_name: display_name.to_string(),
            wins: 0,
            losses: 0,
            score: 0,
        });
        true
    }

    /// Record a win or a loss.
    ///
    /// Unknown connections are ignored; returns whether an entry changed.
    pub fn record_outcome(&mut self, connection_id: &ConnectionId, won: bool) -> bool {
        let Some(entry) = self.index.get(connection_id).and_then(|i| self.entries.get_mut(*i)) else {
            return false;
        };

        if won {
            entry.wins += 1;
            entry.score += LEADERBOARD_WIN_POINTS;
        } else {
            entry.losses += 1;
        }
        true
    }

    /// Entry for one connection.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<&LeaderboardEntry> {
        self.index.get(connection_id).and_then(|i| self.entries.get(*i))
    }

    /// Top `n` entries by score, ties in insertion order.
    pub fn top_n(&self, n: usize) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&LeaderboardEntry> = self.entries.iter().collect();
        // Stable sort keeps insertion order among equal scores
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.into_iter().take(n).cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the leaderboard is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
