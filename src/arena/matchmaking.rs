//! Matchmaking Queues
//!
//! One FIFO per game type. The two oldest entries are paired as soon as a
//! queue holds two; there is no rating or preference matching.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::arena::registry::ConnectionId;
use crate::error::ArenaError;
use crate::game::types::GameType;

/// Matchmaking queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    connection_id: ConnectionId,
    queued_at: DateTime<Utc>,
}

/// Per-game FIFO waiting lists.
#[derive(Debug)]
pub struct MatchmakingQueues {
    queues: BTreeMap<GameType, VecDeque<QueueEntry>>,
}

impl Default for MatchmakingQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchmakingQueues {
    /// Create empty queues for every game type.
    pub fn new() -> Self {
        Self {
            queues: GameType::ALL
                .into_iter()
                .map(|game_type| (game_type, VecDeque::new()))
                .collect(),
        }
    }

    fn queue_mut(&mut self, game_type: GameType) -> &mut VecDeque<QueueEntry> {
        self.queues.entry(game_type).or_default()
    }

    /// Append a connection to a game's queue.
    ///
    /// Returns the 1-based position.
    pub fn enqueue(
        &mut self,
        connection_id: ConnectionId,
        game_type: GameType,
        queued_at: DateTime<Utc>,
    ) -> Result<usize, ArenaError> {
        let queue = self.queue_mut(game_type);

        if queue.iter().any(|e| e.connection_id == connection_id) {
            return Err(ArenaError::AlreadyQueued(game_type));
        }

        queue.push_back(QueueEntry { connection_id, queued_at });
        Ok(queue.len())
    }

    /// Pop the two oldest entries if at least two are waiting.
    pub fn dequeue_pair_if_ready(&mut self, game_type: GameType) -> Option<(ConnectionId, ConnectionId)> {
        let queue = self.queue_mut(game_type);
        if queue.len() < 2 {
            return None;
        }

        let first = queue.pop_front()?;
        let second = queue.pop_front()?;
        Some((first.connection_id, second.connection_id))
    }

    /// Remove a connection from one queue. Returns whether it was queued.
    pub fn leave(&mut self, connection_id: &ConnectionId, game_type: GameType) -> bool {
        let queue = self.queue_mut(game_type);
        let before = queue.len();
        queue.retain(|e| e.connection_id != *connection_id);
        queue.len() != before
    }

    /// Remove a connection from every queue.
    ///
    /// Returns the game types it was removed from.
    pub fn purge_all(&mut self, connection_id: &ConnectionId) -> Vec<GameType> {
        GameType::ALL
            .into_iter()
            .filter(|game_type| self.leave(connection_id, *game_type))
            .collect()
    }

    /// Remove and return entries queued before `cutoff`.
    pub fn expire(&mut self, cutoff: DateTime<Utc>) -> Vec<(ConnectionId, GameType)> {
        let mut expired = Vec::new();
        for (game_type, queue) in self.queues.iter_mut() {
            queue.retain(|e| {
                if e.queued_at < cutoff {
                    expired.push((e.connection_id, *game_type));
                    false
                } else {
                    true
                }
            });
        }
        expired
    }

    /// Whether a connection waits in a game's queue.
    pub fn is_queued(&self, connection_id: &ConnectionId, game_type: GameType) -> bool {
        self.queues
            .get(&game_type)
            .is_some_and(|q| q.iter().any(|e| e.connection_id == *connection_id))
    }

    /// Number of connections waiting for a game.
    pub fn depth(&self, game_type: GameType) -> usize {
        self.queues.get(&game_type).map_or(0, VecDeque::len)
    }

    /// Queue depth for every game type.
    pub fn depths(&self) -> BTreeMap<GameType, usize> {
        GameType::ALL
            .into_iter()
            .map(|game_type| (game_type, self.depth(game_type)))
            .collect()
    }
}
