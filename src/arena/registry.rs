//! Identity Registry
//!
//! Maps each live connection to its player record. Records exist from
//! registration until disconnect; nothing here outlives the connection.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::arena::session::SessionId;

/// Longest accepted display name, in characters.
pub const MAX_NAME_LEN: usize = 24;

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Ephemeral per-connection identifier assigned by the transport.
///
/// Implements Ord for BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Allocate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a raw integer (tests and tooling).
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Name used when the player does not pick one.
    pub fn default_display_name(&self) -> String {
        let simple = self.0.simple().to_string();
        format!("Player_{}", &simple[simple.len() - 4..])
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// PLAYER RECORD
// =============================================================================

/// A registered player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Owning connection.
    pub connection_id: ConnectionId,
    /// Name shown to opponents and on the leaderboard.
    pub display_name: String,
    /// Session the player is currently playing in.
    pub session_id: Option<SessionId>,
}

/// Clean up a requested name, falling back to the generated default.
fn normalize_name(connection_id: ConnectionId, requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.chars().take(MAX_NAME_LEN).collect(),
        None => connection_id.default_display_name(),
    }
}

/// All registered players, keyed by connection.
#[derive(Debug, Default)]
pub struct Registry {
    players: BTreeMap<ConnectionId, PlayerRecord>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, or return its existing record unchanged.
    ///
    /// A name sent on re-registration is ignored.
    pub fn register(&mut self, connection_id: ConnectionId, requested_name: Option<&str>) -> &PlayerRecord {
        self.players.entry(connection_id).or_insert_with(|| PlayerRecord {
            connection_id,
            display_name: normalize_name(connection_id, requested_name),
            session_id: None,
        })
    }

    /// Look up a registered player.
    pub fn lookup(&self, connection_id: &ConnectionId) -> Option<&PlayerRecord> {
        self.players.get(connection_id)
    }

    /// Remove a player; returns the record if it existed.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<PlayerRecord> {
        self.players.remove(connection_id)
    }

    /// Point a player at the session they are now playing in.
    pub fn bind_session(&mut self, connection_id: &ConnectionId, session_id: SessionId) {
        if let Some(player) = self.players.get_mut(connection_id) {
            player.session_id = Some(session_id);
        }
    }

    /// Clear a player's session reference.
    pub fn clear_session(&mut self, connection_id: &ConnectionId) {
        if let Some(player) = self.players.get_mut(connection_id) {
            player.session_id = None;
        }
    }

    /// Session the player currently references, if any.
    pub fn session_of(&self, connection_id: &ConnectionId) -> Option<SessionId> {
        self.players.get(connection_id).and_then(|p| p.session_id)
    }

    /// Ids of every registered connection.
    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.keys().copied()
    }

    /// Number of registered players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players are registered.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
