//! Connection identifiers and the session state mutated by handlers.
//!
//! The session store is owned by the host; the dispatcher only relies on the
//! field-level contract of [`SessionStore`]. Handlers for one outer frame may
//! run concurrently, so every field is guarded on its own rather than behind
//! a single session-wide lock.

use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;

/// Identifier assigned to a captured connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Identity of the player bound to the captured connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerIdentity {
    /// Server-assigned player id.
    pub player_id: u64,
    /// Display name.
    pub name: String,
}

/// A target known to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownTarget {
    /// Server-assigned target id.
    pub target_id: u64,
    /// Target category as reported by the server.
    pub kind: u16,
}

/// Field-level contract of the session state handlers read and mutate.
///
/// Implementations must make each operation atomic with respect to its own
/// field. No ordering is promised between different fields.
pub trait SessionStore: Send + Sync + 'static {
    /// Player currently bound to the session, if identified.
    fn player(&self) -> Option<PlayerIdentity>;

    /// Bind the session to `player`, replacing any previous identity.
    fn set_player(&self, player: PlayerIdentity);

    /// Connection the session was last identified on.
    fn connection(&self) -> Option<ConnectionId>;

    /// Record the connection the session was identified on.
    fn set_connection(&self, connection: ConnectionId);

    /// Add or refresh a known target. Returns `true` if it was not known.
    fn insert_target(&self, target: KnownTarget) -> bool;

    /// Forget a target. Returns `true` if it was known.
    fn remove_target(&self, target_id: u64) -> bool;

    /// Ids of all currently known targets, in no particular order.
    fn known_targets(&self) -> Vec<u64>;
}

/// In-memory [`SessionStore`] with per-field locking.
#[derive(Debug, Default)]
pub struct InMemorySession {
    player: RwLock<Option<PlayerIdentity>>,
    connection: RwLock<Option<ConnectionId>>,
    targets: DashMap<u64, KnownTarget>,
}

impl InMemorySession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Look up a single known target.
    #[must_use]
    pub fn target(&self, target_id: u64) -> Option<KnownTarget> {
        self.targets.get(&target_id).map(|entry| *entry.value())
    }
}

impl SessionStore for InMemorySession {
    fn player(&self) -> Option<PlayerIdentity> {
        self.player
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_player(&self, player: PlayerIdentity) {
        *self.player.write().unwrap_or_else(PoisonError::into_inner) = Some(player);
    }

    fn connection(&self) -> Option<ConnectionId> {
        *self.connection.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_connection(&self, connection: ConnectionId) {
        *self.connection.write().unwrap_or_else(PoisonError::into_inner) = Some(connection);
    }

    fn insert_target(&self, target: KnownTarget) -> bool {
        self.targets.insert(target.target_id, target).is_none()
    }

    fn remove_target(&self, target_id: u64) -> bool { self.targets.remove(&target_id).is_some() }

    fn known_targets(&self) -> Vec<u64> { self.targets.iter().map(|entry| *entry.key()).collect() }
}
