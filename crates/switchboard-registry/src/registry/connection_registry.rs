//! Connection Registry implementation.
//!
//! Tracks live connections by full identifier and indexes them by short id.

use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::connection::{Connection, ConnectionIdentifier};
use crate::error::{DeliveryError, RegistryError};
use crate::metrics;
use crate::types::ShortId;

/// What to do when a connection claims a short id another live connection
/// already owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The newcomer takes over the short id. Both stay members; when the
    /// newcomer leaves, the short id falls back to the previous claimant.
    #[default]
    LastWriteWins,
    /// Refuse the newcomer with [`RegistryError::DuplicateShortId`].
    Reject,
}

/// Registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Policy for short id collisions
    pub duplicate_short_id: DuplicatePolicy,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The connection was not a member before
    New,
    /// The connection was already a member; membership is unchanged
    Existing,
}

/// Summary of a broadcast fan-out.
///
/// `attempted` is the size of the membership snapshot; every member in it got
/// exactly one `send` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Registry of live connections.
///
/// Thread-safe; every operation takes `&self` and may be called from any
/// number of tasks at once. Uses DashMap for concurrent access without
/// caller-side locking.
///
/// ## Usage
///
/// ```ignore
/// let registry = Arc::new(ConnectionRegistry::new());
///
/// // When a connection is established:
/// let (conn, rx) = ChannelConnection::channel(ConnectionId::new(), 256);
/// registry.register(conn.clone())?;
///
/// // Targeting one connection:
/// let conn = registry.find_by_short_id("0e5fe0c8")?;
///
/// // Reaching everyone:
/// let report = registry.broadcast(message);
///
/// // When the connection closes:
/// registry.deregister(&conn);
/// ```
pub struct ConnectionRegistry<C: Connection> {
    /// Membership set keyed by full id
    members: DashMap<C::Id, C>,
    /// Short id to its claimants, in registration order
    index: DashMap<ShortId, Vec<C::Id>>,
    config: RegistryConfig,
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Create a new connection registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new connection registry.
    pub fn with_config(config: RegistryConfig) -> Self {
        info!(duplicate_short_id = ?config.duplicate_short_id, "Creating connection registry");
        Self {
            members: DashMap::new(),
            index: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a connection.
    ///
    /// Registering a connection that is already a member leaves membership
    /// untouched (the original handle is kept) and makes it the owner of its
    /// short id again.
    #[instrument(skip_all, fields(id = %connection.id()))]
    pub fn register(&self, connection: C) -> Result<Registration, RegistryError> {
        let id = connection.id().clone();
        let short_id = connection.short_id();

        let mut claimants = self.index.entry(short_id.clone()).or_default();

        if self.config.duplicate_short_id == DuplicatePolicy::Reject {
            if let Some(owner) = claimants.last() {
                if *owner != id {
                    warn!(short_id = %short_id, owner = %owner, "Short id already claimed, rejecting");
                    return Err(RegistryError::DuplicateShortId(short_id));
                }
            }
        }

        let registration = match self.members.entry(id.clone()) {
            Entry::Occupied(_) => Registration::Existing,
            Entry::Vacant(vacant) => {
                vacant.insert(connection);
                Registration::New
            }
        };

        claimants.retain(|claimant| *claimant != id);
        if !claimants.is_empty() {
            debug!(short_id = %short_id, previous = claimants.len(), "Short id taken over");
        }
        claimants.push(id);
        drop(claimants);

        match registration {
            Registration::New => debug!(short_id = %short_id, "Registered new connection"),
            Registration::Existing => debug!(short_id = %short_id, "Connection already registered"),
        }
        metrics::record_connection_count(self.members.len());

        Ok(registration)
    }

    /// Deregister a connection.
    ///
    /// Returns true if the connection was a member. Deregistering an absent
    /// connection is a no-op.
    pub fn deregister(&self, connection: &C) -> bool {
        self.deregister_id(connection.id())
    }

    /// Deregister a connection by full id.
    ///
    /// Only this id is dropped from its short id's claimants, so a late
    /// deregistration never evicts a newer connection sharing the short id.
    #[instrument(skip_all, fields(id = %id))]
    pub fn deregister_id(&self, id: &C::Id) -> bool {
        let removed = self.members.remove(id).is_some();

        let short_id = id.short_id();
        self.index.remove_if_mut(&short_id, |_, claimants| {
            claimants.retain(|claimant| claimant != id);
            claimants.is_empty()
        });

        if removed {
            debug!(short_id = %short_id, "Deregistered connection");
            metrics::record_connection_count(self.members.len());
        } else {
            debug!(short_id = %short_id, "Connection was not registered");
        }
        removed
    }

    /// Find a live connection by short id.
    ///
    /// Returns the most recent claimant that is still a member. Unknown or
    /// malformed short ids are reported as not found.
    pub fn find_by_short_id(&self, short_id: &str) -> Result<C, RegistryError> {
        let Ok(short_id) = ShortId::parse(short_id) else {
            return Err(RegistryError::not_found(short_id));
        };
        self.find(&short_id)
    }

    /// Find a live connection by an already parsed short id.
    pub fn find(&self, short_id: &ShortId) -> Result<C, RegistryError> {
        // Copy the claimants out so no index lock is held while reading members
        let claimants = match self.index.get(short_id) {
            Some(entry) => entry.value().clone(),
            None => return Err(RegistryError::not_found(short_id.as_str())),
        };

        claimants
            .iter()
            .rev()
            .find_map(|id| self.members.get(id).map(|entry| entry.value().clone()))
            .ok_or_else(|| RegistryError::not_found(short_id.as_str()))
    }

    /// Send a message to the connection owning a short id.
    #[instrument(skip(self, message))]
    pub fn send_to(&self, short_id: &str, message: C::Message) -> Result<(), RegistryError> {
        let connection = self.find_by_short_id(short_id)?;
        match connection.send(message) {
            Ok(()) => {
                debug!("Message queued for delivery");
                Ok(())
            }
            Err(e) => {
                match e {
                    DeliveryError::Full => warn!("Outbound queue full, applying backpressure"),
                    DeliveryError::Closed => debug!("Outbound queue closed, connection may have dropped"),
                }
                metrics::record_targeted_failure(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Send a message to every current member.
    ///
    /// Iterates a snapshot of membership taken at call time. A failed send to
    /// one member is logged and counted; the others are still attempted.
    /// Returns once every send has been handed to its connection.
    pub fn broadcast(&self, message: C::Message) -> BroadcastReport {
        let targets: Vec<C> = self
            .members
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = BroadcastReport {
            attempted: targets.len(),
            ..Default::default()
        };

        for connection in targets {
            match connection.send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Closed) => {
                    debug!(id = %connection.id(), "Skipping closed connection during broadcast");
                    report.failed += 1;
                }
                Err(DeliveryError::Full) => {
                    warn!(id = %connection.id(), "Outbound queue full, dropping broadcast message");
                    report.failed += 1;
                }
            }
        }

        debug!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Broadcast complete"
        );
        metrics::record_broadcast(report.attempted, report.failed);

        report
    }

    /// Alias of [`broadcast`](Self::broadcast) for text-speaking callers.
    pub fn broadcast_text(&self, message: impl Into<C::Message>) -> BroadcastReport {
        self.broadcast(message.into())
    }

    /// Check if a connection id is currently registered.
    pub fn is_registered(&self, id: &C::Id) -> bool {
        self.members.contains_key(id)
    }

    /// Get the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// List all registered connections as (short id, full id) pairs.
    ///
    /// Useful for debugging and monitoring.
    pub fn list_connections(&self) -> Vec<(ShortId, C::Id)> {
        self.members
            .iter()
            .map(|entry| (entry.key().short_id(), entry.key().clone()))
            .collect()
    }

    /// Deregister every member whose transport has gone away.
    ///
    /// Returns the number of connections removed.
    pub fn prune_closed(&self) -> usize {
        let stale: Vec<C::Id> = self
            .members
            .iter()
            .filter(|entry| !entry.value().is_open())
            .map(|entry| entry.key().clone())
            .collect();

        let removed = stale.iter().filter(|id| self.deregister_id(id)).count();

        if removed > 0 {
            info!(count = removed, "Pruned closed connections");
        }

        removed
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connection> fmt::Debug for ConnectionRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.members.len())
            .field("short_id_count", &self.index.len())
            .field("config", &self.config)
            .finish()
    }
}
