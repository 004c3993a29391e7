//! Error types for the connection registry.

use thiserror::Error;

use crate::types::ShortId;

/// Failure to hand a message to a single connection.
///
/// During a broadcast these are logged and counted, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection's outbound queue is gone (peer disconnected)
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue is full (slow consumer)
    #[error("outbound queue full")]
    Full,
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No live connection is registered under the short id
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// The short id is empty or malformed
    #[error("Invalid short id: {0}")]
    InvalidShortId(String),

    /// Another live connection already owns the short id
    #[error("Short id already registered: {0}")]
    DuplicateShortId(ShortId),

    /// Targeted delivery failed
    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl RegistryError {
    /// Create a new not-found error.
    pub fn not_found(short_id: impl Into<String>) -> Self {
        Self::NotFound(short_id.into())
    }

    /// Create a new invalid short id error.
    pub fn invalid_short_id(short_id: impl Into<String>) -> Self {
        Self::InvalidShortId(short_id.into())
    }

    /// Whether this error means "no such connection".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
