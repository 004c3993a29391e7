//! Identifier types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ConnectionIdentifier;
use crate::error::RegistryError;

/// Longest accepted short id.
pub const MAX_SHORT_ID_LEN: usize = 32;

/// Number of hex digits a [`ConnectionId`] contributes to its short id.
pub const CONNECTION_SHORT_ID_LEN: usize = 8;

/// Compact, human-displayable lookup key derived from a full connection id.
///
/// Always 1..=32 ASCII alphanumeric characters, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortId(String);

impl ShortId {
    /// Parse and normalise a short id.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.len() > MAX_SHORT_ID_LEN
            || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(RegistryError::invalid_short_id(raw));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShortId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShortId {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShortId> for String {
    fn from(id: ShortId) -> Self {
        id.0
    }
}

impl AsRef<str> for ShortId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Globally unique identifier assigned to a connection when it is established.
///
/// A random v4 UUID. The short id is the random tail of its hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl ConnectionIdentifier for ConnectionId {
    fn short_id(&self) -> ShortId {
        let simple = self.0.simple().to_string();
        // 32 lowercase hex digits, always valid
        ShortId(simple[simple.len() - CONNECTION_SHORT_ID_LEN..].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_normalises_case() {
        let id = ShortId::parse(" A1 ").unwrap();
        assert_eq!(id.as_str(), "a1");
    }

    #[test]
    fn test_short_id_rejects_garbage() {
        assert!(ShortId::parse("").is_err());
        assert!(ShortId::parse("a-1").is_err());
        assert!(ShortId::parse(&"a".repeat(MAX_SHORT_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_connection_short_id_is_uuid_tail() {
        let uuid = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let id = ConnectionId::from_uuid(uuid);
        assert_eq!(id.short_id().as_str(), "0e5fe0c8");
    }

    #[test]
    fn test_connection_short_id_is_deterministic() {
        let id = ConnectionId::new();
        assert_eq!(id.short_id(), id.short_id());
        assert_eq!(id.short_id().as_str().len(), CONNECTION_SHORT_ID_LEN);
    }

    #[test]
    fn test_short_id_serde() {
        let id: ShortId = serde_json::from_str("\"AbC\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(serde_json::from_str::<ShortId>("\"a b\"").is_err());
    }
}
