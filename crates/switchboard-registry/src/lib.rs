//! # switchboard-registry
//!
//! Concurrent registry of live network connections for Switchboard.
//!
//! The registry tracks which connections are currently established, indexes
//! them by a compact short identifier, and fans a message out to every member.
//! It does no framing or protocol work of its own: the transport layer hands
//! it [`Connection`] handles and the registry only calls their `send`.
//!
//! ## Architecture
//!
//! ```text
//! transport accept ──register──▶ ┌──────────────────────┐ ◀──find_by_short_id── API handlers
//!                                │  ConnectionRegistry   │
//! transport close ─deregister──▶ │  members: Id -> C     │ ──broadcast──▶ C::send (per member)
//!                                │  index: ShortId -> Id │
//!                                └──────────────────────┘
//! ```
//!
//! The registry is an ordinary value: construct one, wrap it in an `Arc` and
//! hand it to whatever needs it.

pub mod connection;
pub mod metrics;
pub mod registry;

mod error;
mod types;

pub use connection::{ChannelConnection, Connection, ConnectionIdentifier};
pub use error::{DeliveryError, RegistryError};
pub use registry::{
    BroadcastReport, ConnectionRegistry, DuplicatePolicy, Registration, RegistryConfig,
};
pub use types::*;
