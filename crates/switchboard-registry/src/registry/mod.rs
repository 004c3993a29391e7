//! Connection Registry for membership tracking and broadcast.
//!
//! This module provides a thread-safe registry of live connections. Each
//! connection is registered by the transport when it is established and
//! deregistered when it closes. Application code can then reach one
//! connection by its short id or all of them at once.
//!
//! ## Architecture
//!
//! ```text
//!   ConnectionRegistry
//!   ├── members: DashMap<Id, C>               membership set
//!   └── index:   DashMap<ShortId, Vec<Id>>    claimants per short id, last one owns it
//! ```
//!
//! Registration takes the index entry before touching membership, so
//! registrations that collide on a short id are serialised. Deregistration
//! removes membership first; lookups treat an indexed id that is no longer a
//! member as absent, so a removed handle is never handed out.

mod connection_registry;

pub use connection_registry::{
    BroadcastReport, ConnectionRegistry, DuplicatePolicy, Registration, RegistryConfig,
};
