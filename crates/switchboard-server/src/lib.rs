//! # switchboard-server
//!
//! Host process for the Switchboard connection registry.
//!
//! Accepts WebSocket connections on `/ws`, registers each one with a shared
//! [`ConnectionRegistry`](switchboard_registry::ConnectionRegistry) for the
//! lifetime of the socket, and exposes a small HTTP API to look connections up
//! by short id, message one of them, or broadcast to all.

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::{LogFormat, ServerConfig};
pub use server::{create_router, start, AppState, OutboundText, WsConnection};
