//! # Relay
//!
//! Real-time broadcast relay for islands and posts.
//!
//! ## Architecture
//!
//! - **History**: per-kind append-only item record
//! - **Hub**: per-kind subscriber registry with explicit tokens
//! - **State**: history + hub under one lock (replay, publish, clear, leave)
//! - **Connection**: per-client lifecycle and message dispatch
//! - **Server**: WebSocket network layer
//!
//! Delivery is best-effort: replay then live, never duplicated, no retries.

pub mod connection;
pub mod errors;
pub mod history;
pub mod hub;
pub mod item;
pub mod message;
pub mod server;
pub mod state;

pub use connection::{CloseReason, Connection, ConnectionState, Handled};
pub use errors::{RelayError, RelayResult};
pub use history::History;
pub use hub::{FanoutResult, Hub, SubscriptionToken};
pub use item::{Item, ItemKind};
pub use message::{decode, encode, Envelope, Inbound};
pub use server::{RelayConfig, RelayServer, ShutdownHandle, DEFAULT_BIND_ADDR};
pub use state::{Joined, RelayState};
