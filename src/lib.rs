//! islandrelay - real-time broadcast relay for islands and posts
//!
//! Clients connect over WebSocket, receive the full island and post history,
//! then receive every item any client sends afterwards.

pub mod cli;
pub mod observability;
pub mod relay;
