//! # Relay Items
//!
//! The two kinds of content passed through the relay.

use serde_json::Value;

/// Kind of relayed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// An island
    Island,
    /// A post
    Post,
}

impl ItemKind {
    /// All kinds, in replay order
    pub const ALL: [ItemKind; 2] = [ItemKind::Island, ItemKind::Post];

    /// Dense index for per-kind tables
    pub(crate) fn index(self) -> usize {
        match self {
            ItemKind::Island => 0,
            ItemKind::Post => 1,
        }
    }

    /// Envelope `type` tag for this kind
    pub fn tag(self) -> &'static str {
        match self {
            ItemKind::Island => "NewIsland",
            ItemKind::Post => "NewPost",
        }
    }

    /// Envelope field carrying the body
    pub fn field(self) -> &'static str {
        match self {
            ItemKind::Island => "island",
            ItemKind::Post => "post",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Island => write!(f, "island"),
            ItemKind::Post => write!(f, "post"),
        }
    }
}

/// One unit of relayed content. The body is never inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Item kind
    pub kind: ItemKind,
    /// Application-defined payload
    pub body: Value,
}

impl Item {
    /// Create an island item
    pub fn island(body: Value) -> Self {
        Self {
            kind: ItemKind::Island,
            body,
        }
    }

    /// Create a post item
    pub fn post(body: Value) -> Self {
        Self {
            kind: ItemKind::Post,
            body,
        }
    }
}
