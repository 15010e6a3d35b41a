//! # Wire Envelope
//!
//! JSON envelope shared by both directions:
//! `{"type": "NewIsland", "island": ...}`, `{"type": "NewPost", "post": ...}`
//! and `{"type": "Clear"}`. The server never sends `Clear`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{RelayError, RelayResult};
use super::item::{Item, ItemKind};

/// Envelope as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// A new island
    NewIsland {
        #[serde(default)]
        island: Value,
    },

    /// A new post
    NewPost {
        #[serde(default)]
        post: Value,
    },

    /// Reset both histories
    Clear,
}

impl From<Item> for Envelope {
    fn from(item: Item) -> Self {
        match item.kind {
            ItemKind::Island => Envelope::NewIsland { island: item.body },
            ItemKind::Post => Envelope::NewPost { post: item.body },
        }
    }
}

/// A decoded inbound message, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Publish an item to its kind
    Publish(Item),
    /// Truncate both histories
    Clear,
    /// Valid JSON without a recognised `type`
    Ignored { tag: Option<String> },
}

/// Decode an inbound text frame.
///
/// Only text that is not JSON at all is an error. Any JSON document without
/// a known `type` tag decodes to [`Inbound::Ignored`].
pub fn decode(text: &str) -> RelayResult<Inbound> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| RelayError::InvalidMessage(e.to_string()))?;

    match Envelope::deserialize(&value) {
        Ok(Envelope::NewIsland { island }) => Ok(Inbound::Publish(Item::island(island))),
        Ok(Envelope::NewPost { post }) => Ok(Inbound::Publish(Item::post(post))),
        Ok(Envelope::Clear) => Ok(Inbound::Clear),
        Err(_) => Ok(Inbound::Ignored {
            tag: value
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
    }
}

/// Encode an item as an outbound text frame
pub fn encode(item: &Item) -> RelayResult<String> {
    serde_json::to_string(&Envelope::from(item.clone()))
        .map_err(|e| RelayError::Internal(format!("Failed to serialize item: {}", e)))
}
