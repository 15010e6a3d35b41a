//! # Broadcast Hub
//!
//! Fan-out registry from item kind to subscribed connections.
//!
//! Subscribing returns a [`SubscriptionToken`]; the same token is the only
//! way to remove that subscription, so one connection can never remove
//! another's. Sends are non-blocking: each subscriber owns an unbounded
//! queue drained by its own connection task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::item::{Item, ItemKind};

/// Outbound queue sender for one connection
pub type ItemSender = mpsc::UnboundedSender<Arc<Item>>;

/// Outbound queue receiver for one connection
pub type ItemReceiver = mpsc::UnboundedReceiver<Arc<Item>>;

/// Handle identifying exactly one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    kind: ItemKind,
    id: u64,
}


/// Per-kind subscriber registry
#[derive(Debug, Default)]
pub struct Hub {
    /// Subscribers indexed by `ItemKind::index`, then by token id
    subscribers: [HashMap<u64, ItemSender>; 2],
    next_id: u64,
}

impl Hub {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a sender to one kind
    pub fn subscribe(&mut self, kind: ItemKind, sender: ItemSender) -> SubscriptionToken {
        self.next_id += 1;
        let token = SubscriptionToken {
            kind,
            id: self.next_id,
        };

        self.subscribers[kind.index()].insert(token.id, sender);

        token
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.subscribers[token.kind.index()]
            .remove(&token.id)
            .is_some()
    }

    /// Send an item to every subscriber of its kind
    pub fn emit(&self, item: &Arc<Item>) -> FanoutResult {
        let mut result = FanoutResult::default();

        for sender in self.subscribers[item.kind.index()].values() {
            result.matched += 1;
            match sender.send(Arc::clone(item)) {
                Ok(()) => result.delivered += 1,
                Err(_) => result.failed += 1,
            }
        }

        result
    }

    /// Number of subscribers of one kind
    pub fn subscriber_count(&self, kind: ItemKind) -> usize {
        self.subscribers[kind.index()].len()
    }
}

/// Result of emitting one item
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanoutResult {
    /// Number of subscribers of the item's kind
    pub matched: usize,
    /// Number of queues the item was placed on
    pub delivered: usize,
    /// Number of queues whose receiver was already dropped
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_unsubscribe() {
        let mut hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let island = hub.subscribe(ItemKind::Island, tx.clone());
        let post = hub.subscribe(ItemKind::Post, tx);
        assert_eq!(hub.subscriber_count(ItemKind::Island), 1);
        assert_eq!(hub.subscriber_count(ItemKind::Post), 1);

        assert!(hub.unsubscribe(island));
        assert_eq!(hub.subscriber_count(ItemKind::Island), 0);
        assert_eq!(hub.subscriber_count(ItemKind::Post), 1);

        assert!(hub.unsubscribe(post));
        assert_eq!(hub.subscriber_count(ItemKind::Post), 0);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let mut hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let token = hub.subscribe(ItemKind::Post, tx);
        assert!(hub.unsubscribe(token));
        assert!(!hub.unsubscribe(token));
    }

    #[tokio::test]
    async fn test_unsubscribe_only_removes_own_token() {
        let mut hub = Hub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let first = hub.subscribe(ItemKind::Post, tx1);
        hub.subscribe(ItemKind::Post, tx2);

        hub.unsubscribe(first);
        let result = hub.emit(&Arc::new(Item::post(json!("P1"))));
        assert_eq!(result.delivered, 1);
        assert_eq!(rx2.recv().await.unwrap().body, json!("P1"));
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_emit_to_kind_subscribers_only() {
        let mut hub = Hub::new();
        let (island_tx, mut island_rx) = mpsc::unbounded_channel();
        let (post_tx, mut post_rx) = mpsc::unbounded_channel();

        hub.subscribe(ItemKind::Island, island_tx);
        hub.subscribe(ItemKind::Post, post_tx);

        let result = hub.emit(&Arc::new(Item::post(json!("P1"))));
        assert_eq!(result.matched, 1);
        assert_eq!(result.delivered, 1);

        let received = post_rx.recv().await.unwrap();
        assert_eq!(received.body, json!("P1"));
        assert!(island_rx.try_recv().is_err());
    }

    #[test]
    fn test_emit_to_dropped_receiver_counts_failure() {
        let mut hub = Hub::new();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.subscribe(ItemKind::Island, tx);
        drop(rx);

        let result = hub.emit(&Arc::new(Item::island(json!("I1"))));
        assert_eq!(result.matched, 1);
        assert_eq!(result.delivered, 0);
        assert_eq!(result.failed, 1);
    }
}
