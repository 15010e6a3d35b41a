//! # Relay State
//!
//! History and hub behind a single lock.
//!
//! ## Invariant: no duplicate delivery
//! `join` (replay + subscribe) and `publish` (emit + append) run under the
//! same mutex, and `publish` emits before it appends. A connection joining
//! concurrently with a publish therefore sees the item exactly once: in its
//! replay if the publish ran first, live if the join ran first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::history::History;
use super::hub::{FanoutResult, Hub, ItemSender, SubscriptionToken};
use super::item::{Item, ItemKind};
use crate::observability::RelayMetrics;

#[derive(Debug, Default)]
struct Inner {
    history: History,
    hub: Hub,
}

/// Outcome of a connection joining the relay
#[derive(Debug)]
pub struct Joined {
    /// Number of history items queued for replay
    pub replayed: usize,
    /// One token per item kind
    pub tokens: Vec<SubscriptionToken>,
}

/// Process-wide relay state, shared by `Arc` with every connection
#[derive(Debug, Default)]
pub struct RelayState {
    inner: Mutex<Inner>,
    metrics: RelayMetrics,
}

impl RelayState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded data has no cross-field invariant a panic could break
    // halfway, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the full history onto `sender`, then subscribe it to every kind.
    ///
    /// Islands are queued before posts, each in insertion order.
    pub fn join(&self, sender: ItemSender) -> Joined {
        let mut inner = self.lock();

        let mut replayed = 0;
        for item in inner.history.replay() {
            if sender.send(Arc::clone(item)).is_err() {
                break;
            }
            replayed += 1;
        }

        let tokens = ItemKind::ALL
            .into_iter()
            .map(|kind| inner.hub.subscribe(kind, sender.clone()))
            .collect();

        Joined { replayed, tokens }
    }

    /// Emit an item to every subscriber of its kind, then record it
    pub fn publish(&self, item: Item) -> FanoutResult {
        let item = Arc::new(item);
        let result = {
            let mut inner = self.lock();
            let result = inner.hub.emit(&item);
            inner.history.append(item);
            result
        };

        self.metrics.increment_items_published();
        self.metrics.add_deliveries(result.delivered as u64);
        self.metrics.add_failed_deliveries(result.failed as u64);
        result
    }

    /// Truncate both histories. Returns the number of items dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut inner = self.lock();
            let dropped = inner.history.total_len();
            inner.history.clear();
            dropped
        };

        self.metrics.increment_clears();
        dropped
    }

    /// Remove subscriptions. Unknown tokens are ignored.
    ///
    /// Returns the number of subscriptions actually removed.
    pub fn leave(&self, tokens: &[SubscriptionToken]) -> usize {
        let mut inner = self.lock();
        tokens
            .iter()
            .filter(|token| inner.hub.unsubscribe(**token))
            .count()
    }

    /// Number of history items of one kind
    pub fn history_len(&self, kind: ItemKind) -> usize {
        self.lock().history.len(kind)
    }

    /// Number of subscribers of one kind
    pub fn subscriber_count(&self, kind: ItemKind) -> usize {
        self.lock().hub.subscriber_count(kind)
    }

    /// Relay counters
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Arc<Item>>) -> Vec<Item> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push((*item).clone());
        }
        items
    }

    #[test]
    fn test_join_replays_history_in_order() {
        let state = RelayState::new();
        state.publish(Item::post(json!("P1")));
        state.publish(Item::island(json!("I1")));
        state.publish(Item::post(json!("P2")));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let joined = state.join(tx);

        assert_eq!(joined.replayed, 3);
        assert_eq!(joined.tokens.len(), 2);
        assert_eq!(
            drain(&mut rx),
            vec![
                Item::island(json!("I1")),
                Item::post(json!("P1")),
                Item::post(json!("P2")),
            ]
        );
    }

    #[test]
    fn test_publish_reaches_sender_and_others() {
        let state = RelayState::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        state.join(tx_a);
        state.join(tx_b);

        let result = state.publish(Item::post(json!("P1")));
        assert_eq!(result.delivered, 2);

        assert_eq!(drain(&mut rx_a), vec![Item::post(json!("P1"))]);
        assert_eq!(drain(&mut rx_b), vec![Item::post(json!("P1"))]);
    }

    #[test]
    fn test_replay_then_live_without_duplicates() {
        let state = RelayState::new();
        state.publish(Item::island(json!("I1")));

        let (tx, mut rx) = mpsc::unbounded_channel();
        state.join(tx);
        state.publish(Item::island(json!("I2")));

        assert_eq!(
            drain(&mut rx),
            vec![Item::island(json!("I1")), Item::island(json!("I2"))]
        );
    }

    #[test]
    fn test_concurrent_join_and_publish_never_duplicates() {
        let state = Arc::new(RelayState::new());
        let publisher = {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for i in 0..200 {
                    state.publish(Item::post(json!(i)));
                }
            })
        };

        let mut receivers = Vec::new();
        for _ in 0..20 {
            let (tx, rx) = mpsc::unbounded_channel();
            state.join(tx);
            receivers.push(rx);
        }
        publisher.join().unwrap();

        for mut rx in receivers {
            let bodies: Vec<_> = drain(&mut rx).into_iter().map(|item| item.body).collect();
            let expected: Vec<_> = (0..200).map(|i| json!(i)).collect();
            assert_eq!(bodies, expected);
        }
    }

    #[test]
    fn test_clear_only_affects_future_joins() {
        let state = RelayState::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        state.join(tx_a);
        state.publish(Item::island(json!("I1")));
        state.publish(Item::post(json!("P1")));

        assert_eq!(state.clear(), 2);
        assert_eq!(state.history_len(ItemKind::Island), 0);
        assert_eq!(state.history_len(ItemKind::Post), 0);

        // Already delivered data stays delivered, and nothing new is emitted
        assert_eq!(drain(&mut rx_a).len(), 2);

        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        let joined = state.join(tx_c);
        assert_eq!(joined.replayed, 0);
        assert!(drain(&mut rx_c).is_empty());
    }

    #[test]
    fn test_leave_is_idempotent() {
        let state = RelayState::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let joined = state.join(tx_a);
        state.join(tx_b);

        assert_eq!(state.leave(&joined.tokens), 2);
        assert_eq!(state.leave(&joined.tokens), 0);
        assert_eq!(state.subscriber_count(ItemKind::Post), 1);

        let result = state.publish(Item::post(json!("P1")));
        assert_eq!(result.matched, 1);
        assert_eq!(drain(&mut rx_b), vec![Item::post(json!("P1"))]);
    }

    #[test]
    fn test_metrics_track_publish_and_clear() {
        let state = RelayState::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        state.join(tx);

        state.publish(Item::island(json!("I1")));
        state.clear();

        let snapshot = state.metrics().snapshot();
        assert_eq!(snapshot.items_published, 1);
        assert_eq!(snapshot.deliveries, 1);
        assert_eq!(snapshot.clears, 1);
    }
}
