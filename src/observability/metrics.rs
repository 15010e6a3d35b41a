//! Relay counters
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Relaxed atomics; exact totals, no cross-counter consistency

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the relay
#[derive(Debug, Default)]
pub struct RelayMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    items_published: AtomicU64,
    /// Items placed on a subscriber queue
    deliveries: AtomicU64,
    /// Items dropped because the subscriber was already gone
    failed_deliveries: AtomicU64,
    clears: AtomicU64,
    malformed_messages: AtomicU64,
    ignored_messages: AtomicU64,
}

impl RelayMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_connections_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_connections_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_items_published(&self) {
        self.items_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_failed_deliveries(&self, count: u64) {
        self.failed_deliveries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_clears(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed(&self) {
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ignored(&self) {
        self.ignored_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Connections opened but not yet closed
    pub fn open_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            items_published: self.items_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            ignored_messages: self.ignored_messages.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub items_published: u64,
    pub deliveries: u64,
    pub failed_deliveries: u64,
    pub clears: u64,
    pub malformed_messages: u64,
    pub ignored_messages: u64,
}

impl MetricsSnapshot {
    /// Render as a single JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = RelayMetrics::new().snapshot();
        assert_eq!(snapshot.connections_opened, 0);
        assert_eq!(snapshot.items_published, 0);
        assert_eq!(snapshot.malformed_messages, 0);
    }

    #[test]
    fn test_open_connections() {
        let metrics = RelayMetrics::new();
        metrics.increment_connections_opened();
        metrics.increment_connections_opened();
        metrics.increment_connections_closed();
        assert_eq!(metrics.open_connections(), 1);
    }

    #[test]
    fn test_delivery_counters() {
        let metrics = RelayMetrics::new();
        metrics.add_deliveries(3);
        metrics.add_deliveries(2);
        metrics.add_failed_deliveries(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.deliveries, 5);
        assert_eq!(snapshot.failed_deliveries, 1);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = RelayMetrics::new();
        metrics.increment_clears();

        let parsed: serde_json::Value =
            serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(parsed["clears"], 1);
        assert_eq!(parsed["deliveries"], 0);
    }
}
