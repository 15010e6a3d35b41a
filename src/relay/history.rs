//! # Item History
//!
//! Ordered, append-only record of every item accepted since the last clear,
//! one sequence per kind. Lives in memory for the lifetime of the process.

use std::sync::Arc;

use super::item::{Item, ItemKind};

/// Per-kind item history
#[derive(Debug, Default)]
pub struct History {
    /// Items indexed by `ItemKind::index`
    items: [Vec<Arc<Item>>; 2],
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item to its kind's history
    pub fn append(&mut self, item: Arc<Item>) {
        self.items[item.kind.index()].push(item);
    }

    /// Items of one kind, in insertion order
    pub fn items(&self, kind: ItemKind) -> &[Arc<Item>] {
        &self.items[kind.index()]
    }

    /// Every item in replay order: all islands, then all posts
    pub fn replay(&self) -> impl Iterator<Item = &Arc<Item>> {
        ItemKind::ALL
            .into_iter()
            .flat_map(move |kind| self.items(kind).iter())
    }

    /// Truncate both kinds
    pub fn clear(&mut self) {
        for items in &mut self.items {
            items.clear();
        }
    }

    /// Number of items of one kind
    pub fn len(&self, kind: ItemKind) -> usize {
        self.items[kind.index()].len()
    }

    /// Total number of items across kinds
    pub fn total_len(&self) -> usize {
        self.items.iter().map(Vec::len).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}
