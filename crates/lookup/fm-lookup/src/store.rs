//! MapStore - the live lookup table shared by all workers.

use crate::MapTable;
use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::Arc;

/// The live map, published as immutable snapshots.
///
/// Readers load the current snapshot without locking. Writers build a new
/// table and swap the pointer, so a reader holding a snapshot sees either the
/// whole table before an update or the whole table after it.
#[derive(Debug)]
pub struct MapStore {
    table: ArcSwap<MapTable>,
}

impl MapStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::from_table(MapTable::new())
    }

    /// Creates a store holding `table`.
    pub fn from_table(table: MapTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }

    /// Unions `update` into the live table, overwriting on key collision.
    ///
    /// Keys absent from `update` are kept.
    pub fn merge(&self, update: &MapTable) {
        self.table.rcu(|current| {
            let mut next = MapTable::clone(current);
            next.merge_from(update);
            next
        });
    }

    /// Replaces the live table wholesale.
    pub fn replace(&self, table: MapTable) {
        self.table.store(Arc::new(table));
    }

    /// Looks up a key in the current snapshot.
    ///
    /// Callers reading several keys for one event should take a
    /// [`snapshot`](Self::snapshot) instead.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.table.load().get(key).cloned()
    }

    /// Returns the current table.
    pub fn snapshot(&self) -> Arc<MapTable> {
        self.table.load_full()
    }

    /// Returns the number of entries in the current table.
    pub fn len(&self) -> usize {
        self.table.load().len()
    }

    /// Returns true if the current table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.load().is_empty()
    }
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new()
    }
}
