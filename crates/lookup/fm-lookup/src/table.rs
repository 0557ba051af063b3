//! MapTable - exact-match lookup table using HashMap.

use ahash::RandomState;
use hashbrown::HashMap;
use serde_json::Value;

/// O(1) exact-match lookup table using hashbrown with ahash.
///
/// Keys are compared byte for byte with no normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapTable {
    /// Maps key string to its mapped value.
    data: HashMap<String, Value, RandomState>,
}

impl MapTable {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Inserts an entry, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Copies every entry of `other` into this table, overwriting collisions.
    pub fn merge_from(&mut self, other: &MapTable) {
        self.data.reserve(other.len());
        for (key, value) in &other.data {
            self.data.insert(key.clone(), value.clone());
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for MapTable {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}
