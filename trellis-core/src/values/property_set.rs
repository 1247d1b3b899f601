use indexmap::IndexMap;

use super::ValueHolder;

/// Key level difference between two property sets.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct KeyDiff {
    /// Only present in the newer set
    pub added: Vec<String>,
    /// Only present in the older set
    pub removed: Vec<String>,
    /// Present in both
    pub common: Vec<String>,
}

// -----------------------------------------------------------------------------
//   - Property set -
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    values: IndexMap<String, ValueHolder>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ValueHolder>) -> Option<ValueHolder> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ValueHolder> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ValueHolder> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueHolder)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Compare key presence only. Values are never looked at.
    /// `added` and `common` follow the order of `newer`, `removed` the order of `self`.
    pub fn diff_keys(&self, newer: &PropertySet) -> KeyDiff {
        let mut diff = KeyDiff::default();

        for key in newer.values.keys() {
            match self.values.contains_key(key) {
                true => diff.common.push(key.clone()),
                false => diff.added.push(key.clone()),
            }
        }

        diff.removed = self
            .values
            .keys()
            .filter(|key| !newer.values.contains_key(*key))
            .cloned()
            .collect();

        diff
    }
}
