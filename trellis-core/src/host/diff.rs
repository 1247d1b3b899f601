use std::hash::Hash;

use indexmap::IndexMap;

/// Keyed state that is rebuilt by every inflation pass.
///
/// `begin` moves everything into the leftovers. Entries that survive the pass
/// are staged again, and whatever is still a leftover at `commit` is handed
/// back to the caller for disposal. `abort` restores the last committed state.
pub(crate) struct IncrementalDiff<K, V> {
    previous: IndexMap<K, V>,
    leftovers: IndexMap<K, V>,
    current: IndexMap<K, V>,
}

impl<K: Hash + Eq + Clone, V: Clone> IncrementalDiff<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            previous: IndexMap::new(),
            leftovers: IndexMap::new(),
            current: IndexMap::new(),
        }
    }

    pub(crate) fn begin(&mut self) {
        self.previous = self.current.clone();
        self.leftovers = std::mem::take(&mut self.current);
    }

    pub(crate) fn leftover(&self, key: &K) -> Option<&V> {
        self.leftovers.get(key)
    }

    pub(crate) fn take_leftover(&mut self, key: &K) -> Option<V> {
        self.leftovers.shift_remove(key)
    }

    pub(crate) fn has_leftovers(&self) -> bool {
        !self.leftovers.is_empty()
    }

    pub(crate) fn staged(&self, key: &K) -> Option<&V> {
        self.current.get(key)
    }

    pub(crate) fn stage(&mut self, key: K, value: V) {
        self.current.insert(key, value);
    }

    /// The committed value for `key` before the current pass began.
    pub(crate) fn previous(&self, key: &K) -> Option<&V> {
        self.previous.get(key)
    }

    pub(crate) fn previous_values(&self) -> impl Iterator<Item = &V> {
        self.previous.values()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.current.iter()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &V> {
        self.current.values()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Finish the pass and return the leftovers.
    pub(crate) fn commit(&mut self) -> Vec<V> {
        self.previous.clear();
        self.leftovers.drain(..).map(|(_, v)| v).collect()
    }

    pub(crate) fn abort(&mut self) {
        self.leftovers.clear();
        self.current = std::mem::take(&mut self.previous);
    }
}
