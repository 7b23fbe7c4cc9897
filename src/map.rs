use std::fmt;

use crate::{check::Validate, config::Config, tree::Tree, txn::Stats, update::Mode, Result};

/// Concurrent ordered map from integers in `[0, universe)` to values.
///
/// Same handle model as [crate::VebSet]. Values are cloned out on reads, use
/// an `Arc` for large values.
pub struct VebMap<V> {
    tree: Tree<V>,
}

impl<V> fmt::Debug for VebMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "VebMap<{:?}>", self.tree)
    }
}

impl<V> Clone for VebMap<V> {
    fn clone(&self) -> VebMap<V> {
        self.cloned()
    }
}

impl<V> VebMap<V> {
    pub fn new(universe: u64) -> Result<VebMap<V>> {
        VebMap::with_config(universe, Config::default())
    }

    pub fn with_config(universe: u64, config: Config) -> Result<VebMap<V>> {
        let tree = Tree::new(universe, config)?;
        Ok(VebMap { tree })
    }

    pub fn cloned(&self) -> VebMap<V> {
        VebMap {
            tree: self.tree.cloned(),
        }
    }

    pub fn id(&self) -> usize {
        self.tree.to_id()
    }

    pub fn universe(&self) -> u64 {
        self.tree.to_universe()
    }

    pub fn to_config(&self) -> Config {
        self.tree.to_config()
    }

    pub fn stats(&self) -> Stats {
        self.tree.to_stats()
    }

    pub fn member(&mut self, key: u64) -> bool {
        self.tree.member(key)
    }

    /// Insert `key` with `value` if absent, an existing value is left
    /// untouched. Return whether the key was added.
    ///
    /// # Panics
    ///
    /// If `key` is outside the universe.
    pub fn insert(&mut self, key: u64, value: V) -> bool {
        self.tree.insert(key, value, Mode::IfAbsent)
    }

    /// Insert `key` with `value`, overwriting an existing value. Return
    /// whether the key was added.
    ///
    /// # Panics
    ///
    /// If `key` is outside the universe.
    pub fn insert_or_update(&mut self, key: u64, value: V) -> bool {
        self.tree.insert(key, value, Mode::Upsert)
    }

    pub fn is_empty(&mut self) -> bool {
        self.tree.is_empty()
    }

    pub fn len(&mut self) -> usize {
        self.tree.len()
    }

    pub fn print_sizing(&self) {
        self.tree.print_sizing()
    }
}

impl<V> VebMap<V>
where
    V: Clone,
{
    pub fn get(&mut self, key: u64) -> Option<V> {
        self.tree.get(key)
    }

    /// Remove `key`, return whether it was present.
    pub fn remove(&mut self, key: u64) -> bool {
        self.tree.remove(key)
    }

    /// Entry with the smallest key strictly greater than `key`.
    pub fn successor(&mut self, key: u64) -> Option<(u64, V)> {
        self.tree.successor(key)
    }

    /// Entry with the largest key strictly less than `key`.
    pub fn predecessor(&mut self, key: u64) -> Option<(u64, V)> {
        self.tree.predecessor(key)
    }

    pub fn first(&mut self) -> Option<(u64, V)> {
        self.tree.first()
    }

    pub fn last(&mut self) -> Option<(u64, V)> {
        self.tree.last()
    }

    /// Entries in ascending key order.
    pub fn to_vec(&mut self) -> Vec<(u64, V)> {
        let mut items = vec![];
        let mut next = self.first();
        while let Some((key, value)) = next {
            items.push((key, value));
            next = self.successor(key);
        }
        items
    }

    pub fn validate(&mut self) -> Result<Validate> {
        self.tree.validate()
    }
}

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;
