use std::fmt;

use crate::{check::Validate, config::Config, tree::Tree, txn::Stats, update::Mode, Result};

/// Concurrent ordered set of integers in `[0, universe)`.
///
/// A `VebSet` value is a handle: it owns per-thread node pools and driver
/// counters and shares the tree itself with every handle cloned from it.
/// Operations take `&mut self`, to use the set from several threads give
/// each thread its own handle via [VebSet::cloned].
pub struct VebSet {
    tree: Tree<()>,
}

impl fmt::Debug for VebSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "VebSet<{:?}>", self.tree)
    }
}

impl Clone for VebSet {
    fn clone(&self) -> VebSet {
        self.cloned()
    }
}

impl VebSet {
    /// Create a set over `[0, universe)` with default [Config]. `universe`
    /// must be a power of two between 2 and 2^40.
    pub fn new(universe: u64) -> Result<VebSet> {
        VebSet::with_config(universe, Config::default())
    }

    pub fn with_config(universe: u64, config: Config) -> Result<VebSet> {
        let tree = Tree::new(universe, config)?;
        Ok(VebSet { tree })
    }

    /// Create a new handle to the same set, typically to hand to another
    /// thread. Its node pools are stocked before it is returned.
    pub fn cloned(&self) -> VebSet {
        VebSet {
            tree: self.tree.cloned(),
        }
    }

    /// Handle id, unique among handles of the same set.
    pub fn id(&self) -> usize {
        self.tree.to_id()
    }

    pub fn universe(&self) -> u64 {
        self.tree.to_universe()
    }

    pub fn to_config(&self) -> Config {
        self.tree.to_config()
    }

    /// Driver counters for operations run through this handle.
    pub fn stats(&self) -> Stats {
        self.tree.to_stats()
    }

    pub fn member(&mut self, key: u64) -> bool {
        self.tree.member(key)
    }

    /// Add `key`, return whether it was absent.
    ///
    /// # Panics
    ///
    /// If `key` is outside the universe.
    pub fn insert(&mut self, key: u64) -> bool {
        self.tree.insert(key, (), Mode::IfAbsent)
    }

    /// Remove `key`, return whether it was present.
    pub fn remove(&mut self, key: u64) -> bool {
        self.tree.remove(key)
    }

    /// Smallest key strictly greater than `key`.
    pub fn successor(&mut self, key: u64) -> Option<u64> {
        self.tree.successor(key).map(|(k, _)| k)
    }

    /// Largest key strictly less than `key`.
    pub fn predecessor(&mut self, key: u64) -> Option<u64> {
        self.tree.predecessor(key).map(|(k, _)| k)
    }

    pub fn min(&mut self) -> Option<u64> {
        self.tree.first().map(|(k, _)| k)
    }

    pub fn max(&mut self) -> Option<u64> {
        self.tree.last().map(|(k, _)| k)
    }

    pub fn is_empty(&mut self) -> bool {
        self.tree.is_empty()
    }

    /// Number of keys, walks the whole tree.
    pub fn len(&mut self) -> usize {
        self.tree.len()
    }

    /// Keys in ascending order.
    pub fn to_vec(&mut self) -> Vec<u64> {
        let mut keys = vec![];
        let mut next = self.min();
        while let Some(key) = next {
            keys.push(key);
            next = self.successor(key);
        }
        keys
    }

    /// Check structural invariants of the whole tree.
    pub fn validate(&mut self) -> Result<Validate> {
        self.tree.validate()
    }

    pub fn print_sizing(&self) {
        self.tree.print_sizing()
    }
}

#[cfg(test)]
#[path = "set_test.rs"]
mod set_test;

#[cfg(test)]
#[path = "dash_test.rs"]
mod dash_test;
