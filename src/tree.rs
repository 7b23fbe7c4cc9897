//! Shared tree state and the per-thread handle that operates on it.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering::Relaxed},
        Arc,
    },
};

use crate::{
    check::{self, Validate},
    config::Config,
    lock::{Access, TreeLock},
    node::{Family, NodeRef},
    pool::Pools,
    query::{self, View},
    txn::{self, Stats},
    universe::{Layout, Universes},
    update::{self, Mode, Scope},
    Result,
};

pub(crate) struct Inner<V> {
    universe: u64,
    config: Config,
    lock: TreeLock,
    root: NodeRef,
    vals: Family<V>,
    keys: Family<()>,
    n_handles: AtomicUsize,
}

/// Thread handle over a shared tree, generic over the stored value. The
/// public set and map types wrap this.
pub(crate) struct Tree<V> {
    id: usize,
    inner: Arc<Inner<V>>,
    uv: Universes,
    pools: Pools,
    stats: Stats,
}

impl<V> fmt::Debug for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tree<{} u:{} {:?}>", self.id, self.inner.universe, self.pools)
    }
}

impl<V> Tree<V> {
    pub fn new(universe: u64, config: Config) -> Result<Tree<V>> {
        config.validate()?;
        config.check_universe(universe)?;

        let layout = Layout::new(universe, config.cutoff);
        let uv = Universes::new(universe, config.cutoff);
        let vals: Family<V> = Family::new("valued", &layout.vals, &uv);
        let keys: Family<()> = Family::new("key-only", &layout.keys, &uv);
        let root = vals.build(universe, &uv);
        info_log!(
            universe,
            cutoff = config.cutoff,
            vals = ?layout.vals,
            keys = ?layout.keys,
            "new tree"
        );

        let inner = Arc::new(Inner {
            universe,
            config,
            lock: TreeLock::new(),
            root,
            vals,
            keys,
            n_handles: AtomicUsize::new(1),
        });
        Ok(Tree::register(0, inner, uv))
    }

    /// New handle on the same tree, with its own pools and counters.
    pub fn cloned(&self) -> Tree<V> {
        let id = self.inner.n_handles.fetch_add(1, Relaxed);
        let uv = Universes::new(self.inner.universe, self.inner.config.cutoff);
        Tree::register(id, Arc::clone(&self.inner), uv)
    }

    fn register(id: usize, inner: Arc<Inner<V>>, uv: Universes) -> Tree<V> {
        let mut pools = Pools::new();
        pools.prefill(&inner.vals, &inner.keys, &uv, inner.universe, &inner.config);
        debug_log!(id, ?pools, "handle registered");
        Tree {
            id,
            inner,
            uv,
            pools,
            stats: Stats::default(),
        }
    }

    pub fn to_id(&self) -> usize {
        self.id
    }

    pub fn to_universe(&self) -> u64 {
        self.inner.universe
    }

    pub fn to_config(&self) -> Config {
        self.inner.config
    }

    pub fn to_stats(&self) -> Stats {
        self.stats
    }

    /// Run a read-only traversal from the root.
    fn read<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(View<V>, u64, NodeRef) -> R,
    {
        let inner = &*self.inner;
        let view = View::new(&inner.vals, &inner.keys, &self.uv);
        let body = || f(view, inner.universe, inner.root);
        txn::critical(&inner.lock, &inner.config, Access::Shared, &mut self.stats, body)
    }

    /// Run a mutating traversal from the root, then settle the pools.
    fn write<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Scope<V>, u64, NodeRef) -> R,
    {
        let inner = &*self.inner;
        let (uv, pools) = (&self.uv, &mut self.pools);
        let res = {
            let body = || {
                let mut scope = Scope::new(View::new(&inner.vals, &inner.keys, uv), &mut *pools);
                f(&mut scope, inner.universe, inner.root)
            };
            txn::critical(&inner.lock, &inner.config, Access::Exclusive, &mut self.stats, body)
        };
        pools.drain(&inner.vals, &inner.keys, uv, &inner.config);
        res
    }

    pub fn member(&mut self, key: u64) -> bool {
        if key >= self.inner.universe {
            return false;
        }
        self.read(|v, u, root| query::member(v, u, root, key))
    }

    pub fn insert(&mut self, key: u64, val: V, mode: Mode) -> bool {
        let universe = self.inner.universe;
        assert!(key < universe, "key {} outside universe {}", key, universe);
        self.write(|s, u, root| update::insert(s, u, root, key, val, mode))
    }

    pub fn remove(&mut self, key: u64) -> bool
    where
        V: Clone,
    {
        if key >= self.inner.universe {
            return false;
        }
        self.write(|s, u, root| update::remove(s, u, root, key))
    }

    pub fn get(&mut self, key: u64) -> Option<V>
    where
        V: Clone,
    {
        if key >= self.inner.universe {
            return None;
        }
        self.read(|v, u, root| query::get(v, u, root, key))
    }

    pub fn successor(&mut self, key: u64) -> Option<(u64, V)>
    where
        V: Clone,
    {
        if key >= self.inner.universe {
            return None;
        }
        self.read(|v, u, root| query::successor(v, u, root, key))
    }

    pub fn predecessor(&mut self, key: u64) -> Option<(u64, V)>
    where
        V: Clone,
    {
        let key = key.min(self.inner.universe);
        self.read(|v, u, root| match key {
            key if key == u => query::last(v, u, root),
            key => query::predecessor(v, u, root, key),
        })
    }

    pub fn first(&mut self) -> Option<(u64, V)>
    where
        V: Clone,
    {
        self.read(|v, u, root| query::first(v, u, root))
    }

    pub fn last(&mut self) -> Option<(u64, V)>
    where
        V: Clone,
    {
        self.read(|v, u, root| query::last(v, u, root))
    }

    pub fn len(&mut self) -> usize {
        self.read(|v, u, root| query::count(v, u, root))
    }

    pub fn is_empty(&mut self) -> bool {
        self.read(|v, u, root| query::is_empty(v, u, root))
    }

    pub fn validate(&mut self) -> Result<Validate> {
        self.read(|v, u, root| check::validate(v, u, root, "root"))
    }

    /// Live nodes per family and size, `(family, universe, is_leaf, count)`.
    pub fn footprint(&self) -> Vec<(&'static str, u64, bool, usize)> {
        let inner = &*self.inner;
        let (vname, kname) = (inner.vals.to_name(), inner.keys.to_name());
        let vals = inner.vals.footprint().into_iter().map(|(u, l, n)| (vname, u, l, n));
        let keys = inner.keys.footprint().into_iter().map(|(u, l, n)| (kname, u, l, n));
        vals.chain(keys).collect()
    }

    pub fn print_sizing(&self) {
        println!("tree<{}> universe:{} {:?}", self.id, self.inner.universe, self.inner.config);
        for (fam, u, leaf, n) in self.footprint().into_iter() {
            let kind = if leaf { "leaf" } else { "internal" };
            println!("  {:<8} {:>14} {:<8} nodes:{}", fam, u, kind, n);
        }
    }

    #[cfg(test)]
    pub(crate) fn to_pools(&self) -> &Pools {
        &self.pools
    }

    #[cfg(test)]
    pub(crate) fn inspect<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(View<V>, u64, NodeRef) -> R,
    {
        self.read(f)
    }

    /// Live nodes of one family and size.
    #[cfg(test)]
    pub(crate) fn live(&self, family: &str, u: u64) -> usize {
        let iter = self.footprint().into_iter();
        iter.filter(|(fam, size, _, _)| *fam == family && *size == u)
            .map(|(_, _, _, n)| n)
            .sum()
    }
}

impl<V> Drop for Tree<V> {
    fn drop(&mut self) {
        let inner = &*self.inner;
        self.pools.release(&inner.vals, &inner.keys);
    }
}
