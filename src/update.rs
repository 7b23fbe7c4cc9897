//! Mutating tree traversal, run with the tree lock held exclusively.
//!
//! Nodes needed along the way come off the calling handle's pools, nodes
//! that empty out are unlinked and queued for reclamation. Neither touches
//! shared allocator state unless a pool runs dry.

use crate::{
    arena::Handle,
    config::EMPTY,
    node::{Internal, Leaf, NodeRef},
    pool::{Pools, Stacks},
    query::{self, View},
};

/// Insert behaviour for a key that is already present.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Leave the stored value untouched.
    IfAbsent,
    /// Overwrite the stored value.
    Upsert,
}

/// Exclusive access to a tree plus the calling handle's pools.
pub struct Scope<'a, 'p, V> {
    view: View<'a, V>,
    pools: &'p mut Pools,
    keyed: bool,
}

impl<'a, 'p, V> Scope<'a, 'p, V> {
    /// Caller must hold the tree lock exclusively for the lifetime of the
    /// scope.
    pub fn new(view: View<'a, V>, pools: &'p mut Pools) -> Self {
        Scope {
            view,
            pools,
            keyed: false,
        }
    }

    /// Scope over the key-only family, used to update summaries.
    pub fn keys(&mut self) -> Scope<'a, '_, ()> {
        Scope {
            view: self.view.keys(),
            pools: &mut *self.pools,
            keyed: true,
        }
    }

    #[inline]
    pub fn view(&self) -> View<'a, V> {
        self.view
    }

    fn stacks(&mut self) -> &mut Stacks {
        match self.keyed {
            true => &mut self.pools.keys,
            false => &mut self.pools.vals,
        }
    }

    #[inline]
    fn leaf(&self, u: u64, h: Handle) -> &'a mut Leaf<V> {
        // SAFETY: the scope holds the tree lock exclusively, and callers take
        // at most one reference per node at a time.
        unsafe { self.view.vals.leaves(u).get_mut(h) }
    }

    #[inline]
    fn internal(&self, u: u64, h: Handle) -> &'a mut Internal<V> {
        // SAFETY: see `leaf`.
        unsafe { self.view.vals.internals(u).get_mut(h) }
    }

    /// Take an empty node of size `u` off the pool, building one in place
    /// if the pool is dry. Either way the pool is marked for refill.
    fn alloc(&mut self, u: u64) -> NodeRef {
        let stacks = self.stacks();
        stacks.mark_refill(u);
        match stacks.pop(u) {
            Some(node) => node,
            None => {
                warn_log!(u, keyed = self.keyed, "node pool empty, building in critical section");
                self.view.vals.build(u, self.view.uv)
            }
        }
    }

    /// Queue an unlinked node for reclamation once the lock is released.
    fn retire(&mut self, u: u64, node: NodeRef) {
        self.stacks().mark_reclaim(u, node)
    }
}

/// Insert `x` under `node` of universe `u`, return whether it was added.
pub fn insert<V>(s: &mut Scope<V>, u: u64, node: NodeRef, x: u64, val: V, mode: Mode) -> bool {
    let h = match node {
        NodeRef::Leaf(h) => return s.leaf(u, h).insert(x, val, mode),
        NodeRef::Internal(h) => h,
    };

    let n = s.internal(u, h);
    if x == n.min {
        if mode == Mode::Upsert {
            n.min_val = Some(val);
        }
        return false;
    } else if x == n.max && mode == Mode::IfAbsent {
        return false;
    } else if n.min == EMPTY {
        n.min = x;
        n.max = x;
        n.min_val = Some(val);
        return true;
    }

    let (mut x, mut val) = (x, val);
    if x < n.min {
        // new minimum, push the old one down.
        std::mem::swap(&mut x, &mut n.min);
        val = match n.min_val.replace(val) {
            Some(val) => val,
            None => fatal!("node min {} without value", x),
        };
    }

    let info = s.view().info(u);
    let (hi, lo) = (info.high(x), info.low(x));
    let child = match n.clusters[hi as usize] {
        Some(child) => child,
        None => {
            let child = s.alloc(info.cluster_size);
            n.clusters[hi as usize] = Some(child);
            child
        }
    };

    let inserted = if query::is_empty(s.view(), info.cluster_size, child) {
        let summary = match n.summary {
            Some(summary) => summary,
            None => {
                let summary = s.keys().alloc(info.n_clusters);
                n.summary = Some(summary);
                summary
            }
        };
        let added = insert(&mut s.keys(), info.n_clusters, summary, hi, (), Mode::IfAbsent);
        invariant!(added, "cluster {} empty but listed in summary", hi);
        seed(s, info.cluster_size, child, lo, val);
        true
    } else {
        insert(s, info.cluster_size, child, lo, val, mode)
    };

    if x > n.max {
        n.max = x;
    }
    inserted
}

/// Insert `x` into an empty node.
fn seed<V>(s: &mut Scope<V>, u: u64, node: NodeRef, x: u64, val: V) {
    match node {
        NodeRef::Leaf(h) => s.leaf(u, h).seed(x, val),
        NodeRef::Internal(h) => {
            let n = s.internal(u, h);
            debug_assert!(n.min == EMPTY, "seed into non-empty node");
            n.min = x;
            n.max = x;
            n.min_val = Some(val);
        }
    }
}

/// Remove `x` under `node` of universe `u`, return whether it was present.
/// Clusters and summaries that become empty are unlinked and retired.
pub fn remove<V: Clone>(s: &mut Scope<V>, u: u64, node: NodeRef, x: u64) -> bool {
    let h = match node {
        NodeRef::Leaf(h) => return s.leaf(u, h).remove(x),
        NodeRef::Internal(h) => h,
    };

    let n = s.internal(u, h);
    if n.min == EMPTY || x < n.min || x > n.max {
        return false;
    } else if n.min == n.max {
        n.min = EMPTY;
        n.max = EMPTY;
        n.min_val = None;
        return true;
    }

    let info = s.view().info(u);
    let (cs, nc) = (info.cluster_size, info.n_clusters);

    let mut x = x;
    if x == n.min {
        // promote the smallest clustered key to min, then remove it below.
        let summary = match n.summary {
            Some(summary) => summary,
            None => fatal!("node with min {} max {} has no summary", n.min, n.max),
        };
        let fc = query::bounds(s.view().keys(), nc, summary).0;
        match query::first(s.view(), cs, query::cluster(n, fc)) {
            Some((off, val)) => {
                x = info.index(fc, off);
                n.min = x;
                n.min_val = Some(val);
            }
            None => fatal!("cluster {} listed in summary is empty", fc),
        }
    }

    let (hi, lo) = (info.high(x), info.low(x));
    let child = match n.clusters[hi as usize] {
        Some(child) => child,
        None => return false,
    };
    let removed = remove(s, cs, child, lo);

    if query::is_empty(s.view(), cs, child) {
        n.clusters[hi as usize] = None;
        s.retire(cs, child);

        let summary = match n.summary {
            Some(summary) => summary,
            None => fatal!("cluster {} linked without summary", hi),
        };
        let smax = {
            let mut ks = s.keys();
            let dropped = remove(&mut ks, nc, summary, hi);
            invariant!(dropped, "empty cluster {} missing from summary", hi);
            let (smin, smax) = query::bounds(ks.view(), nc, summary);
            if smin == EMPTY {
                n.summary = None;
                ks.retire(nc, summary);
            }
            smax
        };

        if x == n.max {
            n.max = match smax {
                EMPTY => n.min,
                smax => {
                    let (_, cmax) = query::bounds(s.view(), cs, query::cluster(n, smax));
                    info.index(smax, cmax)
                }
            };
        }
    } else if x == n.max {
        let (_, cmax) = query::bounds(s.view(), cs, child);
        n.max = info.index(hi, cmax);
    }

    removed
}

#[cfg(test)]
#[path = "update_test.rs"]
mod update_test;
