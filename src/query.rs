//! Read-only tree traversal.

use crate::{
    arena::Handle,
    config::EMPTY,
    leaf::present,
    node::{Family, Internal, Leaf, NodeRef},
    universe::{UniverseInfo, Universes},
};

/// Shared view of a tree, valid while the caller holds the tree lock in
/// either mode.
pub struct View<'a, V> {
    pub(crate) vals: &'a Family<V>,
    pub(crate) keys: &'a Family<()>,
    pub(crate) uv: &'a Universes,
}

impl<'a, V> Clone for View<'a, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, V> Copy for View<'a, V> {}

impl<'a, V> View<'a, V> {
    pub fn new(vals: &'a Family<V>, keys: &'a Family<()>, uv: &'a Universes) -> Self {
        View { vals, keys, uv }
    }

    /// View over the key-only family, used to walk summaries.
    #[inline]
    pub fn keys(self) -> View<'a, ()> {
        View {
            vals: self.keys,
            keys: self.keys,
            uv: self.uv,
        }
    }

    #[inline]
    pub fn info(self, u: u64) -> UniverseInfo {
        self.uv.get(u)
    }

    #[inline]
    pub fn leaf(self, u: u64, h: Handle) -> &'a Leaf<V> {
        // SAFETY: writers are excluded while a view exists.
        unsafe { self.vals.leaves(u).get(h) }
    }

    #[inline]
    pub fn internal(self, u: u64, h: Handle) -> &'a Internal<V> {
        // SAFETY: writers are excluded while a view exists.
        unsafe { self.vals.internals(u).get(h) }
    }
}

/// `(min, max)` of a node, `EMPTY` for both when empty.
#[inline]
pub fn bounds<V>(v: View<V>, u: u64, node: NodeRef) -> (u64, u64) {
    match node {
        NodeRef::Leaf(h) => {
            let n = v.leaf(u, h);
            (n.min, n.max)
        }
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            (n.min, n.max)
        }
    }
}

#[inline]
pub fn is_empty<V>(v: View<V>, u: u64, node: NodeRef) -> bool {
    bounds(v, u, node).0 == EMPTY
}

pub fn member<V>(v: View<V>, u: u64, node: NodeRef, x: u64) -> bool {
    match node {
        NodeRef::Leaf(h) => v.leaf(u, h).member(x),
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            if x == n.min || x == n.max {
                return true;
            } else if n.min == EMPTY || x < n.min || x > n.max {
                return false;
            }
            let info = v.info(u);
            match n.clusters[info.high(x) as usize] {
                Some(child) => member(v, info.cluster_size, child, info.low(x)),
                None => false,
            }
        }
    }
}

pub fn get<V: Clone>(v: View<V>, u: u64, node: NodeRef, x: u64) -> Option<V> {
    match node {
        NodeRef::Leaf(h) => v.leaf(u, h).get(x),
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            if x == n.min {
                return n.min_val.clone();
            } else if n.min == EMPTY || x < n.min || x > n.max {
                return None;
            }
            let info = v.info(u);
            match n.clusters[info.high(x) as usize] {
                Some(child) => get(v, info.cluster_size, child, info.low(x)),
                None => None,
            }
        }
    }
}

pub fn first<V: Clone>(v: View<V>, u: u64, node: NodeRef) -> Option<(u64, V)> {
    match node {
        NodeRef::Leaf(h) => v.leaf(u, h).first(),
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            match n.min {
                EMPTY => None,
                min => Some((min, present(&n.min_val, min))),
            }
        }
    }
}

pub fn last<V: Clone>(v: View<V>, u: u64, node: NodeRef) -> Option<(u64, V)> {
    match node {
        NodeRef::Leaf(h) => v.leaf(u, h).last(),
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            if n.min == EMPTY {
                return None;
            } else if n.min == n.max {
                return Some((n.min, present(&n.min_val, n.min)));
            }
            let info = v.info(u);
            let (hi, child) = top_cluster(v, info, n);
            match last(v, info.cluster_size, child) {
                Some((off, val)) => Some((info.index(hi, off), val)),
                None => fatal!("cluster {} listed in summary is empty", hi),
            }
        }
    }
}

pub fn successor<V: Clone>(v: View<V>, u: u64, node: NodeRef, x: u64) -> Option<(u64, V)> {
    let h = match node {
        NodeRef::Leaf(h) => return v.leaf(u, h).successor(x),
        NodeRef::Internal(h) => h,
    };

    let n = v.internal(u, h);
    if n.min == EMPTY {
        return None;
    } else if x < n.min {
        return Some((n.min, present(&n.min_val, n.min)));
    } else if x >= n.max {
        return None;
    }

    let info = v.info(u);
    let (hi, lo) = (info.high(x), info.low(x));
    if let Some(child) = n.clusters[hi as usize] {
        let (_, cmax) = bounds(v, info.cluster_size, child);
        if cmax != EMPTY && lo < cmax {
            return match successor(v, info.cluster_size, child, lo) {
                Some((off, val)) => Some((info.index(hi, off), val)),
                None => fatal!("cluster {} has max {} but no successor of {}", hi, cmax, lo),
            };
        }
    }

    let summary = n.summary?;
    let (sc, _) = successor(v.keys(), info.n_clusters, summary, hi)?;
    let child = cluster(n, sc);
    match first(v, info.cluster_size, child) {
        Some((off, val)) => Some((info.index(sc, off), val)),
        None => fatal!("cluster {} listed in summary is empty", sc),
    }
}

pub fn predecessor<V: Clone>(v: View<V>, u: u64, node: NodeRef, x: u64) -> Option<(u64, V)> {
    let h = match node {
        NodeRef::Leaf(h) => return v.leaf(u, h).predecessor(x),
        NodeRef::Internal(h) => h,
    };

    let n = v.internal(u, h);
    if n.min == EMPTY || x <= n.min {
        return None;
    } else if x > n.max {
        return last(v, u, node);
    }

    let info = v.info(u);
    let (hi, lo) = (info.high(x), info.low(x));
    if let Some(child) = n.clusters[hi as usize] {
        let (cmin, _) = bounds(v, info.cluster_size, child);
        if cmin != EMPTY && cmin < lo {
            return match predecessor(v, info.cluster_size, child, lo) {
                Some((off, val)) => Some((info.index(hi, off), val)),
                None => fatal!("cluster {} has min {} but no predecessor of {}", hi, cmin, lo),
            };
        }
    }

    let pc = match n.summary {
        Some(summary) => predecessor(v.keys(), info.n_clusters, summary, hi),
        None => None,
    };
    match pc {
        Some((pc, _)) => match last(v, info.cluster_size, cluster(n, pc)) {
            Some((off, val)) => Some((info.index(pc, off), val)),
            None => fatal!("cluster {} listed in summary is empty", pc),
        },
        // x > min was checked above.
        None => Some((n.min, present(&n.min_val, n.min))),
    }
}

/// Number of keys under `node`.
pub fn count<V>(v: View<V>, u: u64, node: NodeRef) -> usize {
    match node {
        NodeRef::Leaf(h) => v.leaf(u, h).count(),
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            if n.min == EMPTY {
                return 0;
            }
            let cs = v.info(u).cluster_size;
            let iter = n.clusters.iter().filter_map(|c| *c);
            1 + iter.map(|child| count(v, cs, child)).sum::<usize>()
        }
    }
}

/// Cluster slot `c`, which the summary lists as non-empty.
#[inline]
pub(crate) fn cluster<V>(n: &Internal<V>, c: u64) -> NodeRef {
    match n.clusters[c as usize] {
        Some(child) => child,
        None => fatal!("summary lists cluster {} but the slot is empty", c),
    }
}

/// Highest non-empty cluster of a node holding two or more keys.
pub(crate) fn top_cluster<V>(v: View<V>, info: UniverseInfo, n: &Internal<V>) -> (u64, NodeRef) {
    let summary = match n.summary {
        Some(summary) => summary,
        None => fatal!("node with min {} max {} has no summary", n.min, n.max),
    };
    match bounds(v.keys(), info.n_clusters, summary) {
        (_, EMPTY) => fatal!("node with min {} max {} has an empty summary", n.min, n.max),
        (_, hi) => (hi, cluster(n, hi)),
    }
}
