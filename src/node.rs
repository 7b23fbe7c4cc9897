//! Node types and the per-size arenas that own them.

use std::fmt;

use crate::{
    arena::{Arena, Handle},
    config::EMPTY,
    universe::{power, UniverseInfo, Universes},
};

/// Child reference. Every size class is either all leaves or all
/// internal nodes, the tag says which arena the handle points into.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Leaf(Handle),
    Internal(Handle),
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NodeRef::Leaf(h) => write!(f, "Leaf{:?}", h),
            NodeRef::Internal(h) => write!(f, "Internal{:?}", h),
        }
    }
}

/// Bitmap node for universes up to the cutoff.
///
/// `min` lives only in the `min`/`min_val` fields, never in the bitmap.
/// With two or more keys `max` is present in the bitmap as well.
pub struct Leaf<V> {
    pub(crate) min: u64,
    pub(crate) max: u64,
    pub(crate) bitmap: u64,
    pub(crate) min_val: Option<V>,
    pub(crate) vals: Box<[Option<V>]>,
}

impl<V> Leaf<V> {
    pub fn new(u: u64) -> Leaf<V> {
        Leaf {
            min: EMPTY,
            max: EMPTY,
            bitmap: 0,
            min_val: None,
            vals: (0..u).map(|_| None).collect(),
        }
    }

    pub fn reset(&mut self) {
        self.min = EMPTY;
        self.max = EMPTY;
        if self.bitmap != 0 {
            self.vals.iter_mut().for_each(|v| *v = None);
        }
        self.bitmap = 0;
        self.min_val = None;
    }
}

/// Recursive node for universes above the cutoff.
pub struct Internal<V> {
    pub(crate) min: u64,
    pub(crate) max: u64,
    pub(crate) min_val: Option<V>,
    /// Key-only node over `n_clusters`, allocated with the first cluster.
    pub(crate) summary: Option<NodeRef>,
    pub(crate) clusters: Box<[Option<NodeRef>]>,
}

impl<V> Internal<V> {
    pub fn new(info: &UniverseInfo) -> Internal<V> {
        Internal {
            min: EMPTY,
            max: EMPTY,
            min_val: None,
            summary: None,
            clusters: vec![None; info.n_clusters as usize].into_boxed_slice(),
        }
    }

    pub fn reset(&mut self) {
        debug_assert!(self.summary.is_none(), "reset with live summary");
        debug_assert!(self.clusters.iter().all(Option::is_none), "reset with live clusters");
        self.min = EMPTY;
        self.max = EMPTY;
        self.min_val = None;
    }
}

enum Class<V> {
    Leaves(Arena<Leaf<V>>),
    Internals(Arena<Internal<V>>),
}

/// Arenas of one family, one per node size. A tree has two families: the
/// valued family holds the root and its clusters, the key-only family holds
/// summaries and everything under them.
pub struct Family<V> {
    name: &'static str,
    classes: Vec<Option<Class<V>>>,
}

impl<V> Family<V> {
    pub fn new(name: &'static str, sizes: &[u64], uv: &Universes) -> Family<V> {
        let mut classes: Vec<Option<Class<V>>> = (0..64).map(|_| None).collect();
        for u in sizes.iter().copied() {
            classes[power(u)] = match uv.is_leaf(u) {
                true => Some(Class::Leaves(Arena::new(u))),
                false => Some(Class::Internals(Arena::new(u))),
            };
        }
        Family { name, classes }
    }

    #[inline]
    pub fn leaves(&self, u: u64) -> &Arena<Leaf<V>> {
        match self.classes.get(power(u)) {
            Some(Some(Class::Leaves(arena))) => arena,
            _ => fatal!("no leaf arena of size {} in {} family", u, self.name),
        }
    }

    #[inline]
    pub fn internals(&self, u: u64) -> &Arena<Internal<V>> {
        match self.classes.get(power(u)) {
            Some(Some(Class::Internals(arena))) => arena,
            _ => fatal!("no internal arena of size {} in {} family", u, self.name),
        }
    }

    pub fn to_name(&self) -> &'static str {
        self.name
    }

    /// Sizes covered by this family, smallest first.
    pub fn sizes(&self) -> Vec<u64> {
        let iter = self.classes.iter().enumerate();
        iter.filter_map(|(p, c)| c.as_ref().map(|_| 1_u64 << p)).collect()
    }

    /// Allocate a fresh, empty node of size `u`.
    pub fn build(&self, u: u64, uv: &Universes) -> NodeRef {
        match self.classes.get(power(u)) {
            Some(Some(Class::Leaves(arena))) => NodeRef::Leaf(arena.alloc(Leaf::new(u))),
            Some(Some(Class::Internals(arena))) => {
                NodeRef::Internal(arena.alloc(Internal::new(&uv.get(u))))
            }
            _ => fatal!("no arena of size {} in {} family", u, self.name),
        }
    }

    /// Empty an unlinked node and re-issue it under a new generation.
    ///
    /// # Safety
    ///
    /// `node` is owned by the caller and unreachable from the tree.
    pub unsafe fn recycle(&self, u: u64, node: NodeRef) -> NodeRef {
        match node {
            NodeRef::Leaf(h) => {
                let arena = self.leaves(u);
                arena.get_mut(h).reset();
                NodeRef::Leaf(arena.renew(h))
            }
            NodeRef::Internal(h) => {
                let arena = self.internals(u);
                arena.get_mut(h).reset();
                NodeRef::Internal(arena.renew(h))
            }
        }
    }

    /// Destroy an unlinked node.
    ///
    /// # Safety
    ///
    /// `node` is owned by the caller and unreachable from the tree.
    pub unsafe fn destroy(&self, u: u64, node: NodeRef) {
        match node {
            NodeRef::Leaf(h) => self.leaves(u).free(h),
            NodeRef::Internal(h) => self.internals(u).free(h),
        }
    }

    /// Live nodes per size, `(universe, is_leaf, count)`.
    pub fn footprint(&self) -> Vec<(u64, bool, usize)> {
        let iter = self.classes.iter().filter_map(|c| c.as_ref());
        iter.map(|c| match c {
            Class::Leaves(a) => (a.to_universe(), true, a.len()),
            Class::Internals(a) => (a.to_universe(), false, a.len()),
        })
        .collect()
    }
}
