//! Per-handle node pools.
//!
//! Each handle keeps a stack of ready, empty nodes for every node size of
//! both families. Critical sections only pop from these stacks and queue
//! work, the work itself runs afterwards through [Pools::drain]:
//!
//! * every size popped is refilled back to `pool_depth`.
//! * every node unlinked is reset and pushed back onto the stack of its
//!   size while the stack holds fewer than `pool_depth * pool_grow` nodes,
//!   otherwise it is destroyed.

use std::fmt;

use crate::{
    config::Config,
    node::{Family, NodeRef},
    universe::{power, Universes},
};

/// Node unlinked from the tree, waiting for the critical section to end.
#[derive(Clone, Copy, Debug)]
pub struct Retired {
    u: u64,
    node: NodeRef,
}

/// Free stacks and pending work for one family.
pub struct Stacks {
    free: Vec<Vec<NodeRef>>,
    to_refill: Vec<u64>,
    to_reclaim: Vec<Retired>,
}

impl Stacks {
    fn new() -> Stacks {
        Stacks {
            free: (0..64).map(|_| Vec::default()).collect(),
            to_refill: Vec::default(),
            to_reclaim: Vec::default(),
        }
    }

    #[inline]
    pub fn pop(&mut self, u: u64) -> Option<NodeRef> {
        self.free[power(u)].pop()
    }

    #[inline]
    pub fn mark_refill(&mut self, u: u64) {
        self.to_refill.push(u)
    }

    #[inline]
    pub fn mark_reclaim(&mut self, u: u64, node: NodeRef) {
        self.to_reclaim.push(Retired { u, node })
    }

    /// Number of ready nodes of size `u`.
    #[cfg(test)]
    pub fn depth(&self, u: u64) -> usize {
        self.free[power(u)].len()
    }

    fn fill<V>(&mut self, fam: &Family<V>, uv: &Universes, u: u64, depth: usize) -> usize {
        let stack = &mut self.free[power(u)];
        let n = depth.saturating_sub(stack.len());
        for _ in 0..n {
            stack.push(fam.build(u, uv))
        }
        n
    }

    fn drain<V>(&mut self, fam: &Family<V>, uv: &Universes, config: &Config) -> DrainStats {
        let mut stats = DrainStats::default();

        let mut retired = std::mem::take(&mut self.to_reclaim);
        for Retired { u, node } in retired.drain(..) {
            let stack = &mut self.free[power(u)];
            // SAFETY: the node was unlinked inside the critical section that
            // queued it, nothing else refers to it.
            unsafe {
                if stack.len() < config.high_water() {
                    stack.push(fam.recycle(u, node));
                    stats.recycled += 1;
                } else {
                    fam.destroy(u, node);
                    stats.destroyed += 1;
                }
            }
        }
        self.to_reclaim = retired;

        let mut sizes = std::mem::take(&mut self.to_refill);
        for u in sizes.drain(..) {
            stats.built += self.fill(fam, uv, u, config.pool_depth);
        }
        self.to_refill = sizes;

        stats
    }

    fn release<V>(&mut self, fam: &Family<V>) {
        for (p, stack) in self.free.iter_mut().enumerate() {
            for node in stack.drain(..) {
                // SAFETY: pooled nodes are never linked.
                unsafe { fam.destroy(1 << p, node) }
            }
        }
    }
}

/// Outcome of one [Pools::drain].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct DrainStats {
    /// Nodes built to refill pools.
    pub built: usize,
    /// Unlinked nodes reset and kept.
    pub recycled: usize,
    /// Unlinked nodes destroyed, pool was at its high-water mark.
    pub destroyed: usize,
}

/// Node pools of one handle, for both families of a tree.
pub struct Pools {
    pub(crate) vals: Stacks,
    pub(crate) keys: Stacks,
}

impl fmt::Debug for Pools {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let vals: usize = self.vals.free.iter().map(Vec::len).sum();
        let keys: usize = self.keys.free.iter().map(Vec::len).sum();
        write!(f, "Pools<vals:{} keys:{}>", vals, keys)
    }
}

impl Pools {
    /// Empty pools, see [Pools::prefill].
    pub fn new() -> Pools {
        Pools {
            vals: Stacks::new(),
            keys: Stacks::new(),
        }
    }

    /// Stock `pool_depth` nodes of every size a handle can allocate. The
    /// root is built once per tree and never comes from a pool.
    pub fn prefill<V>(
        &mut self,
        vals: &Family<V>,
        keys: &Family<()>,
        uv: &Universes,
        root: u64,
        config: &Config,
    ) {
        for u in vals.sizes().into_iter().filter(|u| *u != root) {
            self.vals.fill(vals, uv, u, config.pool_depth);
        }
        for u in keys.sizes().into_iter() {
            self.keys.fill(keys, uv, u, config.pool_depth);
        }
    }

    /// Run the work queued by the last critical section. Must be called
    /// with the tree lock released.
    pub fn drain<V>(
        &mut self,
        vals: &Family<V>,
        keys: &Family<()>,
        uv: &Universes,
        config: &Config,
    ) -> DrainStats {
        let a = self.vals.drain(vals, uv, config);
        let b = self.keys.drain(keys, uv, config);
        let stats = DrainStats {
            built: a.built + b.built,
            recycled: a.recycled + b.recycled,
            destroyed: a.destroyed + b.destroyed,
        };
        if stats != DrainStats::default() {
            debug_log!(?stats, "drained node pools");
        }
        stats
    }

    /// Give every pooled node back to its arena.
    pub fn release<V>(&mut self, vals: &Family<V>, keys: &Family<()>) {
        self.vals.release(vals);
        self.keys.release(keys);
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
