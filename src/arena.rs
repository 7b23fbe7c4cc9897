//! Segmented arena for tree nodes.
//!
//! Slots live in buckets of doubling size, bucket `k` holds `64 << k`
//! slots. A bucket is published once and never moves, so a [Handle] stays
//! valid while other threads allocate. Every slot carries a generation,
//! bumped whenever its node is recycled or destroyed.

use parking_lot::Mutex;

use std::{
    cell::UnsafeCell,
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering::Relaxed},
        OnceLock,
    },
};

const BASE: usize = 64;
const BUCKETS: usize = 32;

/// Typed index into an [Arena], tagged with the slot generation it was
/// issued for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.generation)
    }
}

#[cfg(test)]
impl Handle {
    pub fn to_index(&self) -> usize {
        self.index as usize
    }

    pub fn to_generation(&self) -> u32 {
        self.generation
    }
}

struct Slot<N> {
    generation: AtomicU32,
    node: UnsafeCell<Option<N>>,
}

impl<N> Slot<N> {
    fn new() -> Slot<N> {
        Slot {
            generation: AtomicU32::new(0),
            node: UnsafeCell::new(None),
        }
    }
}

/// Arena of nodes of one universe size and one kind.
pub struct Arena<N> {
    u: u64,
    buckets: Vec<OnceLock<Box<[Slot<N>]>>>,
    next: AtomicUsize,
    free: Mutex<Vec<u32>>,
    n_live: AtomicUsize,
}

// Node contents are only touched through the `unsafe` accessors below, whose
// callers hold the tree lock or own an unlinked slot.
unsafe impl<N: Send> Send for Arena<N> {}
unsafe impl<N: Send + Sync> Sync for Arena<N> {}

impl<N> Arena<N> {
    pub fn new(u: u64) -> Arena<N> {
        Arena {
            u,
            buckets: (0..BUCKETS).map(|_| OnceLock::new()).collect(),
            next: AtomicUsize::new(0),
            free: Mutex::new(Vec::default()),
            n_live: AtomicUsize::new(0),
        }
    }

    /// Universe size of nodes in this arena.
    pub fn to_universe(&self) -> u64 {
        self.u
    }

    /// Number of slots holding a node, pooled or linked.
    pub fn len(&self) -> usize {
        self.n_live.load(Relaxed)
    }

    /// Number of slots ever reserved, live or free.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.next.load(Relaxed)
    }

    /// Store `node` in a free slot and return its handle. The slot is
    /// exclusively owned by the caller until the handle is published.
    pub fn alloc(&self, node: N) -> Handle {
        let index = match self.free.lock().pop() {
            Some(index) => index as usize,
            None => self.next.fetch_add(1, Relaxed),
        };
        invariant!(index <= (u32::MAX as usize), "arena {} exhausted", self.u);

        let slot = self.slot_or_grow(index);
        // SAFETY: `index` came off the free list or the bump counter, no
        // other handle refers to it.
        unsafe { *slot.node.get() = Some(node) };
        self.n_live.fetch_add(1, Relaxed);

        Handle {
            index: index as u32,
            generation: slot.generation.load(Relaxed),
        }
    }

    /// Shared access to a node.
    ///
    /// # Safety
    ///
    /// No thread may hold a mutable reference to the same node.
    #[inline]
    pub unsafe fn get(&self, handle: Handle) -> &N {
        let slot = self.slot(handle);
        match &*slot.node.get() {
            Some(node) => node,
            None => fatal!("arena {} slot {:?} is vacant", self.u, handle),
        }
    }

    /// Exclusive access to a node.
    ///
    /// # Safety
    ///
    /// Caller holds the tree lock exclusively, or owns the node as an
    /// unlinked pool entry, and does not hold another reference to it.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self, handle: Handle) -> &mut N {
        let slot = self.slot(handle);
        match &mut *slot.node.get() {
            Some(node) => node,
            None => fatal!("arena {} slot {:?} is vacant", self.u, handle),
        }
    }

    /// Re-issue an unlinked node under a new generation, old handles to it
    /// go stale.
    ///
    /// # Safety
    ///
    /// Caller owns the node, it is not reachable from any tree.
    pub unsafe fn renew(&self, handle: Handle) -> Handle {
        let slot = self.slot(handle);
        let generation = slot.generation.fetch_add(1, Relaxed).wrapping_add(1);
        Handle {
            index: handle.index,
            generation,
        }
    }

    /// Destroy an unlinked node and return its slot to the free list.
    ///
    /// # Safety
    ///
    /// Caller owns the node, it is not reachable from any tree.
    pub unsafe fn free(&self, handle: Handle) {
        let slot = self.slot(handle);
        slot.generation.fetch_add(1, Relaxed);
        let node = (*slot.node.get()).take();
        self.n_live.fetch_sub(1, Relaxed);
        self.free.lock().push(handle.index);
        std::mem::drop(node);
    }

    #[inline]
    fn slot(&self, handle: Handle) -> &Slot<N> {
        let (k, off) = locate(handle.index as usize);
        let slot = match self.buckets[k].get() {
            Some(bucket) => &bucket[off],
            None => fatal!("arena {} handle {:?} beyond storage", self.u, handle),
        };
        debug_assert_eq!(
            slot.generation.load(Relaxed),
            handle.generation,
            "stale handle {:?} in arena {}",
            handle,
            self.u
        );
        slot
    }

    fn slot_or_grow(&self, index: usize) -> &Slot<N> {
        let (k, off) = locate(index);
        let bucket = self.buckets[k].get_or_init(|| (0..(BASE << k)).map(|_| Slot::new()).collect());
        &bucket[off]
    }
}

/// Bucket and offset for a slot index.
#[inline]
fn locate(index: usize) -> (usize, usize) {
    let j = index / BASE + 1;
    let k = (usize::BITS - 1 - j.leading_zeros()) as usize;
    let start = BASE * ((1 << k) - 1);
    (k, index - start)
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
