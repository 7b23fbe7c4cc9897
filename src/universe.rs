//! Universe arithmetic.
//!
//! An internal node over universe `u = 2^p` is split into `2^upper`
//! clusters of `2^lower` keys each, where `lower = p / 2` and
//! `upper = p - lower`. Keys decompose into `(HIGH, LOW)` around that split.

use std::fmt;

/// Split of a universe into clusters, computed once per size.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UniverseInfo {
    /// Universe covered by each cluster, `2^lower`.
    pub cluster_size: u64,
    /// Number of clusters, `2^upper`, also the summary's universe.
    pub n_clusters: u64,
    pub low_bits: u32,
    pub high_bits: u32,
    pub low_mask: u64,
}

impl fmt::Debug for UniverseInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UniverseInfo<{}x{} bits:{}/{}>",
            self.n_clusters, self.cluster_size, self.high_bits, self.low_bits
        )
    }
}

impl UniverseInfo {
    #[inline]
    pub fn high(&self, x: u64) -> u64 {
        x >> self.low_bits
    }

    #[inline]
    pub fn low(&self, x: u64) -> u64 {
        x & self.low_mask
    }

    #[inline]
    pub fn index(&self, cluster: u64, offset: u64) -> u64 {
        (cluster << self.low_bits) | offset
    }

    pub fn universe(&self) -> u64 {
        self.cluster_size * self.n_clusters
    }
}

/// Split universe `u`, which must be a power of two.
pub fn divide(u: u64) -> UniverseInfo {
    debug_assert!(u.is_power_of_two(), "universe {} not a power of two", u);

    let p = u.trailing_zeros();
    let lower = p / 2;
    let upper = p - lower;
    UniverseInfo {
        cluster_size: 1 << lower,
        n_clusters: 1 << upper,
        low_bits: lower,
        high_bits: upper,
        low_mask: (1 << lower) - 1,
    }
}

/// Per-handle table of [UniverseInfo] for every size reachable from a root
/// universe. Indexed by the universe's power of two.
pub struct Universes {
    cutoff: u64,
    infos: [Option<UniverseInfo>; 64],
}

impl Universes {
    pub fn new(root: u64, cutoff: u64) -> Universes {
        let mut uv = Universes {
            cutoff,
            infos: [None; 64],
        };
        uv.populate(root);
        uv
    }

    fn populate(&mut self, u: u64) {
        let p = power(u);
        if self.infos[p].is_some() {
            return;
        }
        let info = divide(u);
        self.infos[p] = Some(info);
        if u > self.cutoff {
            self.populate(info.n_clusters);
            self.populate(info.cluster_size);
        }
    }

    #[inline]
    pub fn get(&self, u: u64) -> UniverseInfo {
        match self.infos[power(u)] {
            Some(info) => info,
            None => fatal!("universe {} missing from table", u),
        }
    }

    pub fn is_leaf(&self, u: u64) -> bool {
        u <= self.cutoff
    }

    /// Sizes held by this table, smallest first.
    #[cfg(test)]
    pub fn sizes(&self) -> Vec<u64> {
        let iter = self.infos.iter().enumerate();
        iter.filter_map(|(p, info)| info.map(|_| 1_u64 << p)).collect()
    }
}

#[inline]
pub(crate) fn power(u: u64) -> usize {
    u.trailing_zeros() as usize
}

/// Node sizes a tree allocates, by family. Clusters of value nodes carry
/// values, summaries and everything below a summary are key-only.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Layout {
    pub vals: Vec<u64>,
    pub keys: Vec<u64>,
}

impl Layout {
    pub fn new(root: u64, cutoff: u64) -> Layout {
        let mut layout = Layout::default();
        layout.walk(root, cutoff, true);
        layout.vals.sort_unstable();
        layout.keys.sort_unstable();
        layout
    }

    fn walk(&mut self, u: u64, cutoff: u64, valued: bool) {
        let sizes = if valued { &mut self.vals } else { &mut self.keys };
        if sizes.contains(&u) {
            return;
        }
        sizes.push(u);
        if u > cutoff {
            let info = divide(u);
            self.walk(info.cluster_size, cutoff, valued);
            self.walk(info.n_clusters, cutoff, false);
        }
    }
}

#[cfg(test)]
#[path = "universe_test.rs"]
mod universe_test;
