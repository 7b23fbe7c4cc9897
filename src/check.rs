//! Structural validation of a tree.

use crate::{
    config::EMPTY,
    node::NodeRef,
    query::{self, View},
    Error, Result,
};

/// Shape of a validated tree.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Validate {
    /// Number of keys.
    pub len: usize,
    /// Leaves reachable from the root, summaries included.
    pub leaves: usize,
    /// Internal nodes reachable from the root, summaries included.
    pub internals: usize,
    /// Longest root-to-leaf path, in nodes.
    pub depth: usize,
}

macro_rules! check {
    ($cond:expr, $path:expr, $($arg:tt)+) => {
        if !$cond {
            let msg = format!($($arg)+);
            return Err(Error::Invariant(format!("{}: {}", $path, msg)));
        }
    };
}

pub fn validate<V>(v: View<V>, u: u64, node: NodeRef, path: &str) -> Result<Validate> {
    match node {
        NodeRef::Leaf(h) => {
            let n = v.leaf(u, h);
            let mut stats = Validate {
                len: n.count(),
                leaves: 1,
                internals: 0,
                depth: 1,
            };
            if n.min == EMPTY {
                check!(n.max == EMPTY, path, "empty leaf with max {}", n.max);
                check!(n.bitmap == 0, path, "empty leaf with bitmap {:x}", n.bitmap);
                check!(n.min_val.is_none(), path, "empty leaf with min value");
                stats.len = 0;
                return Ok(stats);
            }

            check!(n.min <= n.max && n.max < u, path, "min {} max {} u {}", n.min, n.max, u);
            check!(n.min_val.is_some(), path, "min {} without value", n.min);
            check!(u == 64 || (n.bitmap >> u) == 0, path, "bits beyond universe {}", u);
            check!((n.bitmap >> n.min) & 1 == 0, path, "min {} in bitmap", n.min);
            if n.min == n.max {
                check!(n.bitmap == 0, path, "singleton {} with bitmap {:x}", n.min, n.bitmap);
            } else {
                check!(n.bitmap != 0, path, "min {} max {} with empty bitmap", n.min, n.max);
                let (lo, hi) = (n.bitmap.trailing_zeros(), 63 - n.bitmap.leading_zeros());
                check!(u64::from(hi) == n.max, path, "max {} top bit {}", n.max, hi);
                check!(u64::from(lo) > n.min, path, "min {} above bit {}", n.min, lo);
            }
            for (x, val) in n.vals.iter().enumerate() {
                let bit = (n.bitmap >> x) & 1 == 1;
                check!(val.is_some() == bit, path, "value slot {} out of step with bitmap", x);
            }
            Ok(stats)
        }
        NodeRef::Internal(h) => {
            let n = v.internal(u, h);
            let info = v.info(u);
            let mut stats = Validate {
                len: 0,
                leaves: 0,
                internals: 1,
                depth: 1,
            };

            if n.min == EMPTY || n.min == n.max {
                let ok = n.min != EMPTY || (n.max == EMPTY && n.min_val.is_none());
                check!(ok, path, "empty node with max {}", n.max);
                check!(n.summary.is_none(), path, "node of <= 1 key has a summary");
                let ok = n.clusters.iter().all(Option::is_none);
                check!(ok, path, "node of <= 1 key has clusters");
                if n.min != EMPTY {
                    check!(n.min < u, path, "min {} outside universe {}", n.min, u);
                    check!(n.min_val.is_some(), path, "min {} without value", n.min);
                    stats.len = 1;
                }
                return Ok(stats);
            }

            check!(n.min < n.max && n.max < u, path, "min {} max {} u {}", n.min, n.max, u);
            check!(n.min_val.is_some(), path, "min {} without value", n.min);
            let summary = match n.summary {
                Some(summary) => summary,
                None => return Err(Error::Invariant(format!("{}: missing summary", path))),
            };

            let spath = format!("{}/summary", path);
            let sstats = validate(v.keys(), info.n_clusters, summary, &spath)?;
            stats.leaves += sstats.leaves;
            stats.internals += sstats.internals;
            stats.depth = sstats.depth + 1;

            let (mut len, mut n_clusters, mut top) = (1, 0, EMPTY);
            for (c, slot) in n.clusters.iter().enumerate() {
                let c = c as u64;
                let listed = query::member(v.keys(), info.n_clusters, summary, c);
                let child = match slot {
                    Some(child) => *child,
                    None => {
                        check!(!listed, path, "summary lists absent cluster {}", c);
                        continue;
                    }
                };
                check!(listed, path, "summary misses cluster {}", c);

                let cpath = format!("{}/{}", path, c);
                let cstats = validate(v, info.cluster_size, child, &cpath)?;
                check!(cstats.len > 0, cpath, "allocated cluster is empty");

                let (cmin, cmax) = query::bounds(v, info.cluster_size, child);
                check!(info.index(c, cmin) > n.min, cpath, "key below min {}", n.min);
                top = info.index(c, cmax);
                len += cstats.len;
                n_clusters += 1;
                stats.leaves += cstats.leaves;
                stats.internals += cstats.internals;
                stats.depth = stats.depth.max(cstats.depth + 1);
            }

            check!(n_clusters == sstats.len, path, "summary holds {} keys", sstats.len);
            check!(top == n.max, path, "max {} but largest clustered key {}", n.max, top);
            stats.len = len;
            Ok(stats)
        }
    }
}

#[cfg(test)]
#[path = "check_test.rs"]
mod check_test;
