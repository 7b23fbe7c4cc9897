//! Concurrent van Emde Boas trees over a bounded integer universe.
//!
//! [VebSet] stores keys, [VebMap] stores keys with values. Both answer
//! `member`, `insert`, `remove`, `successor` and `predecessor` in
//! `O(log log U)` for a universe of `U` keys.
//!
//! Trees are shared between threads through handles. Each thread works on
//! its own handle, created by cloning an existing one:
//!
//! ```
//! use vebtree::VebSet;
//!
//! let mut set = VebSet::new(1 << 20).unwrap();
//! let mut other = set.cloned();
//! let h = std::thread::spawn(move || other.insert(42));
//! assert!(h.join().unwrap());
//! assert_eq!(set.successor(0), Some(42));
//! ```
//!
//! Every operation runs inside a critical section that first tries an
//! optimistic, non-blocking entry and falls back to a global lock after a
//! bounded number of aborts, [Stats] counts both paths. Nodes are allocated
//! from per-handle pools that are replenished outside critical sections.

use std::{error, fmt, result};

#[macro_use]
mod logging;

mod arena;
mod check;
mod config;
mod leaf;
mod lock;
mod map;
mod node;
mod pool;
mod query;
mod set;
mod tree;
mod txn;
mod universe;
mod update;

pub use crate::check::Validate;
pub use crate::config::{Config, EMPTY, MAX_UNIVERSE_POWER};
pub use crate::map::VebMap;
pub use crate::set::VebSet;
pub use crate::txn::Stats;
pub use crate::universe::{divide, UniverseInfo};

/// Type alias for Result return type, used by this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that are returned by this package's API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Universe is not a power of two in `[2, 2^40]`.
    InvalidUniverse(u64),
    InvalidConfig(String),
    /// Reported by `validate()`, with the path to the offending node.
    Invariant(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidUniverse(u) => write!(f, "InvalidUniverse: {}", u),
            Error::InvalidConfig(msg) => write!(f, "InvalidConfig: {}", msg),
            Error::Invariant(msg) => write!(f, "Invariant: {}", msg),
        }
    }
}

impl error::Error for Error {}
