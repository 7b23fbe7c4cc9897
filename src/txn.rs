//! Critical-section driver with lock elision.
//!
//! An operation first tries to enter the tree optimistically, aborting
//! instead of waiting on conflict. After an abort it waits for the fallback
//! lock to clear and retries, until its retry budget runs out and it takes
//! the fallback lock like any other mutex.
//!
//! ```text
//!  AttemptTxn --entered--> Committed
//!      |  ^
//!  abort  | retries left
//!      v  |
//!  AbortedRetry --budget spent--> AbortedFallback --locked--> Committed
//! ```

use std::{fmt, hint};

use crate::{
    config::Config,
    lock::{Access, Guard, TreeLock},
};

/// Driver state for one operation, entering the section commits it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TxState {
    AttemptTxn,
    AbortedRetry,
    AbortedFallback,
}

/// Per-handle driver counters.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Optimistic entries tried.
    pub attempts: usize,
    /// Operations that completed on the optimistic path.
    pub commits: usize,
    /// Optimistic entries that aborted.
    pub aborts: usize,
    /// Operations that completed under the fallback lock.
    pub fallbacks: usize,
}

impl fmt::Debug for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Stats<attempts:{} commits:{} aborts:{} fallbacks:{}>",
            self.attempts, self.commits, self.aborts, self.fallbacks
        )
    }
}

impl Stats {
    pub fn merge(&self, other: &Stats) -> Stats {
        Stats {
            attempts: self.attempts + other.attempts,
            commits: self.commits + other.commits,
            aborts: self.aborts + other.aborts,
            fallbacks: self.fallbacks + other.fallbacks,
        }
    }

    /// Number of completed operations.
    pub fn to_ops(&self) -> usize {
        self.commits + self.fallbacks
    }
}

/// Run `body` inside the tree's critical section and return its result.
/// `body` runs exactly once, on whichever path entered.
pub fn critical<R, F>(lock: &TreeLock, config: &Config, access: Access, stats: &mut Stats, body: F) -> R
where
    F: FnOnce() -> R,
{
    let mut retries = config.max_retries;
    let mut state = match retries {
        0 => TxState::AbortedFallback,
        _ => TxState::AttemptTxn,
    };

    let guard: Guard<'_> = loop {
        state = match state {
            TxState::AttemptTxn => {
                stats.attempts += 1;
                match lock.try_begin(access) {
                    Some(guard) => {
                        stats.commits += 1;
                        break guard;
                    }
                    None => {
                        stats.aborts += 1;
                        TxState::AbortedRetry
                    }
                }
            }
            TxState::AbortedRetry => {
                while lock.is_locked() {
                    pause(config.pause_count);
                }
                retries -= 1;
                trace_log!(retries, "optimistic entry aborted");
                match retries {
                    0 => TxState::AbortedFallback,
                    _ => TxState::AttemptTxn,
                }
            }
            TxState::AbortedFallback => {
                trace_log!(?access, "retries exhausted, taking fallback lock");
                let guard = lock.lock();
                stats.fallbacks += 1;
                break guard;
            }
        };
    };

    let res = body();
    std::mem::drop(guard);
    res
}

#[inline]
fn pause(count: usize) {
    for _ in 0..count.max(1) {
        hint::spin_loop()
    }
}

#[cfg(test)]
#[path = "txn_test.rs"]
mod txn_test;
