//! Tree lock.
//!
//! One word: bit 0 is the fallback bit, the remaining bits count readers
//! inside an optimistic section. Optimistic entry never waits, only the
//! fallback bit fails a reader and any other occupant fails a writer. The
//! fallback path spins until it owns the word exclusively.

use crossbeam_utils::{Backoff, CachePadded};

use std::{
    fmt,
    sync::atomic::{
        AtomicUsize,
        Ordering::{Acquire, Relaxed, Release},
    },
};

const FALLBACK: usize = 1;
const READER: usize = 2;

/// Access needed by an operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Access {
    /// Read-only, may share the tree with other readers.
    Shared,
    /// Mutating, needs the tree to itself.
    Exclusive,
}

pub struct TreeLock {
    word: CachePadded<AtomicUsize>,
}

impl Default for TreeLock {
    fn default() -> TreeLock {
        TreeLock {
            word: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

impl fmt::Debug for TreeLock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = self.word.load(Relaxed);
        write!(f, "TreeLock<held:{} readers:{}>", word & FALLBACK == FALLBACK, word / READER)
    }
}

impl TreeLock {
    pub fn new() -> TreeLock {
        TreeLock::default()
    }

    /// Enter without waiting. Fails if the fallback bit is set, or for
    /// [Access::Exclusive] if any reader is inside. Readers coming and going
    /// never fail a shared entry.
    pub fn try_begin(&self, access: Access) -> Option<Guard<'_>> {
        let ok = match access {
            Access::Shared => {
                let mut word = self.word.load(Relaxed);
                loop {
                    if word & FALLBACK == FALLBACK {
                        break false;
                    }
                    match self.word.compare_exchange_weak(word, word + READER, Acquire, Relaxed) {
                        Ok(_) => break true,
                        Err(current) => word = current,
                    }
                }
            }
            Access::Exclusive => self
                .word
                .compare_exchange(0, FALLBACK, Acquire, Relaxed)
                .is_ok(),
        };
        match ok {
            true => Some(Guard { lock: self, access }),
            false => None,
        }
    }

    /// Whether the fallback bit is set.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.word.load(Relaxed) & FALLBACK == FALLBACK
    }

    /// Take the lock exclusively, test-and-test-and-set on the fallback bit,
    /// then wait for readers already inside to leave.
    pub fn lock(&self) -> Guard<'_> {
        let backoff = Backoff::new();
        loop {
            let word = self.word.load(Relaxed);
            if word & FALLBACK == 0 {
                let res = self.word.compare_exchange_weak(word, word | FALLBACK, Acquire, Relaxed);
                if res.is_ok() {
                    break;
                }
            }
            backoff.snooze();
        }

        let backoff = Backoff::new();
        while self.word.load(Acquire) != FALLBACK {
            backoff.snooze();
        }

        Guard {
            lock: self,
            access: Access::Exclusive,
        }
    }
}

/// Held section, released on drop.
pub struct Guard<'a> {
    lock: &'a TreeLock,
    access: Access,
}

impl<'a> Guard<'a> {
    #[cfg(test)]
    pub fn to_access(&self) -> Access {
        self.access
    }
}

impl<'a> Drop for Guard<'a> {
    fn drop(&mut self) {
        match self.access {
            Access::Shared => self.lock.word.fetch_sub(READER, Release),
            Access::Exclusive => self.lock.word.fetch_and(!FALLBACK, Release),
        };
    }
}
