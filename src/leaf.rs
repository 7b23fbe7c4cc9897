//! Operations on bitmap leaves.

use crate::{config::EMPTY, node::Leaf, update::Mode};

impl<V> Leaf<V> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min == EMPTY
    }

    #[inline]
    pub fn member(&self, x: u64) -> bool {
        x == self.min || x == self.max || (x < 64 && (self.bitmap & (1 << x)) != 0)
    }

    pub fn get(&self, x: u64) -> Option<V>
    where
        V: Clone,
    {
        if x == self.min {
            self.min_val.clone()
        } else if x < 64 && (self.bitmap & (1 << x)) != 0 {
            Some(present(&self.vals[x as usize], x))
        } else {
            None
        }
    }

    /// Smallest key and its value.
    pub fn first(&self) -> Option<(u64, V)>
    where
        V: Clone,
    {
        match self.min {
            EMPTY => None,
            min => Some((min, present(&self.min_val, min))),
        }
    }

    /// Largest key and its value.
    pub fn last(&self) -> Option<(u64, V)>
    where
        V: Clone,
    {
        match self.max {
            EMPTY => None,
            max if max == self.min => Some((max, present(&self.min_val, max))),
            max => Some((max, present(&self.vals[max as usize], max))),
        }
    }

    pub fn successor(&self, x: u64) -> Option<(u64, V)>
    where
        V: Clone,
    {
        if self.min == EMPTY {
            return None;
        } else if x < self.min {
            return self.first();
        } else if x >= self.max {
            return None;
        }

        // x < max <= 63
        match self.bitmap & (u64::MAX << (x + 1)) {
            0 => None,
            bits => {
                let k = bits.trailing_zeros() as u64;
                Some((k, present(&self.vals[k as usize], k)))
            }
        }
    }

    pub fn predecessor(&self, x: u64) -> Option<(u64, V)>
    where
        V: Clone,
    {
        if self.min == EMPTY || x <= self.min {
            return None;
        } else if x > self.max {
            return self.last();
        }

        match self.bitmap & !(u64::MAX << x) {
            0 => self.first(),
            bits => {
                let k = 63 - (bits.leading_zeros() as u64);
                Some((k, present(&self.vals[k as usize], k)))
            }
        }
    }

    /// Insert `x`, or with [Mode::Upsert] overwrite the value of an
    /// existing `x`. Return whether `x` was newly added.
    pub fn insert(&mut self, x: u64, val: V, mode: Mode) -> bool {
        if x == self.min {
            if let Mode::Upsert = mode {
                self.min_val = Some(val);
            }
            return false;
        } else if self.min == EMPTY {
            self.min = x;
            self.max = x;
            self.min_val = Some(val);
            return true;
        }

        let (mut x, mut val) = (x, val);
        if x < self.min {
            std::mem::swap(&mut x, &mut self.min);
            val = match self.min_val.replace(val) {
                Some(val) => val,
                None => fatal!("leaf min {} without value", x),
            };
        }

        let bit = 1_u64 << x;
        let inserted = (self.bitmap & bit) == 0;
        if inserted || matches!(mode, Mode::Upsert) {
            self.bitmap |= bit;
            self.vals[x as usize] = Some(val);
        }
        if x > self.max {
            self.max = x;
        }
        inserted
    }

    /// Insert `x` into an empty leaf.
    pub fn seed(&mut self, x: u64, val: V) {
        debug_assert!(self.is_empty(), "seed into non-empty leaf");
        self.min = x;
        self.max = x;
        self.min_val = Some(val);
    }

    /// Remove `x`, return whether it was present.
    pub fn remove(&mut self, x: u64) -> bool {
        if self.min == EMPTY || x < self.min || x > self.max {
            return false;
        } else if self.min == self.max {
            self.min = EMPTY;
            self.max = EMPTY;
            self.min_val = None;
            return true;
        } else if x == self.min {
            // promote the smallest bitmap key.
            let k = self.bitmap.trailing_zeros() as u64;
            self.bitmap &= !(1 << k);
            self.min = k;
            self.min_val = self.vals[k as usize].take();
            return true;
        }

        let bit = 1_u64 << x;
        if (self.bitmap & bit) == 0 {
            return false;
        }
        self.bitmap &= !bit;
        self.vals[x as usize] = None;
        if x == self.max {
            self.max = match self.bitmap {
                0 => self.min,
                bits => 63 - (bits.leading_zeros() as u64),
            };
        }
        true
    }

    /// Number of keys.
    pub fn count(&self) -> usize {
        match self.min {
            EMPTY => 0,
            _ => 1 + (self.bitmap.count_ones() as usize),
        }
    }
}

#[inline]
pub(crate) fn present<V: Clone>(val: &Option<V>, x: u64) -> V {
    match val {
        Some(val) => val.clone(),
        None => fatal!("key {} present without value", x),
    }
}

#[cfg(test)]
#[path = "leaf_test.rs"]
mod leaf_test;
