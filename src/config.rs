use std::fmt;

use crate::{Error, Result};

/// Sentinel for an absent key, used for `min`/`max` of empty nodes.
pub const EMPTY: u64 = u64::MAX;

/// Largest universe a bitmap leaf can cover.
pub const MAX_CUTOFF: u64 = 64;

/// Largest universe power accepted by [Config::check_universe].
pub const MAX_UNIVERSE_POWER: u32 = 40;

/// Default leaf cutoff, universes of this size and below are bitmap leaves.
pub const CUTOFF: u64 = 64;
/// Default number of ready nodes kept per size, per thread.
pub const POOL_DEPTH: usize = 5;
/// Default multiplier over [POOL_DEPTH] for the reclaim high-water mark.
pub const POOL_GROW: usize = 2;
/// Default number of optimistic attempts before taking the fallback lock.
pub const MAX_RETRIES: usize = 35;
/// Default pause instructions per poll while the fallback lock is held.
pub const PAUSE_COUNT: usize = 2;

/// Tuning knobs for a tree, fixed when the tree is created and shared by
/// all its handles.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) cutoff: u64,
    pub(crate) pool_depth: usize,
    pub(crate) pool_grow: usize,
    pub(crate) max_retries: usize,
    pub(crate) pause_count: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            cutoff: CUTOFF,
            pool_depth: POOL_DEPTH,
            pool_grow: POOL_GROW,
            max_retries: MAX_RETRIES,
            pause_count: PAUSE_COUNT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Config<cutoff:{} pool:{}x{} retries:{} pause:{}>",
            self.cutoff, self.pool_depth, self.pool_grow, self.max_retries, self.pause_count
        )
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Universe size at and below which nodes are bitmap leaves. Must be a
    /// power of two between 2 and 64.
    pub fn set_cutoff(&mut self, cutoff: u64) -> &mut Self {
        self.cutoff = cutoff;
        self
    }

    /// Number of pre-built nodes each handle keeps for every node size.
    pub fn set_pool_depth(&mut self, depth: usize) -> &mut Self {
        self.pool_depth = depth;
        self
    }

    /// Reclaimed nodes are kept while a pool holds fewer than
    /// `pool_depth * grow` nodes, beyond that they are destroyed.
    pub fn set_pool_grow(&mut self, grow: usize) -> &mut Self {
        self.pool_grow = grow;
        self
    }

    /// Optimistic attempts per operation, zero runs every operation under
    /// the fallback lock.
    pub fn set_max_retries(&mut self, retries: usize) -> &mut Self {
        self.max_retries = retries;
        self
    }

    pub fn set_pause_count(&mut self, count: usize) -> &mut Self {
        self.pause_count = count;
        self
    }

    pub fn to_cutoff(&self) -> u64 {
        self.cutoff
    }

    pub fn to_max_retries(&self) -> usize {
        self.max_retries
    }

    pub(crate) fn high_water(&self) -> usize {
        self.pool_depth.saturating_mul(self.pool_grow)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.cutoff.is_power_of_two() || self.cutoff < 2 || self.cutoff > MAX_CUTOFF {
            let msg = format!("cutoff {} not a power of two in [2, 64]", self.cutoff);
            return Err(Error::InvalidConfig(msg));
        }
        if self.pool_grow == 0 {
            return Err(Error::InvalidConfig("pool_grow must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Universe must be a power of two, at least 2 and at most 2^40.
    pub(crate) fn check_universe(&self, universe: u64) -> Result<()> {
        let ok = universe.is_power_of_two()
            && universe >= 2
            && universe.trailing_zeros() <= MAX_UNIVERSE_POWER;
        match ok {
            true => Ok(()),
            false => Err(Error::InvalidUniverse(universe)),
        }
    }
}
