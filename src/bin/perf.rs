use dashmap::DashSet;
use parking_lot::Mutex;
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};
use structopt::StructOpt;

use std::{collections::BTreeSet, mem, sync::Arc, thread, time};

use vebtree::{Config, Stats, VebSet};

/// Command line options.
#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(long = "seed")]
    seed: Option<u64>,

    #[structopt(long = "universe", default_value = "32")] // 2^32 keys
    universe: u32,

    #[structopt(long = "loads", default_value = "1000000")] // default 1M
    loads: usize,

    #[structopt(long = "inserts", default_value = "0")]
    inserts: usize,

    #[structopt(long = "removes", default_value = "0")]
    removes: usize,

    #[structopt(long = "members", default_value = "0")]
    members: usize,

    #[structopt(long = "succs", default_value = "0")]
    succs: usize,

    #[structopt(long = "threads", default_value = "1")]
    threads: usize,

    #[structopt(long = "retries", default_value = "35")]
    max_retries: usize,

    #[structopt(long = "validate")]
    validate: bool,

    #[structopt(long = "btree")]
    btree_set: bool,

    #[structopt(long = "dashmap")]
    dash_set: bool,
}

impl Opt {
    fn to_universe(&self) -> u64 {
        1_u64.checked_shl(self.universe).unwrap_or(0)
    }

    fn to_ops(&self) -> usize {
        self.inserts + self.removes + self.members + self.succs
    }
}

enum Op {
    Insert(u64),
    Remove(u64),
    Member(u64),
    Succ(u64),
}

/// Generates the incremental load for one thread, op kinds drawn in
/// proportion to what is left of each.
struct Load {
    rng: SmallRng,
    universe: u64,
    counts: [usize; 4],
}

impl Iterator for Load {
    type Item = Op;

    fn next(&mut self) -> Option<Op> {
        let total: usize = self.counts.iter().sum();
        if total == 0 {
            return None;
        }

        let key = self.rng.gen::<u64>() % self.universe;
        let mut n = self.rng.gen::<usize>() % total;
        for (i, count) in self.counts.iter_mut().enumerate() {
            if n < *count {
                *count -= 1;
                return Some(match i {
                    0 => Op::Insert(key),
                    1 => Op::Remove(key),
                    2 => Op::Member(key),
                    _ => Op::Succ(key),
                });
            }
            n -= *count;
        }
        None
    }
}

impl Load {
    fn new(seed: u64, opts: &Opt) -> Load {
        Load {
            rng: SmallRng::seed_from_u64(seed),
            universe: opts.to_universe(),
            counts: [opts.inserts, opts.removes, opts.members, opts.succs],
        }
    }
}

fn main() {
    let opts = Opt::from_args();
    if opts.dash_set {
        dash_set(opts)
    } else if opts.btree_set {
        btree_set(opts)
    } else {
        veb_set(opts)
    }
}

fn veb_set(opts: Opt) {
    let seed = opts.seed.unwrap_or_else(random);
    let mut rng = SmallRng::seed_from_u64(seed);
    println!("seed {}", seed);

    let mut config = Config::new();
    config.set_max_retries(opts.max_retries);
    let mut set = match VebSet::with_config(opts.to_universe(), config) {
        Ok(set) => set,
        Err(err) => {
            println!("invalid options: {}", err);
            return;
        }
    };
    set.print_sizing();

    // initial load
    let start = time::Instant::now();
    for _i in 0..opts.loads {
        set.insert(rng.gen::<u64>() % opts.to_universe());
    }

    println!("loaded {} items in {:?}", set.len(), start.elapsed());

    let mut handles = vec![];
    for j in 0..opts.threads {
        let (opts, set) = (opts.clone(), set.cloned());
        let seed = seed + ((j as u64) * 100);
        let h = thread::spawn(move || veb_incremental(j, seed, opts, set));
        handles.push(h);
    }

    let mut stats = Stats::default();
    for handle in handles.into_iter() {
        stats = stats.merge(&handle.join().unwrap());
    }
    println!("{:?}", stats);

    if opts.validate {
        println!("{:?}", set.validate());
    }

    mem::drop(set)
}

fn veb_incremental(j: usize, seed: u64, opts: Opt, mut set: VebSet) -> Stats {
    let start = time::Instant::now();
    for op in Load::new(seed, &opts) {
        match op {
            Op::Insert(key) => set.insert(key),
            Op::Remove(key) => set.remove(key),
            Op::Member(key) => set.member(key),
            Op::Succ(key) => set.successor(key).is_some(),
        };
    }
    println!(
        "incremental-{} for operations {}, took {:?}",
        j,
        opts.to_ops(),
        start.elapsed()
    );
    set.stats()
}

fn btree_set(opts: Opt) {
    let seed = opts.seed.unwrap_or_else(random);
    let mut rng = SmallRng::seed_from_u64(seed);
    println!("seed {}", seed);

    let bset: Arc<Mutex<BTreeSet<u64>>> = Arc::new(Mutex::new(BTreeSet::new()));

    // initial load
    let start = time::Instant::now();
    for _i in 0..opts.loads {
        bset.lock().insert(rng.gen::<u64>() % opts.to_universe());
    }

    println!("loaded {} items in {:?}", bset.lock().len(), start.elapsed());

    let mut handles = vec![];
    for j in 0..opts.threads {
        let (opts, bset) = (opts.clone(), Arc::clone(&bset));
        let seed = seed + ((j as u64) * 100);
        let h = thread::spawn(move || btree_incremental(j, seed, opts, bset));
        handles.push(h);
    }

    for handle in handles.into_iter() {
        handle.join().unwrap()
    }
}

fn btree_incremental(j: usize, seed: u64, opts: Opt, bset: Arc<Mutex<BTreeSet<u64>>>) {
    let start = time::Instant::now();
    for op in Load::new(seed, &opts) {
        match op {
            Op::Insert(key) => bset.lock().insert(key),
            Op::Remove(key) => bset.lock().remove(&key),
            Op::Member(key) => bset.lock().contains(&key),
            Op::Succ(key) => bset.lock().range((key + 1)..).next().is_some(),
        };
    }
    println!(
        "incremental-{} for operations {}, took {:?}",
        j,
        opts.to_ops(),
        start.elapsed()
    );
}

fn dash_set(opts: Opt) {
    let seed = opts.seed.unwrap_or_else(random);
    let mut rng = SmallRng::seed_from_u64(seed);
    println!("seed {}", seed);

    let dset: Arc<DashSet<u64>> = Arc::new(DashSet::new());

    // initial load
    let start = time::Instant::now();
    for _i in 0..opts.loads {
        dset.insert(rng.gen::<u64>() % opts.to_universe());
    }

    println!("loaded {} items in {:?}", dset.len(), start.elapsed());

    let mut handles = vec![];
    for j in 0..opts.threads {
        let (opts, dset) = (opts.clone(), Arc::clone(&dset));
        let seed = seed + ((j as u64) * 100);
        let h = thread::spawn(move || dset_incremental(j, seed, opts, dset));
        handles.push(h);
    }

    for handle in handles.into_iter() {
        handle.join().unwrap()
    }
}

fn dset_incremental(j: usize, seed: u64, opts: Opt, dset: Arc<DashSet<u64>>) {
    let start = time::Instant::now();
    for op in Load::new(seed, &opts) {
        // unordered, successor degrades to a probe of the next key.
        match op {
            Op::Insert(key) => dset.insert(key),
            Op::Remove(key) => dset.remove(&key).is_some(),
            Op::Member(key) => dset.contains(&key),
            Op::Succ(key) => dset.contains(&(key + 1)),
        };
    }
    println!(
        "incremental-{} for operations {}, took {:?}",
        j,
        opts.to_ops(),
        start.elapsed()
    );
}
