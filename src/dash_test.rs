use arbitrary::{self, unstructured::Unstructured, Arbitrary};
use dashmap::DashMap;
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
    thread,
};

use crate::{Config, Stats, VebSet};

macro_rules! test_code {
    ($seed:expr, $universe:expr, $max_retries:expr) => {{
        let mut rng = SmallRng::seed_from_u64($seed);

        let n_ops = [1_000, 10_000, 50_000][rng.gen::<usize>() % 3];
        let n_threads = [1, 2, 4, 8, 16][rng.gen::<usize>() % 5];
        // hot keys, every thread works over the same ones.
        let n_keys = std::cmp::min($universe, [16, 256, 4096][rng.gen::<usize>() % 3]);
        let stride = $universe / n_keys;

        println!(
            "test_dash_set seed:{} universe:{} ops:{} threads:{} keys:{} retries:{}",
            $seed, $universe, n_ops, n_threads, n_keys, $max_retries
        );

        let mut config = Config::new();
        config.set_max_retries($max_retries);
        let mut set = VebSet::with_config($universe, config).unwrap();
        set.print_sizing();
        // net successful inserts per key.
        let dmap: Arc<DashMap<u64, i64>> = Arc::new(DashMap::new());

        let mut handles = vec![];
        for id in 0..n_threads {
            let seed = $seed + ((id as u64) * 100);

            let (set, dmap) = (set.cloned(), Arc::clone(&dmap));
            let h = thread::spawn(move || with_dashmap(id, seed, n_keys, stride, n_ops, set, dmap));

            handles.push(h);
        }

        let mut stats = Stats::default();
        for handle in handles.into_iter() {
            stats = stats.merge(&handle.join().unwrap());
        }
        println!("{:?}", stats);
        assert_eq!(stats.to_ops(), n_threads * n_ops);

        let mut n = 0;
        for item in dmap.iter() {
            let (key, count) = item.pair();
            assert!(*count == 0 || *count == 1, "key {} count {}", key, count);
            assert_eq!(set.member(*key), *count == 1, "for key {}", key);
            n += *count as usize;
        }

        println!("len {}", set.len());
        assert_eq!(set.len(), n);
        println!("Validate .... {:?}", set.validate());
        assert_eq!(set.validate().unwrap().len, n);

        mem::drop(set);
        mem::drop(dmap);
    }};
}

#[test]
fn test_with_dash_set_small() {
    let seed: u64 = [10829384720934857211, random()][random::<usize>() % 2];
    // let seed: u64 = 10829384720934857211;

    test_code!(seed, 256_u64, 35);
}

#[test]
fn test_with_dash_set_large() {
    let seed: u64 = [10829384720934857211, random()][random::<usize>() % 2];
    // let seed: u64 = 10829384720934857211;

    test_code!(seed, 1_u64 << 32, 35);
}

#[test]
fn test_with_dash_set_locked() {
    let seed: u64 = [10829384720934857211, random()][random::<usize>() % 2];
    // let seed: u64 = 10829384720934857211;

    test_code!(seed, 1_u64 << 20, 0);
}

fn with_dashmap(
    id: usize,
    seed: u64,
    n_keys: u64,
    stride: u64,
    n_ops: usize,
    mut set: VebSet,
    dmap: Arc<DashMap<u64, i64>>,
) -> Stats {
    let mut rng = SmallRng::seed_from_u64(seed);
    let universe = set.universe();

    let mut counts = [[0_usize; 2]; 5];

    for _i in 0..n_ops {
        let bytes = rng.gen::<[u8; 32]>();
        let mut uns = Unstructured::new(&bytes);

        let mut op: Op = uns.arbitrary().unwrap();
        op = op.adjust_key(n_keys, stride);
        match op.clone() {
            Op::Insert(key) => {
                let ok = set.insert(key);
                if ok {
                    *dmap.entry(key).or_insert(0) += 1;
                }
                counts[0][0] += 1;
                counts[0][1] += if ok { 1 } else { 0 };
            }
            Op::Remove(key) => {
                let ok = set.remove(key);
                if ok {
                    *dmap.entry(key).or_insert(0) -= 1;
                }
                counts[1][0] += 1;
                counts[1][1] += if ok { 1 } else { 0 };
            }
            Op::Member(key) => {
                let ok = set.member(key);
                counts[2][0] += 1;
                counts[2][1] += if ok { 1 } else { 0 };
            }
            Op::Succ(key) => {
                let res = set.successor(key);
                if let Some(next) = res {
                    assert!(next > key && next < universe, "succ {} {}", key, next);
                }
                counts[3][0] += 1;
                counts[3][1] += if res.is_some() { 1 } else { 0 };
            }
            Op::Pred(key) => {
                let res = set.predecessor(key);
                if let Some(prev) = res {
                    assert!(prev < key, "pred {} {}", key, prev);
                }
                counts[4][0] += 1;
                counts[4][1] += if res.is_some() { 1 } else { 0 };
            }
        };
    }

    println!("{} counts {:?} {:?}", id, counts, set.stats());
    set.stats()
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Insert(u64),
    Remove(u64),
    Member(u64),
    Succ(u64),
    Pred(u64),
}

impl Op {
    fn adjust_key(self, n_keys: u64, stride: u64) -> Self {
        let adjust = |key: u64| (key % n_keys) * stride;
        match self {
            Op::Insert(key) => Op::Insert(adjust(key)),
            Op::Remove(key) => Op::Remove(adjust(key)),
            Op::Member(key) => Op::Member(adjust(key)),
            Op::Succ(key) => Op::Succ(adjust(key)),
            Op::Pred(key) => Op::Pred(adjust(key)),
        }
    }
}

#[test]
fn test_readers_with_writers() {
    let seed: u64 = [5512309481723094871, random()][random::<usize>() % 2];
    println!("test_readers_with_writers seed:{}", seed);

    let universe = 1_u64 << 24;
    let mut set = VebSet::new(universe).unwrap();
    // multiples of 4096 stay put, writers churn the keys in between.
    for key in (0..universe).step_by(1 << 12) {
        assert!(set.insert(key));
    }
    let fixed = set.len();

    let done = Arc::new(AtomicBool::new(false));
    let mut writers = vec![];
    for id in 0..4_u64 {
        let (mut set, done) = (set.cloned(), Arc::clone(&done));
        let h = thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(seed + id);
            let mut n = 0;
            while !done.load(SeqCst) || n < 1000 {
                let key = ((rng.gen::<u64>() % (universe >> 12)) << 12) | (1 + id);
                match rng.gen::<bool>() {
                    true => set.insert(key),
                    false => set.remove(key),
                };
                n += 1;
            }
            // clear out the churned keys.
            for key in set.to_vec().into_iter().filter(|k| k & 0xfff == 1 + id) {
                assert!(set.remove(key));
            }
            set.stats()
        });
        writers.push(h);
    }

    let mut readers = vec![];
    for id in 0..4_u64 {
        let mut set = set.cloned();
        let h = thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(seed + 100 + id);
            for _ in 0..20_000 {
                let key = (rng.gen::<u64>() % (universe >> 12)) << 12;
                assert!(set.member(key), "fixed key {}", key);
                // the next fixed key bounds every successor.
                let next = set.successor(key);
                let bound = key + (1 << 12);
                assert!(next.map(|n| n > key && n <= bound).unwrap_or(bound == universe));
                let prev = set.predecessor(key);
                assert!(prev.map(|p| p < key && p + (1 << 12) >= key).unwrap_or(key == 0));
            }
            set.stats()
        });
        readers.push(h);
    }

    let mut stats = Stats::default();
    for h in readers.into_iter() {
        stats = stats.merge(&h.join().unwrap());
    }
    done.store(true, SeqCst);
    for h in writers.into_iter() {
        stats = stats.merge(&h.join().unwrap());
    }
    println!("test_readers_with_writers {:?}", stats);

    assert_eq!(set.len(), fixed);
    assert_eq!(set.validate().unwrap().len, fixed);
}
