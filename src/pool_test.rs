use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{collections::BTreeMap, thread};

use super::*;
use crate::{tree::Tree, update::Mode};

#[test]
fn test_prefill() {
    let tree: Tree<u64> = Tree::new(1 << 20, Config::new()).unwrap();
    let pools = tree.to_pools();

    // root size is never pooled.
    assert_eq!(pools.vals.depth(1 << 20), 0);
    assert_eq!(pools.vals.depth(1024), 5);
    assert_eq!(pools.vals.depth(32), 5);
    assert_eq!(pools.keys.depth(1024), 5);
    assert_eq!(pools.keys.depth(32), 5);

    assert_eq!(tree.live("valued", 1 << 20), 1);
    assert_eq!(tree.live("valued", 1024), 5);
    assert_eq!(tree.live("key-only", 32), 5);
}

#[test]
fn test_refill_after_insert() {
    let mut tree: Tree<()> = Tree::new(1 << 20, Config::new()).unwrap();

    assert!(tree.insert(0, (), Mode::IfAbsent));
    // singleton root, nothing allocated.
    assert_eq!(tree.live("valued", 1024), 5);

    assert!(tree.insert(1 << 19, (), Mode::IfAbsent));
    // one cluster and one summary linked, pools back at depth.
    let pools = tree.to_pools();
    assert_eq!(pools.vals.depth(1024), 5);
    assert_eq!(pools.keys.depth(1024), 5);
    assert_eq!(tree.live("valued", 1024), 6);
    assert_eq!(tree.live("key-only", 1024), 6);
}

#[test]
fn test_reclaim_high_water() {
    let mut config = Config::new();
    config.set_pool_depth(2).set_pool_grow(1);
    let mut tree: Tree<()> = Tree::new(1 << 20, config).unwrap();

    let keys: Vec<u64> = (0..20).map(|i| i << 15).collect();
    for key in keys.iter() {
        assert!(tree.insert(*key, (), Mode::IfAbsent));
    }
    // 19 clusters of the root are linked.
    assert_eq!(tree.live("valued", 1024), 19 + 2);
    assert_eq!(tree.validate().unwrap().len, 20);

    for key in keys.iter() {
        assert!(tree.remove(*key));
    }
    assert!(tree.is_empty());

    // pools full, every other reclaimed node was destroyed.
    let pools = tree.to_pools();
    assert_eq!(pools.vals.depth(1024), 2);
    assert_eq!(tree.live("valued", 1024), 2);
    assert_eq!(tree.live("valued", 32), 2);
    assert_eq!(tree.live("key-only", 1024), 2);
    assert_eq!(tree.live("key-only", 32), 2);
}

#[test]
fn test_reclaim_recycles() {
    let mut tree: Tree<u64> = Tree::new(1 << 12, Config::new()).unwrap();

    assert!(tree.insert(1, 10, Mode::IfAbsent));
    assert!(tree.insert(4000, 20, Mode::IfAbsent));
    assert_eq!(tree.to_pools().vals.depth(64), 5);

    assert!(tree.remove(4000));
    // below the high-water mark, the emptied leaf is kept.
    assert_eq!(tree.to_pools().vals.depth(64), 6);
    assert_eq!(tree.live("valued", 64), 6);

    // and reused cleanly.
    assert!(tree.insert(4001, 30, Mode::IfAbsent));
    assert_eq!(tree.get(4001), Some(30));
    assert_eq!(tree.get(4000), None);
    tree.validate().unwrap();
}

#[test]
fn test_release_on_drop() {
    let tree: Tree<u64> = Tree::new(1 << 12, Config::new()).unwrap();
    assert_eq!(tree.live("valued", 64), 5);

    let other = tree.cloned();
    assert_eq!(other.to_id(), 1);
    assert_eq!(tree.live("valued", 64), 10);
    assert_eq!(tree.live("key-only", 64), 10);

    std::mem::drop(other);
    assert_eq!(tree.live("valued", 64), 5);
    assert_eq!(tree.live("key-only", 64), 5);
}

// pools stay dry, every node is built inside the critical section and
// every retired node is destroyed.
#[test]
fn test_dry_pools() {
    let seed: u64 = [7710293847561029384, random()][random::<usize>() % 2];
    // let seed: u64 = 7710293847561029384;
    let n_threads: u64 = 8;
    let universe: u64 = 1 << 12;
    let modul = universe / n_threads;
    println!("test_dry_pools seed:{}", seed);

    let mut config = Config::new();
    config.set_pool_depth(0).set_cutoff(4);
    let mut tree: Tree<u64> = Tree::new(universe, config).unwrap();

    let mut handles = vec![];
    for id in 0..n_threads {
        let mut tree = tree.cloned();
        let h = thread::spawn(move || {
            let mut rng = SmallRng::seed_from_u64(seed + (id * 100));
            let mut btmap: BTreeMap<u64, u64> = BTreeMap::new();
            let (lo, hi) = (id * modul, (id + 1) * modul);

            for i in 0..5_000 {
                let key = lo + (rng.gen::<u64>() % modul);
                match rng.gen::<u8>() % 4 {
                    0 | 1 => {
                        let val: u64 = rng.gen();
                        let ok = tree.insert(key, val, Mode::Upsert);
                        assert_eq!(ok, btmap.insert(key, val).is_none(), "key {}", key);
                    }
                    2 => assert_eq!(tree.remove(key), btmap.remove(&key).is_some(), "key {}", key),
                    _ => {
                        assert_eq!(tree.get(key), btmap.get(&key).cloned(), "key {}", key);
                        let next = btmap.range((key + 1)..hi).next().map(|(k, v)| (*k, *v));
                        if next.is_some() {
                            assert_eq!(tree.successor(key), next, "key {}", key);
                        }
                    }
                }
                if i % 500 == 0 {
                    for (_, u, _, _) in tree.footprint().into_iter() {
                        assert_eq!(tree.to_pools().vals.depth(u), 0, "size {}", u);
                        assert_eq!(tree.to_pools().keys.depth(u), 0, "size {}", u);
                    }
                }
            }
            btmap
        });
        handles.push(h);
    }

    let mut btmap: BTreeMap<u64, u64> = BTreeMap::new();
    for h in handles.into_iter() {
        btmap.extend(h.join().unwrap().into_iter());
    }
    assert_eq!(tree.validate().unwrap().len, btmap.len());
    for (key, val) in btmap.iter() {
        assert_eq!(tree.get(*key), Some(*val), "key {}", key);
    }

    let keys: Vec<u64> = btmap.keys().copied().collect();
    for key in keys.into_iter() {
        assert!(tree.remove(key), "key {}", key);
    }
    assert!(tree.is_empty());
    assert_eq!(tree.validate().unwrap().len, 0);

    // nothing pooled, nothing linked, only the root is left.
    for (fam, u, _, n) in tree.footprint().into_iter() {
        let want = if fam == "valued" && u == universe { 1 } else { 0 };
        assert_eq!(n, want, "{} size {}", fam, u);
    }
}
