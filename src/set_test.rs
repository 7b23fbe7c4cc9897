use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::collections::BTreeSet;

use super::*;
use crate::Error;

#[test]
fn test_set_leaf_scenario() {
    let mut set = VebSet::new(16).unwrap();
    assert!(set.insert(3));
    assert!(set.insert(1));
    assert!(set.insert(7));
    assert_eq!((set.min(), set.max()), (Some(1), Some(7)));
    assert_eq!(set.successor(1), Some(3));
    assert_eq!(set.successor(3), Some(7));
    assert_eq!(set.successor(7), None);
    assert_eq!(set.predecessor(7), Some(3));
    assert!(!set.member(5));

    assert!(set.remove(1));
    assert!(!set.member(1));
    assert_eq!(set.min(), Some(3));
    assert_eq!(set.successor(3), Some(7));
    assert_eq!(set.len(), 2);
    set.validate().unwrap();
}

#[test]
fn test_set_internal_scenario() {
    let mut config = Config::new();
    config.set_cutoff(32);
    let mut set = VebSet::with_config(64, config).unwrap();
    assert_eq!(set.to_config().to_cutoff(), 32);

    assert!(set.insert(0));
    assert!(set.insert(63));
    assert_eq!((set.min(), set.max()), (Some(0), Some(63)));
    assert_eq!(set.successor(0), Some(63));
    assert_eq!(set.predecessor(63), Some(0));
    assert_eq!(set.successor(63), None);
    assert_eq!(set.predecessor(0), None);

    let stats = set.validate().unwrap();
    // root, one cluster and one summary.
    assert_eq!((stats.len, stats.internals, stats.leaves), (2, 1, 2));
}

#[test]
fn test_set_config_errors() {
    for u in [0_u64, 1, 3, 100, 1 << 41, u64::MAX].iter() {
        match VebSet::new(*u) {
            Err(Error::InvalidUniverse(x)) => assert_eq!(x, *u),
            res => panic!("universe {} {:?}", u, res.map(|_| ())),
        }
    }
    assert!(VebSet::new(2).is_ok());
    assert!(VebSet::new(1 << 40).is_ok());

    for cutoff in [0_u64, 1, 48, 128].iter() {
        let mut config = Config::new();
        config.set_cutoff(*cutoff);
        match VebSet::with_config(1024, config) {
            Err(Error::InvalidConfig(_)) => (),
            res => panic!("cutoff {} {:?}", cutoff, res.map(|_| ())),
        }
    }
}

#[test]
fn test_set_out_of_range() {
    let mut set = VebSet::new(256).unwrap();
    assert!(set.insert(10));
    assert!(set.insert(255));

    assert!(!set.member(256));
    assert!(!set.remove(1000));
    assert_eq!(set.successor(255), None);
    assert_eq!(set.successor(256), None);
    assert_eq!(set.predecessor(256), Some(255));
    assert_eq!(set.predecessor(u64::MAX), Some(255));
    assert_eq!(set.to_vec(), vec![10, 255]);
}

#[test]
#[should_panic]
fn test_set_insert_out_of_range() {
    let mut set = VebSet::new(256).unwrap();
    set.insert(256);
}

#[test]
fn test_set_idempotence() {
    let mut set = VebSet::new(1 << 16).unwrap();
    for key in [0_u64, 1, 100, 4095, 4096, 65535].iter() {
        assert!(set.insert(*key));
        assert!(!set.insert(*key));
        assert!(set.member(*key));
        assert!(set.remove(*key));
        assert!(!set.remove(*key));
        assert!(!set.member(*key));
    }
    assert!(set.is_empty());
    assert_eq!(set.min(), None);
    assert_eq!(set.validate().unwrap().len, 0);
}

#[test]
fn test_set_ops() {
    let seed: u64 = [8836271830219427361, random()][random::<usize>() % 2];
    // let seed: u64 = 8836271830219427361;
    let mut rng = SmallRng::seed_from_u64(seed);

    let universe = 1_u64 << [4, 6, 10, 16, 24, 40][rng.gen::<usize>() % 6];
    let n_ops = [1_000, 10_000, 100_000][rng.gen::<usize>() % 3];
    let cutoff = [2, 8, 64][rng.gen::<usize>() % 3];
    // dense keys for small universes, clustered keys for large ones.
    let n_keys = std::cmp::min(universe, 4096);
    println!(
        "test_set_ops seed:{} universe:{} cutoff:{} ops:{}",
        seed, universe, cutoff, n_ops
    );

    let mut config = Config::new();
    config.set_cutoff(cutoff);
    let mut set = VebSet::with_config(universe, config).unwrap();
    let mut btset: BTreeSet<u64> = BTreeSet::new();

    let mut counts = [[0_usize; 2]; 5];
    for i in 0..n_ops {
        let key = match rng.gen::<u8>() % 8 {
            0 => rng.gen::<u64>() % universe,
            _ => (rng.gen::<u64>() % n_keys) * (universe / n_keys),
        };
        let (op, ok) = match rng.gen::<u8>() % 5 {
            0 => {
                let ok = set.insert(key);
                assert_eq!(ok, btset.insert(key), "insert {}", key);
                (0, ok)
            }
            1 => {
                let ok = set.remove(key);
                assert_eq!(ok, btset.remove(&key), "remove {}", key);
                (1, ok)
            }
            2 => {
                let ok = set.member(key);
                assert_eq!(ok, btset.contains(&key), "member {}", key);
                (2, ok)
            }
            3 => {
                let succ = set.successor(key);
                assert_eq!(succ, btset.range((key + 1)..).next().copied(), "succ {}", key);
                (3, succ.is_some())
            }
            _ => {
                let pred = set.predecessor(key);
                assert_eq!(pred, btset.range(..key).next_back().copied(), "pred {}", key);
                (4, pred.is_some())
            }
        };
        counts[op][0] += 1;
        counts[op][1] += if ok { 1 } else { 0 };

        if i % 1009 == 0 {
            assert_eq!(set.min(), btset.iter().next().copied());
            assert_eq!(set.max(), btset.iter().next_back().copied());
            assert_eq!(set.validate().unwrap().len, btset.len());
        }
    }
    println!("test_set_ops counts {:?} stats {:?}", counts, set.stats());

    let stats = set.validate().unwrap();
    println!("Validate .... {:?}", stats);
    assert_eq!(stats.len, btset.len());
    assert_eq!(set.to_vec(), btset.iter().copied().collect::<Vec<u64>>());

    // round trip back to an empty tree.
    for key in btset.iter() {
        assert!(set.remove(*key), "key {}", key);
    }
    assert!(set.is_empty());
    assert_eq!((set.min(), set.max()), (None, None));
    assert_eq!(set.validate().unwrap().len, 0);
    assert_eq!(set.stats().fallbacks, 0);
}
