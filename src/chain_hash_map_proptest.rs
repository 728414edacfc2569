#![cfg(test)]

// Model-based property tests for ChainHashMap, kept inside the crate so
// they can check the chain-run invariants after every step.

use crate::chain_hash_map::{ChainHashMap, Handle};
use crate::config::MapConfig;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Operations index into a small key pool so shrinking converges on few keys.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    InsertWith(usize, i32),
    GetOrDefault(usize),
    // `true` removes by key, `false` by handle.
    Remove(usize, bool),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    Reserve(usize),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=10).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::InsertWith(i, v)),
            1 => idx.clone().prop_map(Op::GetOrDefault),
            3 => (idx.clone(), any::<bool>()).prop_map(|(i, by_key)| Op::Remove(i, by_key)),
            2 => idx.clone().prop_map(Op::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(Op::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => (0usize..40).prop_map(Op::Rehash),
            1 => (0usize..40).prop_map(Op::Reserve),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// A record just linked never leaves the load above the threshold. Without
// an insert, a manual rehash may have left it higher.
fn check_load<S>(sut: &ChainHashMap<Key, i32, S>, inserted: bool) -> Result<(), TestCaseError> {
    if inserted {
        prop_assert!(
            sut.load_factor() <= sut.max_load_factor(),
            "load {} over {} with {} buckets",
            sut.load_factor(),
            sut.max_load_factor(),
            sut.bucket_count()
        );
    }
    Ok(())
}

// State-machine equivalence against std::collections::HashMap.
// Checked after every op:
// - chain runs are contiguous, slots point at run heads, cached buckets are current;
// - every live handle resolves to the model's value, stale handles never resolve;
// - len parity with the model;
// - inserts keep the load at or below max_load_factor.
fn run_scenario<S: BuildHasher>(
    mut sut: ChainHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let (h, inserted) = sut.insert(k.clone(), v);
                prop_assert_eq!(inserted, !already);
                check_load(&sut, inserted)?;
                if inserted {
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            Op::InsertWith(i, v) => {
                let k = key_from(pool, i);
                let already = model.contains_key(&k);
                let mut ran = false;
                let (h, inserted) = sut.insert_with(k.clone(), || {
                    ran = true;
                    v
                });
                prop_assert_eq!(inserted, !already);
                prop_assert_eq!(ran, inserted, "value built only on insert");
                check_load(&sut, inserted)?;
                if inserted {
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                }
            }
            Op::GetOrDefault(i) => {
                let k = key_from(pool, i);
                let got = *sut.get_or_insert_default(k.clone());
                check_load(&sut, !model.contains_key(&k))?;
                let expected = *model.entry(k.clone()).or_default();
                prop_assert_eq!(got, expected);
                if !live.contains_key(&k) {
                    let h = sut.find(&k).expect("inserted by get_or_insert_default");
                    live.insert(k, h);
                }
            }
            Op::Remove(i, true) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_key(k.0.as_str()), model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            Op::Remove(i, false) => {
                let k = key_from(pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove(h).expect("live handle removes");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&kk));
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                }
            }
            Op::Find(i) => {
                let k = key_from(pool, i);
                let found = sut.find(&k);
                prop_assert_eq!(found, live.get(&k).copied());
            }
            Op::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            Op::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = h.value_mut(&mut sut).expect("live handle resolves");
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("model has live key");
                    *mv = mv.saturating_add(d);
                }
            }
            Op::Rehash(n) => {
                let before: BTreeSet<(Key, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                sut.rehash(n);
                prop_assert_eq!(sut.bucket_count(), n.max(1));
                let after: BTreeSet<(Key, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(before, after);
            }
            Op::Reserve(n) => {
                sut.reserve(n);
            }
            Op::Iterate => {
                let s_items: BTreeSet<(Key, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m_items: BTreeSet<(Key, i32)> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s_items, m_items);
            }
        }

        sut.assert_chain_invariants();
        for (k, h) in &live {
            prop_assert_eq!(h.key(&sut), Some(k));
            prop_assert_eq!(h.value(&sut), model.get(k));
        }
        for h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(ChainHashMap::new(), &pool, ops)?;
    }

    // A high load factor lets chains grow long before each resize.
    #[test]
    fn prop_state_machine_long_chains((pool, ops) in arb_scenario()) {
        let config = MapConfig::default().with_buckets(1).with_max_load_factor(8.0);
        let sut = ChainHashMap::with_config(config, std::collections::hash_map::RandomState::new())
            .expect("valid config");
        run_scenario(sut, &pool, ops)?;
    }
}

// Constant hasher: every key lands in one chain, stressing equality walks.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(ChainHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
