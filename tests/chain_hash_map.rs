// ChainHashMap integration tests (public API only).
//
// Each test notes what behavior is verified. Core properties exercised:
// - Round-trip: insert then lookup returns the value; remove then lookup
//   reports not-found.
// - Idempotent upsert: a second insert of the same key keeps the first
//   value and reports "not inserted".
// - Bucket layout: records of one bucket form one contiguous chain,
//   headed by the most recent insert.
// - Growth: exceeding the load factor resizes the table and keeps every
//   key reachable.
// - Copy/move: clones are independent; a moved-from map is empty and usable.
// - Load bound: after any insert the load factor stays within the map's
//   own threshold, whatever that threshold is.
use chain_hashmap::{ChainHashMap, MapConfig, MapError};
use std::collections::BTreeSet;
use std::hash::{BuildHasher, Hasher};

// Hashes integer keys to themselves so bucket placement is predictable.
#[derive(Clone, Default)]
struct IdentityBuildHasher;
struct IdentityHasher(u64);
impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> Self::Hasher {
        IdentityHasher(0)
    }
}
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(b as u64);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

fn chain(m: &ChainHashMap<u64, char, IdentityBuildHasher>, bucket: usize) -> Vec<char> {
    m.bucket_entries(bucket).map(|(_, v)| *v).collect()
}

// Test: round-trip through insert, lookup and remove.
#[test]
fn insert_find_remove_round_trip() {
    let mut m = ChainHashMap::new();
    let (h, inserted) = m.insert("k1".to_string(), 42);
    assert!(inserted);
    assert_eq!(m.get("k1"), Some(&42));
    assert_eq!(m.find("k1"), Some(h));

    assert_eq!(m.remove(h), Some(("k1".to_string(), 42)));
    assert_eq!(m.get("k1"), None);
    assert!(m.find("k1").is_none());
    assert!(m.is_empty());
}

// Test: unique keys.
// Verifies: the second insert reports "not inserted" and the first value stays.
#[test]
fn second_insert_of_same_key_is_a_no_op() {
    let mut m = ChainHashMap::new();
    assert!(m.insert("dup", 1).1);
    assert!(!m.insert("dup", 2).1);
    assert_eq!(m["dup"], 1);
    assert_eq!(m.len(), 1);
}

// Test: chain layout with a 2-bucket table.
// Assumes: identity hashing, keys 0..4 map to buckets {0,1,0,1}.
// Verifies: each bucket's chain holds exactly its keys; growth keeps all keys.
#[test]
fn two_bucket_scenario_then_growth() {
    let config = MapConfig::default()
        .with_buckets(2)
        .with_max_load_factor(2.0);
    let mut m = ChainHashMap::with_config(config, IdentityBuildHasher).unwrap();
    for (k, v) in [(0u64, 'A'), (1, 'B'), (2, 'C'), (3, 'D')] {
        m.insert(k, v);
    }
    assert_eq!(m.bucket_count(), 2);
    assert_eq!(chain(&m, 0), vec!['C', 'A']);
    assert_eq!(chain(&m, 1), vec!['D', 'B']);
    assert_eq!(m.bucket(&0), 0);
    assert_eq!(m.bucket(&3), 1);

    // Contiguity: sequence order is the concatenation of the two chains.
    let order: Vec<char> = m.values().copied().collect();
    assert_eq!(order, vec!['C', 'A', 'D', 'B']);

    m.insert(4, 'E');
    assert!(m.bucket_count() > 2);
    for (k, v) in [(0u64, 'A'), (1, 'B'), (2, 'C'), (3, 'D'), (4, 'E')] {
        assert_eq!(m.get(&k), Some(&v));
    }
}

// Test: growth under non-default load factors.
// Verifies: every insert leaves load_factor() <= max_load_factor(), and the
// bucket count never shrinks on its own.
#[test]
fn growth_respects_custom_load_factor() {
    for (buckets, mlf) in [(2, 4.0f32), (1, 8.0), (3, 0.25)] {
        let config = MapConfig::default()
            .with_buckets(buckets)
            .with_max_load_factor(mlf);
        let mut m = ChainHashMap::with_config(config, IdentityBuildHasher).unwrap();
        let mut last = m.bucket_count();
        for k in 0..500u64 {
            m.insert(k, k);
            assert!(m.load_factor() <= mlf, "mlf {mlf}: load {} at len {}", m.load_factor(), m.len());
            assert!(m.bucket_count() >= last);
            last = m.bucket_count();
        }
        assert!(m.bucket_count() > buckets);
        for k in 0..500u64 {
            assert_eq!(m.get(&k), Some(&k));
        }
    }
}

// Test: size accounting across inserts, duplicates and removals.
#[test]
fn len_counts_successful_inserts_minus_removes() {
    let mut m: ChainHashMap<u32, u32> = ChainHashMap::new();
    let mut expected = 0usize;
    for i in 0..200u32 {
        if m.insert(i % 150, i).1 {
            expected += 1;
        }
    }
    assert_eq!(m.len(), expected);
    for i in (0..150u32).step_by(3) {
        if m.remove_key(&i).is_some() {
            expected -= 1;
        }
    }
    assert_eq!(m.len(), expected);
    assert_eq!(m.remove_key(&0), None);
    assert_eq!(m.len(), expected);
}

// Test: rehash preserves contents.
#[test]
fn rehash_and_reserve_preserve_contents() {
    let mut m: ChainHashMap<String, usize> = (0..64).map(|i| (format!("k{i}"), i)).collect();
    let before: BTreeSet<(String, usize)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
    m.rehash(3);
    assert_eq!(m.bucket_count(), 3);
    m.reserve(500);
    assert!(m.bucket_count() > 500);
    let after: BTreeSet<(String, usize)> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
    assert_eq!(before, after);
}

// Test: strict vs upsert access.
// Verifies: `at` errors on absent keys, `get_or_insert_default` never does.
#[test]
fn strict_and_upsert_access() {
    let mut m: ChainHashMap<&str, u32> = ChainHashMap::new();
    assert_eq!(m.at("x"), Err(MapError::MissingKey));
    *m.get_or_insert_default("x") += 5;
    *m.get_or_insert_default("x") += 5;
    assert_eq!(m.at("x"), Ok(&10));
    assert_eq!(MapError::MissingKey.to_string(), "key not present in map");
}

// Test: config validation surfaces as errors.
#[test]
fn invalid_config_is_rejected() {
    let zero = MapConfig::default().with_buckets(0);
    assert!(matches!(
        ChainHashMap::<u32, u32, _>::with_config(zero, IdentityBuildHasher),
        Err(MapError::ZeroBuckets)
    ));
    let bad = MapConfig::default().with_max_load_factor(-0.5);
    assert!(matches!(
        ChainHashMap::<u32, u32, _>::with_config(bad, IdentityBuildHasher),
        Err(MapError::InvalidLoadFactor(_))
    ));
    let tiny = MapConfig::default().with_max_load_factor(1e-30);
    assert!(matches!(
        ChainHashMap::<u32, u32, _>::with_config(tiny, IdentityBuildHasher),
        Err(MapError::InvalidLoadFactor(_))
    ));
    // The infallible constructor clamps instead.
    assert_eq!(ChainHashMap::<u32, u32>::with_buckets(0).bucket_count(), 1);
}

// Test: copy and move semantics.
#[test]
fn clone_is_independent_and_take_leaves_empty() {
    let mut m: ChainHashMap<u32, String> = (0..10).map(|i| (i, i.to_string())).collect();
    let copy = m.clone();
    m.get_mut(&1).unwrap().push('!');
    m.remove_key(&2);
    assert_eq!(copy.get(&1).map(String::as_str), Some("1"));
    assert_eq!(copy.get(&2).map(String::as_str), Some("2"));
    assert_eq!(copy.len(), 10);

    let moved = std::mem::take(&mut m);
    assert!(m.is_empty());
    assert_eq!(moved.len(), 9);
    assert_eq!(moved.get(&1).map(String::as_str), Some("1!"));
}

// Test: handles stay valid across growth and stop resolving after removal.
#[test]
fn handles_survive_growth() {
    let mut m: ChainHashMap<u32, u32> = ChainHashMap::new();
    let (h, _) = m.insert(7, 70);
    for i in 100..400 {
        m.insert(i, i);
    }
    assert_eq!(h.key(&m), Some(&7));
    *h.value_mut(&mut m).unwrap() += 1;
    assert_eq!(m.get(&7), Some(&71));
    m.remove(h);
    assert!(h.value(&m).is_none());
}

// Test: range removal over sequence positions.
#[test]
fn remove_range_through_end() {
    let mut m: ChainHashMap<u32, u32> = (0..20).map(|i| (i, i)).collect();
    let handles: Vec<_> = m.handles().collect();
    let removed = m.remove_range(handles[5], Some(handles[15]));
    assert_eq!(removed, 10);
    assert_eq!(m.len(), 10);
    let removed = m.remove_range(handles[15], None);
    assert_eq!(removed, 5);
    assert_eq!(m.len(), 5);
    for h in &handles[..5] {
        assert!(h.value(&m).is_some());
    }
}

// Test: iteration surfaces.
#[test]
fn iterators_agree() {
    let mut m: ChainHashMap<u32, u32> = ChainHashMap::new();
    m.extend((0..30).map(|i| (i, i * 2)));
    let keys: BTreeSet<u32> = m.keys().copied().collect();
    assert_eq!(keys, (0..30).collect());
    for (_, v) in &mut m {
        *v += 1;
    }
    for (k, v) in &m {
        assert_eq!(*v, k * 2 + 1);
    }
    assert_eq!(m.iter().len(), 30);
    let dbg = format!("{:?}", ChainHashMap::<u32, u32>::from_iter([(1, 2)]));
    assert_eq!(dbg, "{1: 2}");
}
