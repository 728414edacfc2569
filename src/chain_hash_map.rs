//! ChainHashMap: separate chaining over one shared sequence.
//!
//! Every record lives in a single `List`; a bucket slot only remembers the
//! key of the first node of its chain. Records of one bucket always form a
//! contiguous run, so a chain is walked from its head while the cached
//! bucket index still matches. Rehash relinks nodes inside the same arena,
//! which keeps every `Handle` valid across growth.

use crate::config::{check_load_factor, MapConfig};
use crate::error::MapError;
use crate::list::{self, Detached, List, NodeKey, Position};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use std::collections::hash_map::RandomState;
use tracing::{debug, trace};

/// Stable position of a record. Survives rehash; stops resolving once the
/// record is removed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(NodeKey);

impl Handle {
    pub fn key<'a, K, V, S>(&self, map: &'a ChainHashMap<K, V, S>) -> Option<&'a K> {
        map.handle_key(*self)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a ChainHashMap<K, V, S>) -> Option<&'a V> {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut ChainHashMap<K, V, S>) -> Option<&'a mut V> {
        map.handle_value_mut(*self)
    }

    #[inline]
    fn pos(self) -> Position {
        Position::Node(self.0)
    }
}

#[derive(Clone, Debug)]
struct Unit<K, V> {
    key: K,
    value: V,
    // Full hash, computed once at insertion.
    hash: u64,
    // `hash % bucket_count` for the current table.
    bucket: usize,
}

pub struct ChainHashMap<K, V, S = RandomState> {
    hasher: S,
    units: List<Unit<K, V>>,
    buckets: Vec<Option<NodeKey>>,
    max_load_factor: f32,
    reentrancy: DebugReentrancy,
}

#[inline]
fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    (hash % bucket_count as u64) as usize
}

/// Smallest bucket count holding `records` records without the load
/// exceeding `max_load_factor`.
fn min_buckets_for(records: usize, max_load_factor: f32) -> usize {
    let mlf = f64::from(max_load_factor);
    let needed = records as f64;
    let mut n = (needed / mlf).ceil() as usize;
    // The f64 quotient may round down across an integer.
    if (n as f64) * mlf < needed {
        n = n.saturating_add(1);
    }
    n.max(1)
}

/// Link a detached record as the new head of its bucket's chain, or at the
/// tail when the bucket is empty. Recomputes the cached bucket index for
/// the table it is linked into.
fn link_unit<K, V>(
    units: &mut List<Unit<K, V>>,
    buckets: &mut [Option<NodeKey>],
    node: Detached,
) -> NodeKey {
    let bucket = bucket_index(units.detached(&node).hash, buckets.len());
    units.detached_mut(&node).bucket = bucket;
    let at = match buckets[bucket] {
        Some(head) => Position::Node(head),
        None => Position::Sentinel,
    };
    let key = node.key();
    units.splice_before(at, node);
    buckets[bucket] = Some(key);
    key
}

impl<K, V> ChainHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    /// Map with `buckets` initial buckets (at least one).
    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, RandomState::new())
    }
}

impl<K, V, S: Default> Default for ChainHashMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> ChainHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(MapConfig::default(), hasher)
    }

    pub fn with_buckets_and_hasher(buckets: usize, hasher: S) -> Self {
        Self::from_parts(MapConfig::default().with_buckets(buckets.max(1)), hasher)
    }

    pub fn with_config(config: MapConfig, hasher: S) -> Result<Self, MapError> {
        config.validate()?;
        Ok(Self::from_parts(config, hasher))
    }

    fn from_parts(config: MapConfig, hasher: S) -> Self {
        Self {
            hasher,
            units: List::new(),
            buckets: vec![None; config.buckets],
            max_load_factor: config.max_load_factor,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.bucket_count() as f32
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// Change this map's growth threshold. Takes effect at the next insert;
    /// the table is not resized here.
    pub fn set_max_load_factor(&mut self, max_load_factor: f32) -> Result<(), MapError> {
        check_load_factor(max_load_factor)?;
        self.max_load_factor = max_load_factor;
        Ok(())
    }

    /// Rebuild the table with `bucket_count` buckets (at least one).
    ///
    /// Nodes are relinked, never cloned or dropped. Within a bucket the
    /// order may come out reversed, since each record becomes the head of
    /// its new chain.
    pub fn rehash(&mut self, bucket_count: usize) {
        let bucket_count = bucket_count.max(1);
        let mut buckets = vec![None; bucket_count];
        let mut old = self.units.detach_all();
        debug!(
            from = self.buckets.len(),
            to = bucket_count,
            records = old.len(),
            "rehash"
        );
        while let Some(node) = old.pop_front(&self.units) {
            link_unit(&mut self.units, &mut buckets, node);
        }
        self.buckets = buckets;
    }

    /// Size the table to hold `capacity` records under the current load
    /// factor. Ignored when the resulting bucket count would be below the
    /// number of stored records.
    ///
    /// Panics if the bucket array cannot be allocated, like
    /// `Vec::with_capacity`.
    pub fn reserve(&mut self, capacity: usize) {
        let target = ((capacity as f64 / f64::from(self.max_load_factor)) as usize).saturating_add(1);
        if target < self.len() {
            return;
        }
        self.rehash(target);
    }

    /// Grow before linking one more record if it would push the load past
    /// `max_load_factor`. The new size at least doubles the table and is
    /// always large enough for `len + 1` records.
    fn grow_for_one_more(&mut self) {
        let n = self.buckets.len();
        let needed = self.len() + 1;
        if needed as f64 > f64::from(self.max_load_factor) * n as f64 {
            let target = n
                .saturating_mul(2)
                .saturating_add(1)
                .max(min_buckets_for(needed, self.max_load_factor));
            trace!(len = self.len(), buckets = n, target, "load factor exceeded");
            self.rehash(target);
        }
    }

    /// Remove the record at `handle`. A stale handle yields `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let pos = handle.pos();
        let bucket = self.units.get(pos)?.bucket;
        if self.buckets[bucket] == Some(handle.0) {
            let next = self.units.next(pos);
            let successor_in_chain = self.units.get(next).is_some_and(|u| u.bucket == bucket);
            self.buckets[bucket] = if successor_in_chain { next.node() } else { None };
        }
        let unit = self.units.remove(pos);
        Some((unit.key, unit.value))
    }

    /// Remove every record from `from` up to, but excluding, `to` in
    /// sequence order. `to == None` removes through the end. Returns the
    /// number of records removed.
    pub fn remove_range(&mut self, from: Handle, to: Option<Handle>) -> usize {
        let stop = to.map_or(Position::Sentinel, Handle::pos);
        let mut pos = from.pos();
        let mut removed = 0;
        while pos != stop {
            let Some(key) = pos.node() else { break };
            if self.units.get(pos).is_none() {
                break;
            }
            let next = self.units.next(pos);
            if self.remove(Handle(key)).is_some() {
                removed += 1;
            }
            pos = next;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.units.clear();
        self.buckets.fill(None);
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        self.units.get(h.pos()).map(|u| &u.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.units.get(h.pos()).map(|u| &u.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.units.get_mut(h.pos()).map(|u| &mut u.value)
    }

    /// Records of bucket `bucket`, head first. Empty for an out-of-range
    /// bucket.
    pub fn bucket_entries(&self, bucket: usize) -> impl Iterator<Item = (&K, &V)> + '_ {
        let start = match self.buckets.get(bucket).copied().flatten() {
            Some(head) => Position::Node(head),
            None => Position::Sentinel,
        };
        let mut pos = start;
        core::iter::from_fn(move || {
            let unit = self.units.get(pos).filter(|u| u.bucket == bucket)?;
            pos = self.units.next(pos);
            Some((&unit.key, &unit.value))
        })
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.units.iter(),
        }
    }

    /// Allocates O(n) up front; see `List::iter_mut`.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.units.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.units.iter().map(|u| &u.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.units.iter().map(|u| &u.value)
    }

    /// Handles of every record in sequence order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.units.positions().filter_map(Position::node).map(Handle)
    }
}

impl<K, V, S> ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Walk bucket `bucket`'s run from its head while the cached bucket
    /// index still matches.
    fn find_in_bucket<Q>(&self, bucket: usize, q: &Q) -> Option<NodeKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut pos = Position::Node(self.buckets[bucket]?);
        while let Some(unit) = self.units.get(pos) {
            if unit.bucket != bucket {
                break;
            }
            if unit.key.borrow() == q {
                return pos.node();
            }
            pos = self.units.next(pos);
        }
        None
    }

    fn locate<Q>(&self, q: &Q) -> Option<NodeKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.find_in_bucket(bucket_index(hash, self.buckets.len()), q)
    }

    /// Bucket that `q` maps to under the current table size.
    pub fn bucket<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        bucket_index(self.make_hash(q), self.buckets.len())
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).map(Handle)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let key = self.locate(q)?;
        self.units.get(Position::Node(key)).map(|u| &u.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let key = {
            let _g = self.reentrancy.enter();
            self.locate(q)?
        };
        self.units.get_mut(Position::Node(key)).map(|u| &mut u.value)
    }

    /// Strict lookup: a missing key is an error, not `None`.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).ok_or(MapError::MissingKey)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).ok_or(MapError::MissingKey)
    }

    /// Insert `key -> value` unless `key` is present. Returns the record's
    /// handle and whether it was inserted; an existing value is left
    /// untouched.
    pub fn insert(&mut self, key: K, value: V) -> (Handle, bool) {
        self.insert_with(key, || value)
    }

    /// Like `insert`, but only builds the value when the key is absent.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> (Handle, bool)
    where
        F: FnOnce() -> V,
    {
        let (hash, found) = {
            let _g = self.reentrancy.enter();
            let hash = self.make_hash(&key);
            let found = self.find_in_bucket(bucket_index(hash, self.buckets.len()), &key);
            (hash, found)
        };
        if let Some(existing) = found {
            return (Handle(existing), false);
        }

        self.grow_for_one_more();
        let unit = Unit {
            key,
            value: default(),
            hash,
            bucket: 0,
        };
        let node = self.units.create_detached(unit);
        let key = link_unit(&mut self.units, &mut self.buckets, node);
        (Handle(key), true)
    }

    /// Value for `key`, inserting `V::default()` first if absent. Never
    /// fails.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let (handle, _) = self.insert_with(key, V::default);
        self.handle_value_mut(handle)
            .expect("record must exist immediately after insert_with")
    }

    pub fn remove_key<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let handle = self.find(q)?;
        self.remove(handle).map(|(_, v)| v)
    }

    /// Check the chain-run invariants. Test-only.
    #[cfg(test)]
    pub(crate) fn assert_chain_invariants(&self) {
        let n = self.buckets.len();
        let mut seen = vec![false; n];
        let mut current: Option<usize> = None;
        let mut count = 0;
        for pos in self.units.positions() {
            let unit = self.units.get(pos).expect("position from positions() is live");
            assert_eq!(unit.bucket, bucket_index(unit.hash, n), "stale cached bucket");
            if current != Some(unit.bucket) {
                assert!(!seen[unit.bucket], "bucket {} split into two runs", unit.bucket);
                seen[unit.bucket] = true;
                assert_eq!(self.buckets[unit.bucket], pos.node(), "slot is not the run head");
                current = Some(unit.bucket);
            }
            count += 1;
        }
        assert_eq!(count, self.len());
        for (b, slot) in self.buckets.iter().enumerate() {
            if !seen[b] {
                assert!(slot.is_none(), "empty bucket {} still has a head", b);
            }
        }
    }
}

impl<K, V, S> Clone for ChainHashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Deep copy. The arena clone preserves node keys, so the bucket slots
    /// carry over unchanged.
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            units: self.units.clone(),
            buckets: self.buckets.clone(),
            max_load_factor: self.max_load_factor,
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, Q, V, S> Index<&Q> for ChainHashMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// Panics if the key is absent; use `at` for a fallible lookup.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in map")
    }
}

impl<K, V, S> Extend<(K, V)> for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

/// Iterator over `(&K, &V)` in sequence order.
pub struct Iter<'a, K, V> {
    it: list::Iter<'a, Unit<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|u| (&u.key, &u.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

/// Iterator over `(&K, &mut V)` in sequence order.
pub struct IterMut<'a, K, V> {
    it: list::IterMut<'a, Unit<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|u| (&u.key, &mut u.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {}

/// Owning iterator over `(K, V)` in sequence order.
pub struct IntoIter<K, V> {
    it: list::IntoIter<Unit<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|u| (u.key, u.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V, S> IntoIterator for ChainHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            it: self.units.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainHashMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}
