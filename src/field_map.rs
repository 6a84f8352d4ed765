//! A hybrid sorted container for field-number-keyed values.
//!
//! Most messages touch a handful of small field numbers, so lookups should
//! stay in one small sorted array. [`CompactSortedMap`] keeps the *k* smallest
//! keys in an ascending "fast" partition and spills everything else into an
//! ordered overflow map.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::BTreeMap;

use thiserror::Error;

/// Fast-partition capacity used by [`CompactSortedMap::new`].
pub const DEFAULT_FAST_CAPACITY: usize = 16;

/// Returned by every mutator after [`CompactSortedMap::freeze_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("container is frozen")]
pub struct FrozenError;

/// An ordered map split into a bounded sorted array plus an overflow map.
///
/// Invariants, maintained by every mutator:
/// - the fast partition is strictly ascending and holds the *k* smallest
///   present keys;
/// - a key lives in exactly one partition;
/// - the overflow map is non-empty only while the fast partition is full.
///
/// Freezing is one-way: after [`freeze_with`](Self::freeze_with) every
/// mutator fails with [`FrozenError`] and no value ever changes again.
#[derive(Clone)]
pub struct CompactSortedMap<K, V> {
    fast: Vec<(K, V)>,
    overflow: BTreeMap<K, V>,
    capacity: usize,
    frozen: bool,
}

impl<K: Ord, V> CompactSortedMap<K, V> {
    pub fn new() -> Self {
        Self::with_fast_capacity(DEFAULT_FAST_CAPACITY)
    }

    /// Creates a map whose fast partition holds at most `capacity` entries.
    pub fn with_fast_capacity(capacity: usize) -> Self {
        CompactSortedMap {
            fast: Vec::new(),
            overflow: BTreeMap::new(),
            capacity: capacity.max(1),
            frozen: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fast.len() + self.overflow.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[inline]
    fn check_frozen(&self) -> Result<(), FrozenError> {
        if self.frozen {
            return Err(FrozenError);
        }
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self.fast.last() {
            // Ascending inserts probe the greatest key over and over; answer
            // that without a search.
            Some((last, value)) if last == key => Some(value),
            Some((last, _)) if key < last => self
                .fast
                .binary_search_by(|(k, _)| k.cmp(key))
                .ok()
                .map(|i| &self.fast[i].1),
            // Greater than everything in the fast partition (or the map is
            // empty, in which case overflow is too).
            _ => self.overflow.get(key),
        }
    }

    /// Mutable lookup. Fails once frozen so handed-out references can never
    /// outlive the freeze guarantee.
    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>, FrozenError> {
        self.check_frozen()?;
        if let Ok(i) = self.fast.binary_search_by(|(k, _)| k.cmp(key)) {
            return Ok(Some(&mut self.fast[i].1));
        }
        Ok(self.overflow.get_mut(key))
    }

    /// Inserts `value`, returning the previous value for `key` if any.
    ///
    /// A new key whose sort position falls inside the fast partition evicts
    /// that partition's greatest entry into overflow to make room.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, FrozenError> {
        self.check_frozen()?;
        match self.fast.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(i) => Ok(Some(core::mem::replace(&mut self.fast[i].1, value))),
            Err(i) if i < self.capacity => {
                if self.fast.len() == self.capacity {
                    if let Some((evicted_key, evicted_value)) = self.fast.pop() {
                        self.overflow.insert(evicted_key, evicted_value);
                    }
                }
                self.fast.insert(i, (key, value));
                Ok(None)
            }
            // Past the fast partition's end. Keys already in overflow sort
            // here too, so this doubles as the overflow overwrite path.
            Err(_) => Ok(self.overflow.insert(key, value)),
        }
    }

    /// Removes `key`, returning its value if present.
    ///
    /// A removal from the fast partition promotes overflow's least entry so
    /// the partition keeps holding the smallest present keys.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, FrozenError> {
        self.check_frozen()?;
        if let Ok(i) = self.fast.binary_search_by(|(k, _)| k.cmp(key)) {
            let (_, value) = self.fast.remove(i);
            if let Some(promoted) = self.overflow.pop_first() {
                self.fast.push(promoted);
            }
            return Ok(Some(value));
        }
        Ok(self.overflow.remove(key))
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    pub fn get_or_insert_with(
        &mut self,
        key: K,
        default: impl FnOnce() -> V,
    ) -> Result<&mut V, FrozenError> {
        self.check_frozen()?;
        match self.fast.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(i) => Ok(&mut self.fast[i].1),
            Err(i) if i < self.capacity => {
                if self.fast.len() == self.capacity {
                    if let Some((evicted_key, evicted_value)) = self.fast.pop() {
                        self.overflow.insert(evicted_key, evicted_value);
                    }
                }
                self.fast.insert(i, (key, default()));
                Ok(&mut self.fast[i].1)
            }
            Err(_) => Ok(self.overflow.entry(key).or_insert_with(default)),
        }
    }

    pub fn clear(&mut self) -> Result<(), FrozenError> {
        self.check_frozen()?;
        self.fast.clear();
        self.overflow.clear();
        Ok(())
    }

    /// Ascending iteration: the fast partition, then overflow.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.fast.iter().map(|(k, v)| (k, v)).chain(self.overflow.iter())
    }

    /// Descending iteration, no re-sorting: overflow reversed, then the fast
    /// partition reversed.
    pub fn iter_descending(&self) -> impl Iterator<Item = (&K, &V)> {
        self.overflow
            .iter()
            .rev()
            .chain(self.fast.iter().rev().map(|(k, v)| (k, v)))
    }

    /// Freezes the map permanently, running `hook` on every value first so
    /// exposed nested containers can make themselves unmodifiable too.
    ///
    /// Idempotent: freezing a frozen map does nothing.
    pub fn freeze_with<F: FnMut(&mut V)>(&mut self, mut hook: F) {
        if self.frozen {
            return;
        }
        for (_, value) in &mut self.fast {
            hook(value);
        }
        for value in self.overflow.values_mut() {
            hook(value);
        }
        self.frozen = true;
    }
}

impl<K: Ord, V> Default for CompactSortedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for CompactSortedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Partition-independent: two maps are equal when they hold the same
/// key-value pairs, regardless of fast-partition capacity or frozen state.
impl<K: Ord, V: PartialEq> PartialEq for CompactSortedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord, V: Eq> Eq for CompactSortedMap<K, V> {}

/// Hashes entries in ascending key order, which is partition-independent by
/// construction.
impl<K: Ord + Hash, V: Hash> Hash for CompactSortedMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for entry in self.iter() {
            entry.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use proptest::prelude::*;

    use super::*;

    fn assert_invariants(map: &CompactSortedMap<u32, u32>) {
        assert!(map.fast.windows(2).all(|w| w[0].0 < w[1].0));
        if !map.overflow.is_empty() {
            assert_eq!(map.fast.len(), map.capacity);
            let greatest_fast = map.fast.last().map(|(k, _)| *k);
            let least_overflow = map.overflow.keys().next().copied();
            assert!(greatest_fast < least_overflow);
        }
        assert_eq!(map.len(), map.fast.len() + map.overflow.len());
    }

    #[test]
    fn test_insert_get_overwrite() {
        let mut map = CompactSortedMap::with_fast_capacity(2);
        assert_eq!(map.insert(5, "a").unwrap(), None);
        assert_eq!(map.insert(3, "b").unwrap(), None);
        // 7 lands in overflow, then 1 evicts 5 into overflow.
        assert_eq!(map.insert(7, "c").unwrap(), None);
        assert_eq!(map.insert(1, "d").unwrap(), None);

        assert_eq!(map.len(), 4);
        assert_eq!(map.get(&1), Some(&"d"));
        assert_eq!(map.get(&3), Some(&"b"));
        assert_eq!(map.get(&5), Some(&"a"));
        assert_eq!(map.get(&7), Some(&"c"));
        assert_eq!(map.get(&2), None);

        // Overwrites hit both partitions in place.
        assert_eq!(map.insert(1, "D").unwrap(), Some("d"));
        assert_eq!(map.insert(7, "C").unwrap(), Some("c"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_remove_promotes_least_overflow() {
        let mut map = CompactSortedMap::with_fast_capacity(2);
        for k in [1, 2, 3, 4] {
            map.insert(k, k * 10).unwrap();
        }
        assert_eq!(map.remove(&1).unwrap(), Some(10));
        // 3 must have been promoted into the fast partition.
        assert_eq!(map.fast.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [2, 3]);
        assert_eq!(map.get(&3), Some(&30));
        assert_eq!(map.remove(&9).unwrap(), None);
    }

    #[test]
    fn test_iteration_order() {
        let mut map = CompactSortedMap::with_fast_capacity(2);
        for k in [4u32, 1, 3, 2] {
            map.insert(k, ()).unwrap();
        }
        let asc: Vec<u32> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(asc, [1, 2, 3, 4]);
        let desc: Vec<u32> = map.iter_descending().map(|(k, _)| *k).collect();
        assert_eq!(desc, [4, 3, 2, 1]);
    }

    #[test]
    fn test_freeze_is_permanent() {
        let mut map = CompactSortedMap::with_fast_capacity(2);
        map.insert(1, vec![10]).unwrap();
        map.insert(2, vec![20]).unwrap();

        let mut hook_calls = 0;
        map.freeze_with(|v| {
            hook_calls += 1;
            v.push(99);
        });
        assert_eq!(hook_calls, 2);
        assert!(map.is_frozen());

        assert_eq!(map.insert(3, vec![30]), Err(FrozenError));
        assert_eq!(map.remove(&1), Err(FrozenError));
        assert_eq!(map.get_mut(&1), Err(FrozenError));
        assert_eq!(map.clear(), Err(FrozenError));
        assert_eq!(map.get(&1), Some(&vec![10, 99]));

        // Idempotent: the hook never runs twice.
        map.freeze_with(|_| hook_calls += 1);
        assert_eq!(hook_calls, 2);
    }

    #[test]
    fn test_eq_and_hash_are_partition_independent() {
        let mut small = CompactSortedMap::with_fast_capacity(1);
        let mut large = CompactSortedMap::with_fast_capacity(16);
        for k in [5u32, 1, 9, 3] {
            small.insert(k, k + 100).unwrap();
            large.insert(k, k + 100).unwrap();
        }
        assert_eq!(small, large);

        let hash = |m: &CompactSortedMap<u32, u32>| {
            let mut h = DefaultHasher::new();
            m.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&small), hash(&large));

        large.insert(9, 0).unwrap();
        assert_ne!(small, large);
    }

    proptest! {
        #[test]
        fn proptest_matches_btreemap(
            ops in prop::collection::vec((any::<bool>(), 0u32..32, any::<u32>()), 0..64),
            capacity in 1usize..6,
        ) {
            let mut map = CompactSortedMap::with_fast_capacity(capacity);
            let mut model = BTreeMap::new();
            for (is_insert, key, value) in ops {
                if is_insert {
                    prop_assert_eq!(map.insert(key, value).unwrap(), model.insert(key, value));
                } else {
                    prop_assert_eq!(map.remove(&key).unwrap(), model.remove(&key));
                }
                assert_invariants(&map);
                prop_assert_eq!(map.len(), model.len());
            }
            prop_assert!(map.iter().map(|(k, v)| (*k, *v)).eq(model.into_iter()));
        }
    }
}
