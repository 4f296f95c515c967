//! Direct-mapped operation caches.
//!
//! MTBDD operations are memoized in lossy, direct-mapped tables: each key
//! hashes to exactly one slot, and an insertion simply overwrites whatever
//! lived there.  Cache entries are *hints* — a miss only costs recomputation,
//! and stale entries keyed by node identity remain valid because nodes are
//! never reclaimed during a session.
//!
//! Two usage patterns exist:
//!
//! - a *shared* cache owned by the translator, keyed by `(op, left, right)`,
//!   that lives for the whole session;
//! - *dedicated* caches opened by one operation (minimization, renaming,
//!   strategy extraction) and dropped when it completes.  Fixed-point
//!   algorithms reuse one dedicated cache across rounds by bumping the
//!   operation key instead of clearing.

use std::cell::Cell;

use crate::utils::MyHash;

struct Entry<K, V> {
    key: K,
    value: V,
}

pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Cache<K, V> {
    /// Create a new table of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits should be in the range 0..=31");

        let size = 1usize << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Reset the cache.
    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash,
{
    fn index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    /// Get the cached result.
    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: Eq,
    {
        let index = self.index(key);
        match &self.data[index] {
            Some(entry) if &entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Insert a result into the cache.
    pub fn insert(&mut self, key: K, value: V) {
        let index = self.index(&key);
        self.data[index] = Some(Entry { key, value });
    }
}

/// Number of bits for a dedicated cache sized for a unary rewrite over an
/// automaton with `states` roots and `aps` atomic propositions.
///
/// The estimate `(states / 4 + 1) * aps` is clamped to `[2^14, 2^27)`.
pub fn dedicated_cache_bits(states: usize, aps: usize) -> usize {
    let estimate = (states / 4 + 1).saturating_mul(aps.max(1)).clamp(1 << 14, (1 << 27) - 1);
    // round up to the next power of two
    let mut bits = 14;
    while (1usize << bits) < estimate && bits < 27 {
        bits += 1;
    }
    bits
}

/// Number of bits for a dedicated cache sized for a binary (product-style)
/// operation.
pub fn product_cache_bits(left_states: usize, right_states: usize, sum_aps: usize) -> usize {
    let (big, small) = if left_states >= right_states {
        (left_states, right_states)
    } else {
        (right_states, left_states)
    };
    let estimate = (big / 4 + 1)
        .saturating_mul(small.max(1))
        .saturating_mul(sum_aps.max(1))
        .clamp(1 << 14, (1 << 27) - 1);
    let mut bits = 14;
    while (1usize << bits) < estimate && bits < 27 {
        bits += 1;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache() {
        let mut cache = Cache::<(u64, u64), i32>::new(3);

        cache.insert((1, 2), 3);
        cache.insert((2, 3), 1);
        cache.insert((1, 3), 2);

        assert_eq!(cache.get(&(1, 2)), Some(&3));
        assert_eq!(cache.get(&(2, 3)), Some(&1));
        assert_eq!(cache.get(&(1, 3)), Some(&2));
        assert_eq!(cache.get(&(2, 1)), None);
        assert_eq!(cache.get(&(3, 2)), None);
        assert_eq!(cache.get(&(1, 1)), None);
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = Cache::<u64, u64>::new(4);
        cache.insert(1, 10);
        assert_eq!(cache.get(&1), Some(&10));
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_dedicated_cache_bits_clamped() {
        // Small automata still get the minimum size.
        assert_eq!(dedicated_cache_bits(1, 1), 14);
        assert_eq!(dedicated_cache_bits(100, 2), 14);
        // Large automata are clamped below 2^27.
        assert_eq!(dedicated_cache_bits(usize::MAX / 2, 64), 27);
        // In-between sizes round up to a power of two.
        let bits = dedicated_cache_bits(40_000, 10);
        assert!((1 << bits) >= 100_010);
        assert!(bits < 27);
    }
}
