//! Extendible hash table.
//!
//! A dynamically sized hash index: a directory of `2^global_depth` entries
//! maps the low bits of a key's hash to a bucket. When a bucket overflows it
//! splits, and when a bucket at maximum depth splits, the directory doubles.
//! Lookups stay O(1) while the table grows to fit the working set.
//!
//! The directory never shrinks and sibling buckets are never merged on
//! removal; a bucket's identity is stable once created, which the buffer
//! pool relies on for its lock discipline.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::mem;

use parking_lot::Mutex;

/// A bucket holds up to `bucket_capacity` pairs in insertion order.
///
/// Keys are unique within a bucket. `depth` is the number of low hash bits
/// that all keys in this bucket share.
struct Bucket<K, V> {
    depth: usize,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(depth: usize, capacity: usize) -> Self {
        Self {
            depth,
            items: Vec::with_capacity(capacity),
        }
    }
}

/// Directory plus bucket arena, guarded as a unit by the table's lock.
///
/// Directory entries are indices into `buckets`. Multiple entries alias the
/// same bucket while its local depth is below the global depth; exactly
/// `2^(global_depth - local_depth)` entries reference each bucket.
struct Directory<K, V> {
    global_depth: usize,
    entries: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
}

/// A thread-safe extendible hash table.
///
/// All public operations serialize behind a single table-wide lock. Inserts
/// overwrite the value of an existing key; a full bucket splits (doubling
/// the directory when needed) until the insert fits.
///
/// # Example
///
/// ```rust
/// use kestrel_index::ExtendibleHashTable;
///
/// let table = ExtendibleHashTable::new(2);
/// table.insert("a", 1);
/// table.insert("a", 2);
/// assert_eq!(table.get(&"a"), Some(2));
/// assert!(table.remove(&"a"));
/// assert_eq!(table.get(&"a"), None);
/// ```
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    bucket_capacity: usize,
    hasher: S,
    inner: Mutex<Directory<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V, RandomState>
where
    K: Hash + Eq,
{
    /// Creates a table whose buckets hold up to `bucket_capacity` pairs.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_capacity` is zero.
    pub fn new(bucket_capacity: usize) -> Self {
        Self::with_hasher(bucket_capacity, RandomState::new())
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a table with a caller-supplied hasher.
    ///
    /// Useful in tests, where a deterministic hash makes split behavior
    /// predictable.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_capacity` is zero.
    pub fn with_hasher(bucket_capacity: usize, hasher: S) -> Self {
        assert!(bucket_capacity > 0, "bucket_capacity must be > 0");
        Self {
            bucket_capacity,
            hasher,
            inner: Mutex::new(Directory {
                global_depth: 0,
                entries: vec![0],
                buckets: vec![Bucket::new(0, bucket_capacity)],
            }),
        }
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let dir = self.inner.lock();
        let slot = dir.entries[self.dir_index(key, dir.global_depth)];
        dir.buckets[slot]
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        let dir = self.inner.lock();
        let slot = dir.entries[self.dir_index(key, dir.global_depth)];
        dir.buckets[slot].items.iter().any(|(k, _)| k == key)
    }

    /// Inserts `key -> value`, overwriting the value if the key exists.
    ///
    /// If the target bucket is full, it splits (doubling the directory when
    /// its local depth has reached the global depth) and the insert retries.
    /// A single split can leave the target bucket full when every key shares
    /// the new bit, so splitting repeats until the pair fits.
    pub fn insert(&self, key: K, value: V) {
        let mut dir = self.inner.lock();
        loop {
            let index = self.dir_index(&key, dir.global_depth);
            let slot = dir.entries[index];
            let bucket = &mut dir.buckets[slot];

            if let Some(pair) = bucket.items.iter_mut().find(|(k, _)| *k == key) {
                pair.1 = value;
                return;
            }
            if bucket.items.len() < self.bucket_capacity {
                bucket.items.push((key, value));
                return;
            }

            self.split(&mut dir, slot);
        }
    }

    /// Removes `key`, returning whether it was present.
    ///
    /// Removal never merges buckets or shrinks the directory.
    pub fn remove(&self, key: &K) -> bool {
        let mut dir = self.inner.lock();
        let slot = dir.entries[self.dir_index(key, dir.global_depth)];
        let items = &mut dir.buckets[slot].items;
        match items.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Returns the number of hash bits the directory currently uses.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth
    }

    /// Returns the local depth of the bucket behind directory entry
    /// `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index` is out of range for the current directory.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let dir = self.inner.lock();
        dir.buckets[dir.entries[dir_index]].depth
    }

    /// Returns the number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().buckets.len()
    }

    /// Returns the number of key-value pairs in the table.
    pub fn len(&self) -> usize {
        let dir = self.inner.lock();
        dir.buckets.iter().map(|b| b.items.len()).sum()
    }

    /// Returns true if the table holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hashes `key` down to a machine word.
    fn hash_of(&self, key: &K) -> usize {
        self.hasher.hash_one(key) as usize
    }

    /// Directory index for `key` at the given global depth: the low
    /// `global_depth` bits of the hash.
    fn dir_index(&self, key: &K, global_depth: usize) -> usize {
        self.hash_of(key) & ((1usize << global_depth) - 1)
    }

    /// Splits the bucket in arena slot `slot`.
    ///
    /// Doubles the directory first if the bucket is already at global depth,
    /// then raises the bucket's local depth, moves the items whose hash has
    /// the new high bit set into a fresh sibling, and repoints every
    /// directory entry that referenced the old bucket according to that
    /// entry's own bit at the new depth.
    fn split(&self, dir: &mut Directory<K, V>, slot: usize) {
        if dir.buckets[slot].depth == dir.global_depth {
            let mirror = dir.entries.clone();
            dir.entries.extend(mirror);
            dir.global_depth += 1;
        }

        let depth = dir.buckets[slot].depth + 1;
        let bit = 1usize << (depth - 1);
        dir.buckets[slot].depth = depth;

        let items = mem::take(&mut dir.buckets[slot].items);
        let (stay, moved): (Vec<_>, Vec<_>) = items
            .into_iter()
            .partition(|(k, _)| self.hash_of(k) & bit == 0);
        dir.buckets[slot].items = stay;

        let sibling = dir.buckets.len();
        let mut sibling_bucket = Bucket::new(depth, self.bucket_capacity);
        sibling_bucket.items = moved;
        dir.buckets.push(sibling_bucket);

        for (i, entry) in dir.entries.iter_mut().enumerate() {
            if *entry == slot && i & bit != 0 {
                *entry = sibling;
            }
        }
    }
}

impl<K, V, S> std::fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.inner.lock();
        f.debug_struct("ExtendibleHashTable")
            .field("global_depth", &dir.global_depth)
            .field("num_buckets", &dir.buckets.len())
            .field("directory_len", &dir.entries.len())
            .field("bucket_capacity", &self.bucket_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;
    use std::sync::Arc;
    use std::thread;

    /// Hashes a u64 key to itself, so directory indices are predictable.
    #[derive(Clone, Default)]
    struct IdentityState;

    struct IdentityHasher(u64);

    impl Hasher for IdentityHasher {
        fn finish(&self) -> u64 {
            self.0
        }

        fn write(&mut self, bytes: &[u8]) {
            let mut buf = [0u8; 8];
            let n = bytes.len().min(8);
            buf[..n].copy_from_slice(&bytes[..n]);
            self.0 = u64::from_le_bytes(buf);
        }

        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }

        fn write_usize(&mut self, n: usize) {
            self.0 = n as u64;
        }
    }

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher(0)
        }
    }

    fn identity_table<V: Clone>(
        bucket_capacity: usize,
    ) -> ExtendibleHashTable<u64, V, IdentityState> {
        ExtendibleHashTable::with_hasher(bucket_capacity, IdentityState)
    }

    /// Checks the structural invariants that must hold after any sequence of
    /// operations.
    fn check_invariants<K: Hash + Eq, V, S: BuildHasher>(table: &ExtendibleHashTable<K, V, S>) {
        let dir = table.inner.lock();
        assert_eq!(dir.entries.len(), 1 << dir.global_depth);

        let mut refs = vec![0usize; dir.buckets.len()];
        for &slot in &dir.entries {
            refs[slot] += 1;
        }
        for (slot, bucket) in dir.buckets.iter().enumerate() {
            assert!(bucket.depth <= dir.global_depth);
            assert_eq!(refs[slot], 1 << (dir.global_depth - bucket.depth));
            assert!(bucket.items.len() <= table.bucket_capacity);
        }
    }

    #[test]
    fn test_insert_find() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1u64, "a");
        table.insert(2, "b");
        table.insert(3, "c");

        assert_eq!(table.get(&1), Some("a"));
        assert_eq!(table.get(&2), Some("b"));
        assert_eq!(table.get(&3), Some("c"));
        assert_eq!(table.get(&4), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_insert_overwrites() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1u64, "a");
        table.insert(1, "b");

        assert_eq!(table.get(&1), Some("b"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1u64, "a");

        assert!(table.remove(&1));
        assert_eq!(table.get(&1), None);
        assert!(!table.remove(&1));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_never_shrinks() {
        let table = identity_table(1);
        for k in 0..8u64 {
            table.insert(k, k);
        }
        let depth = table.global_depth();
        let buckets = table.num_buckets();

        for k in 0..8u64 {
            assert!(table.remove(&k));
        }
        assert_eq!(table.global_depth(), depth);
        assert_eq!(table.num_buckets(), buckets);
        check_invariants(&table);
    }

    #[test]
    fn test_split_on_shared_low_bit() {
        // Capacity 2, keys 0, 2, 4 all have low bit 0: inserting the third
        // forces at least one split.
        let table = identity_table(2);
        table.insert(0u64, 0);
        table.insert(2, 2);
        assert_eq!(table.global_depth(), 0);

        table.insert(4, 4);
        assert!(table.global_depth() >= 1);
        assert!(table.num_buckets() >= 2);
        for k in [0u64, 2, 4] {
            assert_eq!(table.get(&k), Some(k));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_degenerate_split_chain() {
        // Keys that agree on many low bits force repeated splits on a single
        // insert; the loop must still terminate and keep everything findable.
        let table = identity_table(2);
        for k in [0u64, 16, 32] {
            table.insert(k, k);
        }
        assert!(table.global_depth() >= 5);
        for k in [0u64, 16, 32] {
            assert_eq!(table.get(&k), Some(k));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_directory_growth_bound() {
        // N distinct dense keys need global_depth >= log2(N / capacity).
        let table = identity_table(4);
        let n = 256u64;
        for k in 0..n {
            table.insert(k, k * 10);
        }
        assert!(table.global_depth() >= 6);
        for k in 0..n {
            assert_eq!(table.get(&k), Some(k * 10));
        }
        check_invariants(&table);
    }

    #[test]
    fn test_four_keys_capacity_one() {
        // With capacity 1 and identity hashes, inserting 0..4 grows the
        // directory to depth 2 and separates 0 from 2.
        let table = identity_table(1);
        table.insert(0u64, "a");
        table.insert(1, "b");
        assert_eq!(table.global_depth(), 1);

        table.insert(2, "c");
        assert_eq!(table.global_depth(), 2);

        table.insert(3, "d");
        assert_eq!(table.get(&0), Some("a"));
        assert_eq!(table.get(&1), Some("b"));
        assert_eq!(table.get(&2), Some("c"));
        assert_eq!(table.get(&3), Some("d"));
        assert!(table.num_buckets() >= 3);
        check_invariants(&table);
    }

    #[test]
    fn test_local_depth_bounded_by_global() {
        let table = identity_table(2);
        for k in 0..64u64 {
            table.insert(k, k);
        }
        let global = table.global_depth();
        for i in 0..(1 << global) {
            assert!(table.local_depth(i) <= global);
        }
        check_invariants(&table);
    }

    #[test]
    fn test_random_workload() {
        use rand::prelude::*;

        let table = ExtendibleHashTable::new(4);
        let mut rng = StdRng::seed_from_u64(7);
        let mut shadow = std::collections::HashMap::new();

        for _ in 0..2000 {
            let key = rng.gen_range(0..500u64);
            match rng.gen_range(0..3) {
                0 => {
                    let value = rng.gen::<u32>();
                    table.insert(key, value);
                    shadow.insert(key, value);
                }
                1 => {
                    assert_eq!(table.remove(&key), shadow.remove(&key).is_some());
                }
                _ => {
                    assert_eq!(table.get(&key), shadow.get(&key).copied());
                }
            }
        }
        assert_eq!(table.len(), shadow.len());
        check_invariants(&table);
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = Arc::new(ExtendibleHashTable::new(4));
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for i in 0..200u64 {
                    let key = t * 1000 + i;
                    table.insert(key, key * 2);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(table.len(), 8 * 200);
        for t in 0..8u64 {
            for i in 0..200u64 {
                let key = t * 1000 + i;
                assert_eq!(table.get(&key), Some(key * 2));
            }
        }
        check_invariants(&table);
    }
}
