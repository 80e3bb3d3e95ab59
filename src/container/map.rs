use crate::container::ConcurrentList;
use parking_lot::RwLock;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default bucket count. Prime, to spread integer-identity hashes that are
/// clustered or stride-patterned.
pub const DEFAULT_BUCKETS: usize = 61;

/// A thread-safe hashtable with one reader/writer lock per bucket.
///
/// The bucket array is sized once at construction and never rehashed, so a
/// key maps to the same bucket for the map's whole lifetime and operations
/// on different buckets never contend. Each bucket wraps a
/// [`ConcurrentList`] of entries in its own reader/writer lock; the bucket
/// lock is the exclusion boundary for that bucket, which leaves the inner
/// list's node locks uncontended.
///
/// Values are stored behind `Arc`, so [`get`](ConcurrentHashMap::get)
/// returns a handle that stays valid after the bucket lock is released, even
/// if the entry is concurrently replaced or removed.
///
/// The thread pool uses one of these to map worker thread ids to worker
/// indices: populated during construction, read on every submit.
///
/// Keys must hash deterministically for the life of the map. The default
/// [`RandomState`] hasher is seeded per map instance, which satisfies that.
///
/// ```
/// use filch::ConcurrentHashMap;
///
/// let map = ConcurrentHashMap::new();
/// assert!(map.insert(1, "one"));
/// assert!(!map.insert(1, "uno")); // key already present
///
/// let handle = map.get(&1).unwrap();
/// assert!(map.remove(&1));
/// assert_eq!(*handle, "one"); // handle outlives the entry
/// ```
pub struct ConcurrentHashMap<K, V, S = RandomState> {
    buckets: Box<[Bucket<K, V>]>,
    hasher: S,
    len: AtomicUsize,
}

struct Bucket<K, V> {
    entries: RwLock<ConcurrentList<Entry<K, V>>>,
}

struct Entry<K, V> {
    key: K,
    value: Arc<V>,
}

impl<K, V> ConcurrentHashMap<K, V, RandomState> {
    /// Creates a map with [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Creates a map with `buckets` buckets. Prime counts are recommended.
    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, RandomState::new())
    }
}

impl<K, V, S> ConcurrentHashMap<K, V, S> {
    /// Creates a map with [`DEFAULT_BUCKETS`] buckets and the given hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_buckets_and_hasher(DEFAULT_BUCKETS, hasher)
    }

    /// Creates a map with `buckets` buckets and the given hasher.
    ///
    /// # Panics
    ///
    /// Panics if `buckets` is zero.
    pub fn with_buckets_and_hasher(buckets: usize, hasher: S) -> Self {
        assert!(buckets > 0, "bucket count cannot be 0");

        ConcurrentHashMap {
            buckets: (0..buckets)
                .map(|_| Bucket {
                    entries: RwLock::new(ConcurrentList::new()),
                })
                .collect(),
            hasher,
            len: AtomicUsize::new(0),
        }
    }

    /// Returns the number of key-value pairs in the map.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Returns true if the map holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed bucket count.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Removes every pair from the map.
    pub fn clear(&self) {
        // Writer-lock every bucket, in index order, so the map is observably
        // empty in one step. `clear` is the only operation taking more than
        // one bucket lock; the fixed order keeps it deadlock-free against
        // itself.
        let guards: Vec<_> = self.buckets.iter().map(|b| b.entries.write()).collect();
        for entries in &guards {
            entries.clear();
        }
        self.len.store(0, Ordering::Relaxed);
    }
}

impl<K, V, S> ConcurrentHashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Inserts the pair if the key is absent. Returns true on insertion,
    /// false if the key was already present.
    pub fn insert(&self, key: K, value: V) -> bool {
        // Allocate outside the critical section.
        let value = Arc::new(value);

        let entries = self.bucket(&key).entries.write();
        if entries.match_any(|e| e.key == key) {
            return false;
        }
        entries.push_front(Entry { key, value });
        self.len.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Replaces the value of an existing key. Returns true on replacement,
    /// false if the key was absent.
    ///
    /// Handles previously returned by [`get`](ConcurrentHashMap::get) keep
    /// the old value alive; only the map's entry switches to the new one.
    pub fn replace(&self, key: &K, value: V) -> bool {
        let value = Arc::new(value);

        let entries = self.bucket(key).entries.write();
        entries
            .find_map_mut(|e| e.key == *key, |e| e.value = value)
            .is_some()
    }

    /// Inserts the pair, replacing the value if the key is already present.
    pub fn insert_or_replace(&self, key: K, value: V) {
        let value = Arc::new(value);

        let entries = self.bucket(&key).entries.write();
        let replaced = entries.find_map_mut(|e| e.key == key, |e| e.value = Arc::clone(&value));
        if replaced.is_none() {
            entries.push_front(Entry { key, value });
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes the key's pair. Returns true if a pair was removed.
    pub fn remove(&self, key: &K) -> bool {
        let entries = self.bucket(key).entries.write();
        if entries.remove_if(|e| e.key == *key, 1) == 1 {
            self.len.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Returns a handle to the key's value, or `None` if the key is absent.
    ///
    /// The handle remains readable after the bucket lock is released.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.bucket(key).entries.read();
        entries.find_map(|e| e.key == *key, |e| Arc::clone(&e.value))
    }

    /// Returns a handle to the key's value, inserting one built by the
    /// supplier if the key is absent.
    ///
    /// The lookup is double-checked: a reader-locked probe first, and only
    /// on a miss the writer lock plus a re-check, since another thread may
    /// have inserted the key in between.
    pub fn get_or_insert_with(&self, key: K, supplier: impl FnOnce() -> V) -> Arc<V> {
        if let Some(existing) = self.get(&key) {
            return existing;
        }

        let entries = self.bucket(&key).entries.write();
        if let Some(existing) = entries.find_map(|e| e.key == key, |e| Arc::clone(&e.value)) {
            return existing;
        }

        let value = Arc::new(supplier());
        entries.push_front(Entry {
            key,
            value: Arc::clone(&value),
        });
        self.len.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        let entries = self.bucket(key).entries.read();
        entries.match_any(|e| e.key == *key)
    }

    /// Runs `func` on the key's value while holding the bucket's reader
    /// lock, returning its result, or `None` if the key is absent.
    ///
    /// The lock is deliberately held across the call so `func` sees a value
    /// no writer is concurrently changing. Do not call back into this map
    /// from `func`; a writer operation on the same bucket would deadlock.
    pub fn read_with<R>(&self, key: &K, func: impl FnOnce(&V) -> R) -> Option<R> {
        let entries = self.bucket(key).entries.read();
        entries.find_map(|e| e.key == *key, |e| func(&e.value))
    }

    /// Runs `func` on the key's value while holding the bucket's writer
    /// lock, returning its result, or `None` if the key is absent.
    ///
    /// If a handle from [`get`](ConcurrentHashMap::get) still aliases the
    /// value, the value is cloned first and the mutation lands on the map's
    /// copy; outstanding handles keep reading the pre-mutation value. The
    /// re-entrancy warning on [`read_with`](ConcurrentHashMap::read_with)
    /// applies here too.
    pub fn write_with<R>(&self, key: &K, func: impl FnOnce(&mut V) -> R) -> Option<R>
    where
        V: Clone,
    {
        let entries = self.bucket(key).entries.write();
        entries.find_map_mut(|e| e.key == *key, |e| func(Arc::make_mut(&mut e.value)))
    }

    /// Runs `func` on every pair, one bucket at a time under that bucket's
    /// reader lock.
    pub fn for_each(&self, mut func: impl FnMut(&K, &V)) {
        for bucket in self.buckets.iter() {
            let entries = bucket.entries.read();
            entries.for_each(|e| func(&e.key, &e.value));
        }
    }

    /// Runs `func` on every pair, one bucket at a time under that bucket's
    /// writer lock. Aliased values are cloned-on-write as in
    /// [`write_with`](ConcurrentHashMap::write_with).
    pub fn for_each_mut(&self, mut func: impl FnMut(&K, &mut V))
    where
        V: Clone,
    {
        for bucket in self.buckets.iter() {
            let entries = bucket.entries.write();
            entries.for_each_mut(|e| func(&e.key, Arc::make_mut(&mut e.value)));
        }
    }

    fn bucket(&self, key: &K) -> &Bucket<K, V> {
        let hash = self.hasher.hash_one(key) as usize;
        &self.buckets[hash % self.buckets.len()]
    }
}

impl<K, V> Default for ConcurrentHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}
