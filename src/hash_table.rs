//! A separately chained hash table with load-factor-driven resizing.
//!
//! [`HashTable<V>`] stores values of type `V` without knowing how to hash or
//! compare them. Every operation takes the value's `u64` hash and an equality
//! predicate, which lets [`HashMap`](crate::HashMap) put `(K, V)` pairs in it
//! while only ever looking at `K`.
//!
//! Chains are linked by index through a dense arena of slots rather than by
//! per-node allocations. A rehash only rewrites the links, so values never
//! move when the bucket array is replaced.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::capacity::Capacity;
use crate::capacity::ResizePolicy;

/// End of a chain, or an empty bucket.
const NIL: usize = usize::MAX;

#[derive(Clone)]
struct Slot<V> {
    hash: u64,
    next: usize,
    value: V,
}

/// Outcome of walking a single chain.
enum Probe {
    /// `prev` is `NIL` when the match is the head of its chain.
    Found { index: usize, prev: usize },
    /// `tail` is `NIL` when the bucket is empty.
    Missing { tail: usize },
}

/// Walks one bucket chain, yielding slot indices in chain order.
struct Chain<'a, V> {
    slots: &'a [Slot<V>],
    cursor: usize,
}

impl<V> Iterator for Chain<'_, V> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let index = self.cursor;
        self.cursor = self.slots[index].next;
        Some(index)
    }
}

/// Chain statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of values currently in the table
    pub populated: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Number of buckets holding at least one value
    pub occupied_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Bucket utilization (occupied_buckets / capacity)
    pub bucket_utilization: f64,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Chain Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Buckets: {}/{} ({:.2}% utilization)",
            self.occupied_buckets,
            self.capacity,
            self.bucket_utilization * 100.0
        );
        println!("Longest chain: {}", self.longest_chain);
    }
}

/// A hash table using separate chaining over a prime-sized bucket array.
///
/// The table starts with 53 buckets and, under the default
/// [`ResizePolicy::Dynamic`], rehashes one step up or down the prime sequence
/// in [`capacity::PRIMES`](crate::capacity::PRIMES) whenever an insertion or
/// removal pushes the load factor above 0.72 or below 0.10.
///
/// ## Example
///
/// ```rust
/// # use core::hash::BuildHasher;
/// # use std::hash::RandomState;
/// #
/// # use chain_hash::hash_table::Entry;
/// # use chain_hash::HashTable;
/// #
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// let state = RandomState::new();
/// let mut table = HashTable::new();
/// let hash = state.hash_one(123u64);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).map(|p| p.name.as_str()), Some("Alice"));
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    heads: Vec<usize>,
    slots: Vec<Slot<V>>,
    capacity: Capacity,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut occupied_buckets = 0;
        let mut longest_chain = 0;
        for bucket in 0..self.heads.len() {
            let len = self.chain(bucket).count();
            if len > 0 {
                occupied_buckets += 1;
                longest_chain = longest_chain.max(len);
            }
        }

        f.debug_struct("HashTable")
            .field("populated", &self.slots.len())
            .field("capacity", &self.heads.len())
            .field("policy", &self.capacity.policy())
            .field("occupied_buckets", &occupied_buckets)
            .field("longest_chain", &longest_chain)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with the smallest dynamic capacity.
    pub fn new() -> Self {
        Self::with_policy(ResizePolicy::Dynamic)
    }

    /// Creates an empty table whose bucket count follows `policy`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::HashTable;
    /// # use chain_hash::ResizePolicy;
    /// #
    /// let table: HashTable<String> = HashTable::with_policy(ResizePolicy::Fixed(97));
    /// assert_eq!(table.capacity(), 97);
    /// ```
    pub fn with_policy(policy: ResizePolicy) -> Self {
        let capacity = Capacity::initial(policy);
        Self {
            heads: vec![NIL; capacity.buckets()],
            slots: Vec::new(),
            capacity,
        }
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the table contains no values.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the current number of buckets.
    ///
    /// Unlike open-addressing tables this is not a limit on the number of
    /// values; chains absorb any excess.
    pub fn capacity(&self) -> usize {
        self.heads.len()
    }

    /// Returns `len() / capacity()`.
    pub fn load_factor(&self) -> f64 {
        self.slots.len() as f64 / self.heads.len() as f64
    }

    /// Returns the policy this table was created with.
    pub fn policy(&self) -> ResizePolicy {
        self.capacity.policy()
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iteration order is arbitrary and changes as values are removed.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.slots.iter(),
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    ///
    /// Callers must not change the part of a value its hash was derived from.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            inner: self.slots.iter_mut(),
        }
    }

    /// Removes every value from the table, returning them in an iterator.
    ///
    /// The table returns to its initial capacity immediately, whether or not
    /// the iterator is consumed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for n in 0..100u64 {
    ///     table.entry(n, |&v: &u64| v == n).or_insert(n);
    /// }
    /// assert!(table.capacity() > 53);
    ///
    /// let mut values: Vec<u64> = table.drain().collect();
    /// values.sort();
    /// assert_eq!(values, (0..100).collect::<Vec<_>>());
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 53);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        log_trace!("draining {} values", self.slots.len());
        self.reset_buckets();
        Drain {
            inner: self.slots.drain(..),
        }
    }

    /// Removes all values and returns the table to its initial capacity.
    pub fn clear(&mut self) {
        log_trace!("clearing {} values", self.slots.len());
        self.slots.clear();
        self.reset_buckets();
    }

    /// Finds the value with the given hash for which `eq` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        match self.probe(hash, eq) {
            Probe::Found { index, .. } => Some(&self.slots[index].value),
            Probe::Missing { .. } => None,
        }
    }

    /// Like [`find`](Self::find), returning a mutable reference.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        match self.probe(hash, eq) {
            Probe::Found { index, .. } => Some(&mut self.slots[index].value),
            Probe::Missing { .. } => None,
        }
    }

    /// Removes and returns the value with the given hash for which `eq`
    /// returns `true`.
    ///
    /// A successful removal may shrink the table.
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        match self.probe(hash, eq) {
            Probe::Found { index, prev } => Some(self.remove_at(index, prev)),
            Probe::Missing { .. } => None,
        }
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// Inserting through a [`VacantEntry`] appends to the end of the chain and
    /// may grow the table; updating through an [`OccupiedEntry`] never
    /// resizes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use chain_hash::hash_table::Entry;
    /// # use chain_hash::HashTable;
    /// #
    /// let mut table = HashTable::new();
    ///
    /// match table.entry(7, |&(k, _): &(u64, &str)| k == 7) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((7, "seven"));
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().1 = "updated";
    ///     }
    /// }
    ///
    /// assert_eq!(table.find(7, |&(k, _)| k == 7), Some(&(7, "seven")));
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.probe(hash, eq) {
            Probe::Found { index, prev } => Entry::Occupied(OccupiedEntry {
                table: self,
                index,
                prev,
            }),
            Probe::Missing { tail } => Entry::Vacant(VacantEntry {
                table: self,
                hash,
                tail,
            }),
        }
    }

    /// Returns a histogram of chain lengths: `hist[n]` is the number of
    /// buckets whose chain holds exactly `n` values.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        for bucket in 0..self.heads.len() {
            let len = self.chain(bucket).count();
            if hist.len() <= len {
                hist.resize(len + 1, 0);
            }
            hist[len] += 1;
        }
        hist
    }

    /// Returns chain and utilization statistics for debugging.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.chain_histogram();
        let empty = hist.first().copied().unwrap_or(0);
        let occupied_buckets = self.heads.len() - empty;

        DebugStats {
            populated: self.slots.len(),
            capacity: self.heads.len(),
            occupied_buckets,
            longest_chain: hist.len().saturating_sub(1),
            load_factor: self.load_factor(),
            bucket_utilization: occupied_buckets as f64 / self.heads.len() as f64,
        }
    }

    #[inline]
    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.heads.len() as u64) as usize
    }

    fn chain(&self, bucket: usize) -> Chain<'_, V> {
        Chain {
            slots: &self.slots,
            cursor: self.heads[bucket],
        }
    }

    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        let mut prev = NIL;
        let mut cursor = self.heads[self.bucket_index(hash)];
        while cursor != NIL {
            let slot = &self.slots[cursor];
            if slot.hash == hash && eq(&slot.value) {
                return Probe::Found {
                    index: cursor,
                    prev,
                };
            }
            prev = cursor;
            cursor = slot.next;
        }

        Probe::Missing { tail: prev }
    }

    /// Appends a new value after `tail` in the chain for `hash`, then
    /// evaluates the resize policy. Returns the value's slot index.
    fn append(&mut self, hash: u64, tail: usize, value: V) -> usize {
        let index = self.slots.len();
        self.slots.push(Slot {
            hash,
            next: NIL,
            value,
        });

        if tail == NIL {
            let bucket = self.bucket_index(hash);
            self.heads[bucket] = index;
        } else {
            self.slots[tail].next = index;
        }

        self.check_resize();
        index
    }

    /// Unlinks and removes the slot at `index`, whose chain predecessor is
    /// `prev`, then evaluates the resize policy.
    fn remove_at(&mut self, index: usize, prev: usize) -> V {
        let next = self.slots[index].next;
        if prev == NIL {
            let bucket = self.bucket_index(self.slots[index].hash);
            self.heads[bucket] = next;
        } else {
            self.slots[prev].next = next;
        }

        // The last slot is about to move into `index`; repoint its link.
        let last = self.slots.len() - 1;
        if index != last {
            let bucket = self.bucket_index(self.slots[last].hash);
            if self.heads[bucket] == last {
                self.heads[bucket] = index;
            } else {
                let mut cursor = self.heads[bucket];
                while self.slots[cursor].next != last {
                    cursor = self.slots[cursor].next;
                }
                self.slots[cursor].next = index;
            }
        }

        let removed = self.slots.swap_remove(index);
        self.check_resize();
        removed.value
    }

    fn check_resize(&mut self) {
        if let Some(capacity) = self.capacity.next_for(self.slots.len()) {
            self.rehash(capacity);
        }
    }

    /// Replaces the bucket array with one sized for `capacity` and relinks
    /// every slot into the bucket of its cached hash.
    fn rehash(&mut self, capacity: Capacity) {
        log_debug!(
            "rehashing {} values from {} to {} buckets",
            self.slots.len(),
            self.heads.len(),
            capacity.buckets()
        );

        self.capacity = capacity;
        self.heads = vec![NIL; capacity.buckets()];

        // Pushing at the head in reverse keeps each chain in slot order.
        for index in (0..self.slots.len()).rev() {
            let bucket = self.bucket_index(self.slots[index].hash);
            self.slots[index].next = self.heads[bucket];
            self.heads[bucket] = index;
        }
    }

    fn reset_buckets(&mut self) {
        self.capacity = Capacity::initial(self.capacity.policy());
        self.heads = vec![NIL; self.capacity.buckets()];
    }
}

/// A view into a single entry in the table, which may be vacant or occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// No matching value is present.
    Vacant(VacantEntry<'a, V>),
    /// A matching value is present.
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
    tail: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Appends `value` to its chain and returns a mutable reference to it.
    ///
    /// The table may grow as a result; the returned reference stays valid
    /// because rehashing never moves values.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        let index = table.append(self.hash, self.tail, value);
        &mut table.slots[index].value
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
    prev: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.table.slots[self.index].value
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.table.slots[self.index].value
    }

    /// Converts the entry into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut V {
        let OccupiedEntry { table, index, .. } = self;
        &mut table.slots[index].value
    }

    /// Removes the value from the table and returns it. May shrink the
    /// table.
    pub fn remove(self) -> V {
        self.table.remove_at(self.index, self.prev)
    }
}

/// An iterator over the values of a [`HashTable`].
pub struct Iter<'a, V> {
    inner: core::slice::Iter<'a, Slot<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| &slot.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`].
pub struct IterMut<'a, V> {
    inner: core::slice::IterMut<'a, Slot<V>>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| &mut slot.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    inner: alloc::vec::Drain<'a, Slot<V>>,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| slot.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    inner: alloc::vec::IntoIter<Slot<V>>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|slot| slot.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V> IntoIterator for HashTable<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.slots.into_iter(),
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::capacity::GROW_LOAD_FACTOR;
    use crate::capacity::PRIMES;
    use crate::capacity::SHRINK_LOAD_FACTOR;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    /// Checks that every slot is reachable from exactly one bucket, namely
    /// the one its hash maps to.
    fn assert_consistent<V>(table: &HashTable<V>) {
        let mut seen = vec![false; table.slots.len()];
        for bucket in 0..table.heads.len() {
            for index in table.chain(bucket) {
                assert!(!seen[index], "slot {index} linked twice");
                seen[index] = true;
                assert_eq!(table.bucket_index(table.slots[index].hash), bucket);
            }
        }
        assert!(seen.iter().all(|&s| s), "unlinked slot");
    }

    fn insert_item(table: &mut HashTable<Item>, hash: u64, key: u64, value: i32) {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item { key, value });
            }
            Entry::Occupied(_) => panic!("unexpected occupied entry for {key}"),
        }
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            insert_item(&mut table, hash, k, (k as i32) * 2);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }
        assert_eq!(table.len(), 32);
        assert_consistent(&table);

        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k).map(|v| v.value),
                Some((k as i32) * 2)
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        insert_item(&mut table, hash, k, 7);

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                assert_eq!(occ.get().value, 7);
                occ.get_mut().value = 11;
            }
            Entry::Vacant(_) => panic!("second lookup should be occupied"),
        }

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(hash, |v| v.key == k).map(|v| v.value), Some(11));
    }

    #[test]
    fn colliding_hashes_share_a_chain() {
        let mut table: HashTable<Item> = HashTable::new();
        // 5, 58 and 111 all land in bucket 5 of 53.
        for (key, hash) in [(1u64, 5u64), (2, 58), (3, 111)] {
            insert_item(&mut table, hash, key, key as i32);
        }

        assert_eq!(table.chain(5).count(), 3);
        assert_eq!(table.chain_histogram()[3], 1);
        for (key, hash) in [(1u64, 5u64), (2, 58), (3, 111)] {
            assert_eq!(
                table.find(hash, |v| v.key == key).map(|v| v.value),
                Some(key as i32)
            );
        }
        assert_consistent(&table);
    }

    #[test]
    fn same_hash_different_values() {
        let mut table: HashTable<Item> = HashTable::new();
        for key in 0..5u64 {
            insert_item(&mut table, 17, key, key as i32);
        }
        assert_eq!(table.chain(17).count(), 5);
        for key in 0..5u64 {
            assert_eq!(
                table.find(17, |v| v.key == key).map(|v| v.value),
                Some(key as i32)
            );
        }
    }

    #[test]
    fn remove_head_middle_and_tail_of_chain() {
        let mut table: HashTable<Item> = HashTable::new();
        let members = [(1u64, 5u64), (2, 58), (3, 111), (4, 164)];
        for (key, hash) in members {
            insert_item(&mut table, hash, key, key as i32);
        }
        insert_item(&mut table, 6, 5, 5);

        assert_eq!(table.remove(58, |v| v.key == 2).map(|v| v.value), Some(2));
        assert_consistent(&table);
        assert_eq!(table.remove(5, |v| v.key == 1).map(|v| v.value), Some(1));
        assert_consistent(&table);
        assert_eq!(table.remove(164, |v| v.key == 4).map(|v| v.value), Some(4));
        assert_consistent(&table);

        assert_eq!(table.len(), 2);
        assert_eq!(table.find(111, |v| v.key == 3).map(|v| v.value), Some(3));
        assert_eq!(table.find(6, |v| v.key == 5).map(|v| v.value), Some(5));
        assert!(table.remove(58, |v| v.key == 2).is_none());
    }

    #[test]
    fn remove_relinks_moved_slot() {
        let mut table: HashTable<Item> = HashTable::new();
        // Slot 0 in bucket 1, slots 1 and 2 chained in bucket 2.
        insert_item(&mut table, 1, 10, 10);
        insert_item(&mut table, 2, 20, 20);
        insert_item(&mut table, 55, 30, 30);

        // Removing slot 0 moves slot 2, the tail of bucket 2, into its place.
        assert_eq!(table.remove(1, |v| v.key == 10).map(|v| v.value), Some(10));
        assert_consistent(&table);
        assert_eq!(table.find(55, |v| v.key == 30).map(|v| v.value), Some(30));
        assert_eq!(table.find(2, |v| v.key == 20).map(|v| v.value), Some(20));

        // Now slot 0 holds key 30; removing slot 0 again moves a chain head.
        insert_item(&mut table, 3, 40, 40);
        assert_eq!(table.remove(55, |v| v.key == 30).map(|v| v.value), Some(30));
        assert_consistent(&table);
        assert_eq!(table.find(3, |v| v.key == 40).map(|v| v.value), Some(40));
    }

    #[test]
    fn remove_only_value() {
        let mut table: HashTable<u64> = HashTable::new();
        table.entry(9, |&v| v == 9).or_insert(9);
        assert_eq!(table.remove(9, |&v| v == 9), Some(9));
        assert!(table.is_empty());
        assert_consistent(&table);
    }

    #[test]
    fn grows_past_threshold() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..38u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        assert_eq!(table.capacity(), 53);

        table.entry(38, |&v| v == 38).or_insert(38);
        assert_eq!(table.capacity(), 97);
        assert_consistent(&table);

        for n in 0..39u64 {
            assert_eq!(table.find(n, |&v| v == n), Some(&n));
        }
    }

    #[test]
    fn vacant_insert_reference_survives_growth() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..38u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        let value = table.entry(1000, |&v| v == 1000).or_insert(1000);
        *value = 2000;
        assert_eq!(table.capacity(), 97);
        assert_eq!(table.find(1000, |&v| v == 2000), Some(&2000));
    }

    #[test]
    fn shrinks_after_removals() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..39u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        assert_eq!(table.capacity(), 97);

        for n in 0..29u64 {
            assert_eq!(table.remove(n, |&v| v == n), Some(n));
        }
        // 10 / 97 is still above the shrink threshold.
        assert_eq!(table.len(), 10);
        assert_eq!(table.capacity(), 97);

        assert_eq!(table.remove(29, |&v| v == 29), Some(29));
        assert_eq!(table.capacity(), 53);
        assert_consistent(&table);

        for n in 30..39u64 {
            assert_eq!(table.find(n, |&v| v == n), Some(&n));
        }
    }

    #[test]
    fn update_in_place_never_resizes() {
        let mut table: HashTable<(u64, u64)> = HashTable::new();
        for n in 0..38u64 {
            table.entry(n, |&(k, _)| k == n).or_insert((n, 0));
        }

        for round in 1..10u64 {
            for n in 0..38u64 {
                if let Entry::Occupied(mut entry) = table.entry(n, |&(k, _)| k == n) {
                    entry.get_mut().1 = round;
                }
            }
        }

        assert_eq!(table.capacity(), 53);
        assert!(table.iter().all(|&(_, v)| v == 9));
    }

    #[test]
    fn fixed_policy_keeps_capacity() {
        let mut table: HashTable<u64> = HashTable::with_policy(ResizePolicy::Fixed(97));
        for n in 0..500u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        assert_eq!(table.capacity(), 97);
        assert_eq!(table.len(), 500);
        assert!(table.load_factor() > 5.0);
        assert_consistent(&table);

        for n in 0..499u64 {
            table.remove(n, |&v| v == n);
        }
        assert_eq!(table.capacity(), 97);
        assert_eq!(table.find(499, |&v| v == 499), Some(&499));

        table.clear();
        assert_eq!(table.capacity(), 97);
        assert_eq!(table.policy(), ResizePolicy::Fixed(97));
    }

    #[test]
    fn clear_resets_to_initial_capacity() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..1000u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }
        assert!(table.capacity() > 1000);

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), PRIMES[0]);
        assert!(table.find(hash_key(&state, 1), |v| v.key == 1).is_none());

        insert_item(&mut table, hash_key(&state, 1), 1, 1);
        assert_eq!(table.len(), 1);
        assert_consistent(&table);
    }

    #[test]
    fn drain_yields_everything_once() {
        let state = HashState::default();
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..200u64 {
            insert_item(&mut table, hash_key(&state, k), k, k as i32);
        }

        let mut keys: Vec<u64> = table.drain().map(|item| item.key).collect();
        keys.sort();
        assert_eq!(keys, (0..200).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.capacity(), PRIMES[0]);
        assert_consistent(&table);
    }

    #[test]
    fn dropped_drain_still_empties() {
        let mut table: HashTable<String> = HashTable::new();
        for n in 0..10u64 {
            table.entry(n, |_| false).or_insert(n.to_string());
        }

        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert!(table.iter().next().is_none());
    }

    #[test]
    fn iterators_visit_every_value() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..100u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        assert_eq!(table.iter().len(), 100);
        assert_eq!(table.iter().sum::<u64>(), (0..100).sum());

        for v in table.iter_mut() {
            *v *= 2;
        }
        assert_eq!((&table).into_iter().sum::<u64>(), (0..100).map(|n| n * 2).sum());

        let mut owned: Vec<u64> = table.into_iter().collect();
        owned.sort();
        assert_eq!(owned, (0..100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn or_insert_with_is_lazy_when_occupied() {
        let mut table: HashTable<(u64, String)> = HashTable::new();
        table
            .entry(1, |(k, _)| *k == 1)
            .or_insert_with(|| (1, "one".to_string()));
        let value = table
            .entry(1, |(k, _)| *k == 1)
            .or_insert_with(|| panic!("default must not run"));
        assert_eq!(value.1, "one");
    }

    #[test]
    fn occupied_remove_shrinks() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in 0..39u64 {
            table.entry(n, |&v| v == n).or_insert(n);
        }
        for n in 0..30u64 {
            match table.entry(n, |&v| v == n) {
                Entry::Occupied(entry) => assert_eq!(entry.remove(), n),
                Entry::Vacant(_) => panic!("{n} should be present"),
            }
        }
        assert_eq!(table.capacity(), 53);
        assert_consistent(&table);
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut original: HashTable<Item> = HashTable::new();
        for k in 0..50u64 {
            insert_item(&mut original, hash_key(&state, k), k, k as i32);
        }

        let mut cloned = original.clone();
        assert_eq!(cloned.len(), original.len());
        assert_eq!(cloned.capacity(), original.capacity());

        cloned.remove(hash_key(&state, 0), |v| v.key == 0);
        assert!(original.find(hash_key(&state, 0), |v| v.key == 0).is_some());
        assert!(cloned.find(hash_key(&state, 0), |v| v.key == 0).is_none());
        assert_consistent(&cloned);
    }

    #[test]
    fn debug_stats_match_contents() {
        let mut table: HashTable<u64> = HashTable::new();
        for n in [0u64, 53, 106, 1, 2] {
            table.entry(n, |&v| v == n).or_insert(n);
        }

        let hist = table.chain_histogram();
        assert_eq!(hist.iter().sum::<usize>(), 53);
        assert_eq!(hist, vec![50, 2, 0, 1]);

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 5);
        assert_eq!(stats.capacity, 53);
        assert_eq!(stats.occupied_buckets, 3);
        assert_eq!(stats.longest_chain, 3);
        assert_eq!(stats.load_factor, 5.0 / 53.0);
    }

    #[test]
    fn debug_output() {
        let mut table: HashTable<u64> = HashTable::new();
        table.entry(3, |&v| v == 3).or_insert(3);
        let output = alloc::format!("{table:?}");
        assert!(output.contains("populated: 1"));
        assert!(output.contains("capacity: 53"));
    }

    #[test]
    fn random_churn_keeps_invariants() {
        let state = HashState::default();
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut table: HashTable<Item> = HashTable::new();
        let mut present = vec![false; 4096];

        for step in 0..20_000 {
            let key = rng.random_range(0..present.len() as u64);
            let hash = hash_key(&state, key);
            // Bias toward inserts early on and removals later.
            let insert = rng.random_bool(if step < 10_000 { 0.7 } else { 0.3 });

            if insert {
                let had = table.find(hash, |v| v.key == key).is_some();
                assert_eq!(had, present[key as usize]);
                table
                    .entry(hash, |v| v.key == key)
                    .or_insert(Item { key, value: 0 });
                present[key as usize] = true;
            } else {
                let removed = table.remove(hash, |v| v.key == key);
                assert_eq!(removed.is_some(), present[key as usize]);
                present[key as usize] = false;
            }

            assert_eq!(table.len(), present.iter().filter(|&&p| p).count());
            assert_eq!(
                table.load_factor(),
                table.len() as f64 / table.capacity() as f64
            );
            assert!(table.load_factor() <= GROW_LOAD_FACTOR);
            if table.capacity() != PRIMES[0] {
                assert!(table.load_factor() >= SHRINK_LOAD_FACTOR);
            }
        }

        assert_consistent(&table);
    }
}
