use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use alloc::vec::Vec;

use crate::DefaultHashBuilder;
use crate::capacity::ResizePolicy;
use crate::error::Error;
use crate::error::Result;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// A dictionary stored in a chained [`HashTable`].
///
/// `HashMap<K, V, S>` keeps `(K, V)` pairs where keys implement `Hash + Eq`,
/// hashing them with the builder `S`. Equal keys must hash equal, and a key's
/// hash must not change while it is stored.
///
/// Two insertion operations are provided on purpose:
///
/// - [`set`](Self::set) upserts, overwriting the value of an existing key.
/// - [`add`](Self::add) refuses to touch an existing key and reports
///   [`Error::DuplicateKey`].
///
/// # Examples
///
/// ```rust
/// use chain_hash::Error;
/// use chain_hash::HashMap;
///
/// let mut scores = HashMap::new();
/// scores.add("adam", 80).unwrap();
/// scores.set("louis", 75);
///
/// assert_eq!(scores.add("adam", 0), Err(Error::DuplicateKey));
/// *scores.get_mut(&"adam").unwrap() += 5;
///
/// assert_eq!(scores[&"adam"], 85);
/// assert_eq!(scores.get(&"peter"), Err(Error::KeyNotFound));
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the current number of buckets.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.capacity(), 53);
    ///
    /// for i in 0..39 {
    ///     map.set(i, i);
    /// }
    /// assert_eq!(map.capacity(), 97);
    /// ```
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns `len() / capacity()`.
    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// Returns the resize policy the map was created with.
    pub fn policy(&self) -> ResizePolicy {
        self.table.policy()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all entries and returns the map to its initial capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over the key-value pairs of the map, in arbitrary
    /// order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Removes every entry, returning them in an iterator.
    ///
    /// The map is empty and back at its initial capacity as soon as this
    /// returns, even if the iterator is dropped early.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Returns an owned copy of every entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.set(1, "one");
    /// map.set(2, "two");
    ///
    /// let mut snapshot = map.to_vec();
    /// map.clear();
    ///
    /// snapshot.sort();
    /// assert_eq!(snapshot, vec![(1, "one"), (2, "two")]);
    /// ```
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Clones every entry into `dest`, starting at index `start`.
    ///
    /// Fails with [`Error::InsufficientSpace`], writing nothing, when
    /// `dest[start..]` is shorter than [`len`](Self::len) or `start` is past
    /// the end of `dest`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Error;
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.set(1, 10);
    /// map.set(2, 20);
    ///
    /// let mut dest = [(0, 0); 3];
    /// map.copy_to(&mut dest, 1).unwrap();
    /// assert_eq!(dest[0], (0, 0));
    ///
    /// assert_eq!(
    ///     map.copy_to(&mut dest, 2),
    ///     Err(Error::InsufficientSpace {
    ///         required: 2,
    ///         available: 1
    ///     })
    /// );
    /// ```
    pub fn copy_to(&self, dest: &mut [(K, V)], start: usize) -> Result<()>
    where
        K: Clone,
        V: Clone,
    {
        let available = dest.len().saturating_sub(start);
        let Some(dest) = dest.get_mut(start..).filter(|d| d.len() >= self.len()) else {
            return Err(Error::InsufficientSpace {
                required: self.len(),
                available,
            });
        };

        for (slot, (k, v)) in dest.iter_mut().zip(self.iter()) {
            *slot = (k.clone(), v.clone());
        }
        Ok(())
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::hash::RandomState;
    ///
    /// use chain_hash::HashMap;
    ///
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(RandomState::new());
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_policy_and_hasher(ResizePolicy::Dynamic, hash_builder)
    }

    /// Creates an empty map with the given resize policy and hasher builder.
    pub fn with_policy_and_hasher(policy: ResizePolicy, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_policy(policy),
            hash_builder,
        }
    }

    /// Inserts or overwrites the value for `key`, returning the previous
    /// value if there was one.
    ///
    /// Overwriting never changes the entry count and never resizes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.set(37, "a"), None);
    /// assert_eq!(map.set(37, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(mut entry) => Some(core::mem::replace(&mut entry.get_mut().1, value)),
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Inserts `key` with `value`, failing if the key is already present.
    ///
    /// On failure the map is unchanged and keeps the value it already had.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::Error;
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.add(1, "one"), Ok(()));
    /// assert_eq!(map.add(1, "another one"), Err(Error::DuplicateKey));
    /// assert_eq!(map[&1], "one");
    /// ```
    pub fn add(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(_) => Err(Error::DuplicateKey),
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                Ok(())
            }
        }
    }

    /// Returns the value for `key`, or [`Error::KeyNotFound`].
    pub fn get(&self, key: &K) -> Result<&V> {
        self.try_get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns the value for `key`, or [`Error::KeyNotFound`], mutably.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, |(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or(Error::KeyNotFound)
    }

    /// Returns the value for `key` if present.
    pub fn try_get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value if present.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, |(k, _)| k == key).map(|(k, v)| (k, v))
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get_key_value(key).is_some()
    }

    /// Returns `true` if the map contains `key` mapped to exactly `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.set(1, "one");
    /// assert!(map.contains_pair(&1, &"one"));
    /// assert!(!map.contains_pair(&1, &"another one"));
    /// ```
    pub fn contains_pair(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.try_get(key) == Some(value)
    }

    /// Removes `key`, returning whether it was present.
    ///
    /// Removing may shrink the map. Removing an absent key changes nothing.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Removes `key`, returning the stored key and value if it was present.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |(k, _)| k == key)
    }

    /// Removes `key` only if it currently maps to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.set(1, "one");
    ///
    /// assert!(!map.remove_pair(&1, &"another one"));
    /// assert_eq!(map.len(), 1);
    /// assert!(map.remove_pair(&1, &"one"));
    /// assert!(map.is_empty());
    /// ```
    pub fn remove_pair(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .remove(hash, |(k, v)| k == key && v == value)
            .is_some()
    }

    /// Gets the given key's entry in the map for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.entry(word).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(counts[&"a"], 2);
    /// assert_eq!(counts[&"b"], 1);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(hash, |(k, _)| k == &key) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

#[cfg(any(feature = "foldhash", feature = "std"))]
impl<K, V> HashMap<K, V, DefaultHashBuilder>
where
    K: Hash + Eq,
{
    /// Creates an empty map using [`DefaultHashBuilder`].
    ///
    /// Use [`with_hasher`](Self::with_hasher) or [`Default`] for other
    /// hasher builders.
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// Creates an empty map with the given resize policy and the default
    /// hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chain_hash::HashMap;
    /// use chain_hash::ResizePolicy;
    ///
    /// let mut map = HashMap::with_policy(ResizePolicy::Fixed(97));
    /// for i in 0..1000 {
    ///     map.set(i, i);
    /// }
    /// assert_eq!(map.capacity(), 97);
    /// ```
    pub fn with_policy(policy: ResizePolicy) -> Self {
        Self::with_policy_and_hasher(policy, DefaultHashBuilder::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(k, v)| other.contains_pair(k, v))
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

/// Panics if the key is absent. Use [`HashMap::get`] to handle that case.
impl<K, V, S> Index<&K> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &K) -> &V {
        match self.try_get(key) {
            Some(value) => value,
            None => panic!("key not found"),
        }
    }
}

/// Upserts every pair, so later duplicates win.
impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// The key is absent.
    Vacant(VacantEntry<'a, K, V>),
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts `default` if the key is absent and returns a mutable reference
    /// to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        self.or_insert_with(|| default)
    }

    /// Inserts the result of `default` if the key is absent and returns a
    /// mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Runs `f` on the value if the key is present.
    pub fn and_modify(mut self, f: impl FnOnce(&mut V)) -> Self {
        if let Entry::Occupied(entry) = &mut self {
            f(entry.get_mut());
        }
        self
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts `V::default()` if the key is absent and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in a [`HashMap`].
pub struct VacantEntry<'a, K, V> {
    entry: crate::hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// The key that will be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Inserts the key with `value`, which may grow the map.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in a [`HashMap`].
pub struct OccupiedEntry<'a, K, V> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// The stored key.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// The stored value.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// The stored value, mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference bound to the map.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry, which may shrink the map.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// A draining iterator over the key-value pairs of a [`HashMap`].
pub struct Drain<'a, K, V> {
    inner: crate::hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An owning iterator over the key-value pairs of a [`HashMap`].
pub struct IntoIter<K, V> {
    inner: crate::hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
