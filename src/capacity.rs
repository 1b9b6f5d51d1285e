/// Bucket counts a dynamically sized table may take, smallest first.
///
/// Each entry is a prime roughly twice its predecessor and as far as possible
/// from the neighboring powers of two, which keeps `hash mod capacity` from
/// clustering on hashes with regular low bits.
pub const PRIMES: [usize; 26] = [
    53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613, 393241, 786433,
    1572869, 3145739, 6291469, 12582917, 25165843, 50331653, 100663319, 201326611, 402653189,
    805306457, 1610612741,
];

/// Load factor above which a dynamic table moves one step up [`PRIMES`].
pub const GROW_LOAD_FACTOR: f64 = 0.72;

/// Load factor below which a dynamic table moves one step down [`PRIMES`].
pub const SHRINK_LOAD_FACTOR: f64 = 0.10;

/// Bucket count conventionally used with [`ResizePolicy::Fixed`].
pub const FIXED_DEFAULT_CAPACITY: usize = 97;

/// How a table chooses its bucket count over its lifetime.
///
/// # Examples
///
/// ```rust
/// use chain_hash::HashTable;
/// use chain_hash::ResizePolicy;
///
/// let dynamic: HashTable<u64> = HashTable::with_policy(ResizePolicy::Dynamic);
/// assert_eq!(dynamic.capacity(), 53);
///
/// let fixed: HashTable<u64> = HashTable::with_policy(ResizePolicy::Fixed(11));
/// assert_eq!(fixed.capacity(), 11);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Start at the smallest prime and step through [`PRIMES`] as the load
    /// factor crosses [`GROW_LOAD_FACTOR`] or [`SHRINK_LOAD_FACTOR`].
    #[default]
    Dynamic,
    /// Keep a constant bucket count and never rehash. Chains grow without
    /// bound. A count of zero is treated as one.
    Fixed(usize),
}

/// The current bucket count of a table together with the policy that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Capacity {
    Prime { index: usize },
    Fixed { buckets: usize },
}

impl Capacity {
    pub(crate) fn initial(policy: ResizePolicy) -> Self {
        match policy {
            ResizePolicy::Dynamic => Capacity::Prime { index: 0 },
            ResizePolicy::Fixed(buckets) => Capacity::Fixed {
                buckets: buckets.max(1),
            },
        }
    }

    pub(crate) fn buckets(self) -> usize {
        match self {
            Capacity::Prime { index } => PRIMES[index],
            Capacity::Fixed { buckets } => buckets,
        }
    }

    pub(crate) fn policy(self) -> ResizePolicy {
        match self {
            Capacity::Prime { .. } => ResizePolicy::Dynamic,
            Capacity::Fixed { buckets } => ResizePolicy::Fixed(buckets),
        }
    }

    fn grown(self) -> Option<Self> {
        match self {
            Capacity::Prime { index } if index + 1 < PRIMES.len() => {
                Some(Capacity::Prime { index: index + 1 })
            }
            _ => None,
        }
    }

    fn shrunk(self) -> Option<Self> {
        match self {
            Capacity::Prime { index } if index > 0 => Some(Capacity::Prime { index: index - 1 }),
            _ => None,
        }
    }

    /// Decides whether a table holding `len` entries should be rehashed, and
    /// to which capacity.
    ///
    /// Growth is checked first and at most one step is taken per call. At
    /// either end of [`PRIMES`] the answer is `None` even when the load factor
    /// is out of range.
    pub(crate) fn next_for(self, len: usize) -> Option<Self> {
        let load = len as f64 / self.buckets() as f64;
        if load > GROW_LOAD_FACTOR {
            self.grown()
        } else if load < SHRINK_LOAD_FACTOR {
            self.shrunk()
        } else {
            None
        }
    }
}
