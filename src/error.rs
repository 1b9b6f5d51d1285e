/// Failures reported by keyed dictionary operations.
///
/// Every operation that returns one of these leaves the table exactly as it
/// was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The key is not present in the map.
    #[error("key not found")]
    KeyNotFound,

    /// A strict add found an entry with an equal key already present.
    #[error("an entry with the same key already exists")]
    DuplicateKey,

    /// A bulk copy destination cannot hold every entry of the map.
    #[error("destination has room for {available} entries but {required} are required")]
    InsufficientSpace {
        /// Number of entries that had to be copied.
        required: usize,
        /// Number of destination slots from the start index onward.
        available: usize,
    },
}

/// Result type returned by fallible [`HashMap`](crate::HashMap) operations.
pub type Result<T> = core::result::Result<T, Error>;
