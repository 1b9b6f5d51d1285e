#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

/// The prime bucket-count sequence and the resize decision.
pub mod capacity;

/// Errors reported by dictionary operations.
pub mod error;

/// A dictionary built on the chained [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and exposes
/// the full dictionary interface with a configurable hasher.
pub mod hash_map;

pub mod hash_table;

pub use capacity::ResizePolicy;
pub use error::Error;
pub use error::Result;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`HashMap::new`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`HashMap::new`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder hasher builder when no default hasher is compiled in.
        ///
        /// It has no values, so maps must be built with
        /// [`HashMap::with_hasher`].
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
