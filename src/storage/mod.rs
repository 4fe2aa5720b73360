//! Storage
//!
//! Durable key-value slots holding serialized carts and the visitor identifier.

use std::io;

use thiserror::Error;

pub mod file;
pub mod memory;
pub mod visitor;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use visitor::{VISITOR_ID_KEY, VisitorId, ensure_visitor_id};

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key cannot be used by this backend.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// IO error reading or writing a slot.
    #[error("Storage IO error: {0}")]
    Io(#[from] io::Error),
}

/// A local, durable key-value store.
///
/// Values are opaque strings. Writes fully overwrite the previous value, so the
/// last writer to a key wins.
#[cfg_attr(test, mockall::automock)]
pub trait CartStorage {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: CartStorage + ?Sized> CartStorage for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
