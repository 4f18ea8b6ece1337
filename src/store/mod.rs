/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Key-value storage interfaces consumed by the execution core.
//!
//! The versioned, provable store of the host chain is an external collaborator; this module only
//! defines the [KvStore] trait it has to satisfy, plus:
//! - [MemoryStore]: an ordered in-memory implementation, also used as the per-block transient store
//!   and as an immutable snapshot for read-only queries.
//! - [CacheStore]: a branch on top of any store whose writes are flushed only on success.
//! - [PrefixStore] / [PrefixStoreMut]: namespacing of module keys.

use std::collections::BTreeMap;

pub mod cache;
pub use cache::{CacheStore, StoreWrites};

pub mod prefix;
pub use prefix::{PrefixStore, PrefixStoreMut};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write key {key}: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to delete key {key}: {reason}")]
    Delete { key: String, reason: String },
}

/// Byte-oriented key-value store. Iteration is in ascending key order so that every node
/// observes the same sequence.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;
}

/// Big-endian u64, zero when absent or malformed.
pub(crate) fn read_u64(bytes: Option<Vec<u8>>) -> u64 {
    bytes
        .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
        .map_or(0, u64::from_be_bytes)
}

/// Ordered in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    inner: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Remove every entry. Used to reset the transient store between blocks.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.inner.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

pub(crate) fn display_key(key: &[u8]) -> String {
    alloy_primitives::hex::encode(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_iteration_is_ordered_and_bounded() {
        let mut store = MemoryStore::new();
        store.set(&[1, 3], vec![3]).unwrap();
        store.set(&[1, 1], vec![1]).unwrap();
        store.set(&[2, 0], vec![9]).unwrap();
        store.set(&[0, 9], vec![8]).unwrap();

        let entries = store.iter_prefix(&[1]);
        assert_eq!(entries, vec![(vec![1, 1], vec![1]), (vec![1, 3], vec![3])]);

        store.delete(&[1, 1]).unwrap();
        assert!(!store.has(&[1, 1]));
        assert_eq!(store.len(), 3);
    }
}
