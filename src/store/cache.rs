/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a store that serves as a branch on top of another store.
//!
//! In Read Operation, `writes` is accessed first. If the key is not found there, the parent store
//! is accessed.
//!
//! In Write Operation, only `writes` is updated. A deletion is recorded as a tombstone so that it
//! hides the parent value.
//!
//! When the branch succeeds, [CacheStore::into_writes] releases the borrow on the parent and the
//! returned [StoreWrites] are applied to it. Otherwise the branch is dropped and the parent is
//! left untouched.

use std::collections::BTreeMap;

use super::{KvStore, StoreError};

pub struct CacheStore<'p> {
    parent: &'p dyn KvStore,
    /// pending writes; None marks a deletion
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p> CacheStore<'p> {
    pub fn new(parent: &'p dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    pub fn into_writes(self) -> StoreWrites {
        StoreWrites(self.writes)
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        // 'read-your-write' semantics
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.parent.iter_prefix(prefix).into_iter().collect();
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }
        merged.into_iter().collect()
    }
}

/// Writes collected by a [CacheStore], in ascending key order.
#[derive(Debug, Default)]
pub struct StoreWrites(BTreeMap<Vec<u8>, Option<Vec<u8>>>);

impl StoreWrites {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn apply(self, store: &mut dyn KvStore) -> Result<(), StoreError> {
        for (key, value) in self.0 {
            match value {
                Some(value) => store.set(&key, value)?,
                None => store.delete(&key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn branch_reads_its_writes_and_hides_deletes() {
        let mut parent = MemoryStore::new();
        parent.set(b"a", b"1".to_vec()).unwrap();
        parent.set(b"b", b"2".to_vec()).unwrap();

        let writes = {
            let mut cache = CacheStore::new(&parent);
            cache.set(b"c", b"3".to_vec()).unwrap();
            cache.delete(b"a").unwrap();
            assert_eq!(cache.get(b"a"), None);
            assert_eq!(cache.get(b"b"), Some(b"2".to_vec()));
            assert_eq!(
                cache.iter_prefix(b""),
                vec![(b"b".to_vec(), b"2".to_vec()), (b"c".to_vec(), b"3".to_vec())]
            );
            cache.into_writes()
        };
        // parent untouched until applied
        assert_eq!(parent.get(b"a"), Some(b"1".to_vec()));

        writes.apply(&mut parent).unwrap();
        assert_eq!(parent.get(b"a"), None);
        assert_eq!(parent.get(b"c"), Some(b"3".to_vec()));
    }
}
