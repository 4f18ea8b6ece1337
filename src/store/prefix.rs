/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Views over a store that transparently prepend a namespace to every key.

use super::{KvStore, StoreError};

fn prefixed(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut full = Vec::with_capacity(prefix.len() + key.len());
    full.extend_from_slice(prefix);
    full.extend_from_slice(key);
    full
}

fn strip(prefix: &[u8], entries: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<(Vec<u8>, Vec<u8>)> {
    entries
        .into_iter()
        .map(|(k, v)| (k[prefix.len()..].to_vec(), v))
        .collect()
}

/// Read-only prefixed view.
pub struct PrefixStore<'s> {
    parent: &'s dyn KvStore,
    prefix: Vec<u8>,
}

impl<'s> PrefixStore<'s> {
    pub fn new(parent: &'s dyn KvStore, prefix: &[u8]) -> Self {
        Self { parent, prefix: prefix.to_vec() }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.parent.get(&prefixed(&self.prefix, key))
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.parent.has(&prefixed(&self.prefix, key))
    }

    pub fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        strip(&self.prefix, self.parent.iter_prefix(&prefixed(&self.prefix, prefix)))
    }
}

/// Read-write prefixed view.
pub struct PrefixStoreMut<'s> {
    parent: &'s mut dyn KvStore,
    prefix: Vec<u8>,
}

impl<'s> PrefixStoreMut<'s> {
    pub fn new(parent: &'s mut dyn KvStore, prefix: &[u8]) -> Self {
        Self { parent, prefix: prefix.to_vec() }
    }
}

impl KvStore for PrefixStoreMut<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.parent.get(&prefixed(&self.prefix, key))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.parent.set(&prefixed(&self.prefix, key), value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.parent.delete(&prefixed(&self.prefix, key))
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        strip(&self.prefix, self.parent.iter_prefix(&prefixed(&self.prefix, prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn namespaces_do_not_overlap() {
        let mut store = MemoryStore::new();
        PrefixStoreMut::new(&mut store, b"evm/").set(&[1, 1], vec![1]).unwrap();
        PrefixStoreMut::new(&mut store, b"feemarket/").set(&[1, 1], vec![2]).unwrap();

        let evm = PrefixStore::new(&store, b"evm/");
        assert_eq!(evm.get(&[1, 1]), Some(vec![1]));
        assert_eq!(evm.iter_prefix(&[1]), vec![(vec![1, 1], vec![1])]);
    }
}
