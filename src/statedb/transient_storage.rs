/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! EIP-1153 transient storage. Lives for one transaction and is never persisted.

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientStorage(BTreeMap<Address, BTreeMap<B256, B256>>);

impl TransientStorage {
    pub fn get(&self, address: &Address, key: &B256) -> B256 {
        self.0
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, address: Address, key: B256, value: B256) {
        if value.is_zero() {
            if let Some(slots) = self.0.get_mut(&address) {
                slots.remove(&key);
                if slots.is_empty() {
                    self.0.remove(&address);
                }
            }
        } else {
            self.0.entry(address).or_default().insert(key, value);
        }
    }
}
